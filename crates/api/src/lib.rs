//! `api` crate — HTTP layer for the newsroom.
//!
//! Public routes:
//!   GET    /api/articles, /api/articles/featured, /api/articles/trending
//!   GET    /api/articles/{slug}
//!   GET    /api/search?q=
//!   GET    /api/categories
//!   GET    /api/settings/popunder
//!   GET    /api/social-platforms
//!   GET    /api/track/social?c=
//!   POST   /api/auth/session, GET /api/auth/session, DELETE /api/auth/session
//!
//! Everything under `/api/admin` requires an admin session; see
//! [`admin_routes`].

use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod auth;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiJson};
pub use state::{ApiConfig, AppState};

use handlers::{articles, auth as session, automation, categories, platforms, rules, settings, tracking};

/// Build the full router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/articles", get(articles::list_public))
        .route("/api/articles/featured", get(articles::featured))
        .route("/api/articles/trending", get(articles::trending))
        .route("/api/articles/:slug", get(articles::by_slug))
        .route("/api/search", get(articles::search))
        .route("/api/categories", get(categories::list))
        .route("/api/settings/popunder", get(settings::get_popunder))
        .route("/api/social-platforms", get(platforms::list_public))
        .route("/api/track/social", get(tracking::track_click))
        .route("/api/auth/session", post(session::login).get(session::current).delete(session::logout))
        .nest("/api/admin", admin_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Admin routes, all behind [`auth::require_admin`].
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/articles", get(articles::list_admin).post(articles::create))
        .route("/articles/update-categories", post(categories::bulk_update))
        .route("/articles/:id", get(articles::get).put(articles::update).delete(articles::delete))
        .route("/categories", post(categories::create))
        .route("/cache/refresh", post(articles::refresh_cache))
        .route("/settings/popunder", post(settings::set_popunder))
        .route("/automation/detector", post(automation::control_detector))
        .route("/automation/detector-status", get(automation::detector_status))
        .route("/automation/queue-status", get(automation::queue_status))
        .route("/automation/check-article", post(automation::check_article))
        .route("/automation/cleanup", post(automation::cleanup))
        .route("/automation/retry", post(automation::retry))
        .route("/automation/sync-engagement", post(automation::sync_engagement))
        .route("/automation/analytics", get(automation::analytics))
        .route("/automation/rules", get(rules::list).post(rules::create))
        .route("/automation/rules/test", post(rules::test))
        .route("/automation/rules/:id", put(rules::update).delete(rules::delete))
        .route("/automation/platforms/:platform", put(platforms::update))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let app = router(state.clone());

    let listener = TcpListener::bind(addr).await?;
    info!("API server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.automation.stop().await;
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
