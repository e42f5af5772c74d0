//! `newsroom` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`         — start the HTTP API (optionally with the automation loops).
//! - `worker`        — run only the automation loops.
//! - `migrate`       — run pending database migrations.
//! - `seed-rules`    — insert the default automation rules.
//! - `cleanup-queue` — delete old completed queue items.

use std::time::Duration;

use anyhow::Context;
use api::auth::SessionKeys;
use api::{ApiConfig, AppState};
use automation::{build_controller, seed_default_rules, AutomationController, PipelineConfig, StartOutcome};
use clap::{Args, Parser, Subcommand};
use db::DbPool;
use queue::{RetryPolicy, DEFAULT_CLEANUP_DAYS};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "newsroom",
    about = "Editorial site with automatic social cross-posting",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct DbArgs {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long, env = "NEWSROOM_DB_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,
}

#[derive(Args)]
struct PipelineArgs {
    /// Public site URL; links and tracking URLs are built on it.
    #[arg(long, env = "NEWSROOM_SITE_URL", default_value = "http://localhost:8080")]
    site_url: String,

    #[arg(long, env = "NEWSROOM_SITE_NAME", default_value = "Newsroom")]
    site_name: String,

    #[arg(long, env = "NEWSROOM_DETECTOR_INTERVAL_MINS", default_value_t = 5)]
    detector_interval_mins: u64,

    #[arg(long, env = "NEWSROOM_QUEUE_INTERVAL_SECS", default_value_t = 60)]
    queue_interval_secs: u64,
}

impl PipelineArgs {
    fn detector_interval(&self) -> Duration {
        Duration::from_secs(self.detector_interval_mins * 60)
    }

    fn queue_interval(&self) -> Duration {
        Duration::from_secs(self.queue_interval_secs)
    }

    fn site_url(&self) -> String {
        self.site_url.trim_end_matches('/').to_owned()
    }
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "NEWSROOM_BIND", default_value = "0.0.0.0:8080")]
        bind: String,

        #[arg(long, env = "NEWSROOM_SESSION_SECRET", hide_env_values = true)]
        session_secret: String,

        /// Comma-separated admin email whitelist.
        #[arg(long, env = "NEWSROOM_ADMIN_EMAILS", value_delimiter = ',')]
        admin_emails: Vec<String>,

        #[arg(long, env = "NEWSROOM_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,

        #[arg(long, env = "NEWSROOM_SESSION_TTL_HOURS", default_value_t = 24)]
        session_ttl_hours: i64,

        #[arg(long, env = "NEWSROOM_CACHE_TTL_SECS", default_value_t = 300)]
        cache_ttl_secs: u64,

        /// Start the detector and queue loops with the server.
        #[arg(long, env = "NEWSROOM_AUTOSTART")]
        autostart: bool,

        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Run the detector and queue loops without the HTTP server.
    Worker {
        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Run pending database migrations.
    Migrate {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Insert the default automation rules whose names are not taken.
    SeedRules {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Delete completed queue items older than `--days`.
    CleanupQueue {
        #[arg(long, default_value_t = DEFAULT_CLEANUP_DAYS)]
        days: i64,

        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            session_secret,
            admin_emails,
            admin_password,
            session_ttl_hours,
            cache_ttl_secs,
            autostart,
            db,
            pipeline,
        } => {
            anyhow::ensure!(!session_secret.is_empty(), "NEWSROOM_SESSION_SECRET must not be empty");
            let pool = connect(&db).await?;
            let controller = controller(pool.clone(), &pipeline)?;

            let sessions = SessionKeys::new(
                session_secret,
                admin_emails,
                admin_password,
                chrono::Duration::hours(session_ttl_hours.max(1)),
            );
            let config = ApiConfig {
                site_url: pipeline.site_url(),
                cache_ttl: Duration::from_secs(cache_ttl_secs),
                detector_interval: pipeline.detector_interval(),
                queue_interval: pipeline.queue_interval(),
            };
            let state = AppState::new(pool, controller, sessions, config);

            if autostart {
                state
                    .automation
                    .start(pipeline.detector_interval(), pipeline.queue_interval())
                    .await;
            }

            info!("Starting API server on {bind}");
            api::serve(&bind, state).await.context("API server failed")?;
        }
        Command::Worker { db, pipeline } => {
            let pool = connect(&db).await?;
            let controller = controller(pool, &pipeline)?;

            if controller.start(pipeline.detector_interval(), pipeline.queue_interval()).await
                == StartOutcome::Started
            {
                info!("Worker running; press Ctrl+C to stop");
            }
            tokio::signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;
            controller.stop().await;
        }
        Command::Migrate { db } => {
            let pool = connect(&db).await?;
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
        }
        Command::SeedRules { db } => {
            let pool = connect(&db).await?;
            let inserted = seed_default_rules(&pool).await?;
            println!("Seeded {inserted} automation rule(s)");
        }
        Command::CleanupQueue { days, db, pipeline } => {
            anyhow::ensure!(
                automation::processor::cleanup_cutoff(chrono::Utc::now(), days).is_some(),
                "--days must be between 0 and the oldest representable date"
            );
            let pool = connect(&db).await?;
            let removed = controller(pool, &pipeline)?.processor().cleanup(days).await?;
            println!("Removed {removed} completed queue item(s) older than {days} day(s)");
        }
    }

    Ok(())
}

async fn connect(args: &DbArgs) -> anyhow::Result<DbPool> {
    db::pool::create_pool(&args.database_url, args.max_connections)
        .await
        .context("failed to connect to database")
}

fn controller(pool: DbPool, pipeline: &PipelineArgs) -> anyhow::Result<AutomationController> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("newsroom/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let config = PipelineConfig {
        site_url: pipeline.site_url(),
        site_name: pipeline.site_name.clone(),
        retry: RetryPolicy::default(),
    };
    Ok(build_controller(pool, config, http))
}
