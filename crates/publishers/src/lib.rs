//! `publishers` crate — the `SocialPublisher` trait and the built-in platform clients.
//!
//! Every platform client implements [`SocialPublisher`]; the automation crate
//! dispatches posting through this trait object.

pub mod error;
pub mod platform;
pub mod traits;
pub mod format;
pub mod http;
pub mod reddit;
pub mod facebook;
pub mod twitter;
pub mod instagram;
pub mod registry;
pub mod mock;

pub use error::PublishError;
pub use platform::Platform;
pub use traits::{EngagementMetrics, PostReceipt, PostSource, RateLimit, SocialContent, SocialPublisher};
pub use format::ContentFormatter;
pub use registry::{build_publisher, PublisherRegistry};
