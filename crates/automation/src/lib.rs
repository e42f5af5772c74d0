//! `automation` crate — the social-posting pipeline.
//!
//! The [`ArticleDetector`] finds newly published articles and enqueues one
//! posting job per selected platform. The [`QueueProcessor`] drains the queue,
//! formats content, and posts through the publishers. The
//! [`AutomationController`] runs both on intervals.

pub mod error;
pub mod models;
pub mod rules;
pub mod priority;
pub mod schedule;
pub mod store;
pub mod resolver;
pub mod detector;
pub mod processor;
pub mod engagement;
pub mod controller;
pub mod pg;

pub use error::AutomationError;
pub use models::{Article, AutomationRule, NewAutomationRule, PostRecord, PostRef, PostStatus, RuleConditions, RuleType, ScheduleSlot};
pub use store::AutomationStore;
pub use resolver::PublisherResolver;
pub use detector::{ArticleDetector, DetectionReport};
pub use processor::{QueueProcessor, ProcessSummary};
pub use engagement::{EngagementSync, SyncSummary};
pub use controller::{AutomationController, DetectorStatus, StartOutcome};
pub use pg::{build_controller, seed_default_rules, PgAutomationStore, PgQueueStore, PipelineConfig};

#[cfg(test)]
mod pipeline_tests;
