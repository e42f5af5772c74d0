//! Start/stop control for the background loops.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use queue::QueueStats;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::{AutomationError, ArticleDetector, EngagementSync, QueueProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorStatus {
    pub is_running: bool,
    pub last_check_time: DateTime<Utc>,
    /// `None` while stopped.
    pub next_check_time: Option<DateTime<Utc>>,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    detector_interval: Duration,
}

/// Owns the detector and the queue processor and runs them on intervals.
pub struct AutomationController {
    detector: Arc<ArticleDetector>,
    processor: Arc<QueueProcessor>,
    engagement: Arc<EngagementSync>,
    running: Mutex<Option<Running>>,
}

impl AutomationController {
    pub fn new(detector: Arc<ArticleDetector>, processor: Arc<QueueProcessor>, engagement: Arc<EngagementSync>) -> Self {
        Self { detector, processor, engagement, running: Mutex::new(None) }
    }

    pub fn detector(&self) -> &Arc<ArticleDetector> {
        &self.detector
    }

    pub fn processor(&self) -> &Arc<QueueProcessor> {
        &self.processor
    }

    pub fn engagement(&self) -> &Arc<EngagementSync> {
        &self.engagement
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Run one detection check and one queue pass now, then keep both going
    /// on their intervals until [`stop`](Self::stop).
    ///
    /// The controller counts as running before the first passes begin, so
    /// status and stop calls do not wait on them.
    pub async fn start(&self, detector_interval: Duration, queue_interval: Duration) -> StartOutcome {
        {
            let mut running = self.running.lock().await;
            if running.is_some() {
                info!("automation already running");
                return StartOutcome::AlreadyRunning;
            }

            info!(
                detector_secs = detector_interval.as_secs(),
                queue_secs = queue_interval.as_secs(),
                "starting automation"
            );
            let (shutdown, rx) = watch::channel(false);

            let detector = self.detector.clone();
            let detector_loop = spawn_loop(detector_interval, rx.clone(), move || {
                let detector = detector.clone();
                async move { run_detector(&detector).await }
            });

            let processor = self.processor.clone();
            let queue_loop = spawn_loop(queue_interval, rx, move || {
                let processor = processor.clone();
                async move { run_queue(&processor).await }
            });

            *running = Some(Running { shutdown, handles: vec![detector_loop, queue_loop], detector_interval });
        }

        run_detector(&self.detector).await;
        run_queue(&self.processor).await;
        StartOutcome::Started
    }

    /// Signal both loops and wait for them to finish. Returns whether they
    /// were running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.running.lock().await.take() else {
            return false;
        };

        let _ = running.shutdown.send(true);
        for handle in running.handles {
            if let Err(e) = handle.await {
                error!("automation loop ended abnormally: {e}");
            }
        }
        info!("automation stopped");
        true
    }

    pub async fn detector_status(&self) -> DetectorStatus {
        let last_check_time = self.detector.last_check_time().await;
        let interval = self.running.lock().await.as_ref().map(|r| r.detector_interval);

        DetectorStatus {
            is_running: interval.is_some(),
            last_check_time,
            next_check_time: interval
                .and_then(|i| chrono::Duration::from_std(i).ok())
                .map(|i| last_check_time + i),
        }
    }

    pub async fn queue_status(&self) -> Result<QueueStats, AutomationError> {
        self.processor.stats().await
    }
}

async fn run_detector(detector: &ArticleDetector) {
    if let Err(e) = detector.check().await {
        error!("article detection failed: {e}");
    }
}

async fn run_queue(processor: &QueueProcessor) {
    if let Err(e) = processor.process_due().await {
        error!("queue processing failed: {e}");
    }
}

/// Call `tick` every `every` until `shutdown` flips or its sender is dropped.
///
/// The first tick is skipped; callers run the initial pass themselves.
fn spawn_loop<F, Fut>(every: Duration, mut shutdown: watch::Receiver<bool>, tick: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every.max(Duration::from_millis(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => tick().await,
                _ = shutdown.changed() => break,
            }
        }
    })
}
