// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::analyze::Pipeline;
use crate::ingest::types::ContentSource;
use crate::store::AnnotationStore;

#[derive(Clone, Copy, Debug)]
pub struct IngestSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn a loop that runs [`crate::ingest::run_once`] every `interval_secs`.
/// The first tick fires immediately.
pub fn spawn_scheduler(
    cfg: IngestSchedulerCfg,
    sources: Vec<Box<dyn ContentSource>>,
    pipeline: Arc<Pipeline>,
    store: Arc<dyn AnnotationStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        loop {
            ticker.tick().await;
            counter!("ingest_runs_total").increment(1);
            match crate::ingest::run_once(&sources, &*pipeline, &*store).await {
                Ok(stats) => tracing::info!(
                    target: "ingest",
                    annotated = stats.annotated(),
                    skipped = stats.skipped,
                    "scheduled ingest tick"
                ),
                Err(e) => tracing::warn!(target: "ingest", error = ?e, "scheduled ingest failed"),
            }
        }
    })
}
