// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analytics;
pub mod analyze;
pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod normalize;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{extract, Annotation, ExtractResult, Pipeline};
pub use crate::api::router;
pub use crate::normalize::normalize_text;
pub use crate::sentiment::{SentimentLabel, SentimentResult, SentimentScorer};

use anyhow::Result;
use axum::Router;

/// Build the full in-process app (settings from env, fresh in-memory store,
/// Prometheus `/metrics`). Used by the binary and by HTTP tests.
pub async fn app() -> Result<Router> {
    let settings = crate::config::Settings::from_env()?;
    let metrics = crate::metrics::Metrics::init(settings.max_themes)?;
    let state = crate::api::AppState::from_settings(&settings).with_metrics(metrics);
    Ok(router(state))
}
