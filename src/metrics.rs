use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::analyze::themes::DEFAULT_MAX_THEMES;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder (once) and describe series.
    /// Later calls return the same handle.
    pub fn init(max_themes: usize) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();

        crate::ingest::ensure_metrics_described();
        metrics::gauge!("annotate_max_themes").set(max_themes.max(1) as f64);

        Ok(Self { handle })
    }

    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::init(DEFAULT_MAX_THEMES)
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
