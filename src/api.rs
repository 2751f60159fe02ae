use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::analytics::{self, CoMention, EntityKind, EntityRef, FeedItem, FeedOrder, ThemeStat, TrendPoint};
use crate::analyze::{Annotation, Pipeline};
use crate::config::Settings;
use crate::ingest::{self, types::SourceObject, BackfillStats};
use crate::metrics::Metrics;
use crate::store::MemoryStore;

const MAX_LIMIT: usize = 500;
const PREVIEW_CHARS: usize = 240;
const MIN_PREVIEW_CHARS: usize = 50;
const MAX_PREVIEW_CHARS: usize = 2000;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<MemoryStore>,
    pub metrics: Option<Metrics>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, store: Arc<MemoryStore>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            metrics: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Pipeline::from_settings(settings), Arc::new(MemoryStore::new()))
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

pub fn router(state: AppState) -> Router {
    let metrics = state.metrics.as_ref().map(Metrics::router);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/annotate", post(annotate))
        .route("/objects", post(ingest_objects))
        .route("/ports", get(list_ports))
        .route("/lines", get(list_lines))
        .route("/search", get(search))
        .route("/ports/{id}", get(port_summary))
        .route("/lines/{id}", get(line_summary))
        .route("/ships/{id}", get(ship_summary))
        .route("/ports/{id}/themes", get(port_themes))
        .route("/lines/{id}/themes", get(line_themes))
        .route("/ships/{id}/themes", get(ship_themes))
        .route("/ports/{id}/feed", feed_route(EntityKind::Port, FeedOrder::Worst, 25))
        .route("/lines/{id}/feed", feed_route(EntityKind::Line, FeedOrder::Worst, 25))
        .route("/ships/{id}/feed", feed_route(EntityKind::Ship, FeedOrder::Worst, 25))
        .route("/lines/{id}/top-comments", feed_route(EntityKind::Line, FeedOrder::Top, 20))
        .route("/lines/{id}/worst-comments", feed_route(EntityKind::Line, FeedOrder::Worst, 20))
        .route("/ships/{id}/top-comments", feed_route(EntityKind::Ship, FeedOrder::Top, 15))
        .route("/ships/{id}/worst-comments", feed_route(EntityKind::Ship, FeedOrder::Worst, 15))
        .route("/ports/{id}/trend", trend_route(EntityKind::Port))
        .route("/lines/{id}/trend", trend_route(EntityKind::Line))
        .route("/ships/{id}/trend", trend_route(EntityKind::Ship))
        .route("/ports/{id}/lines", co_mention_route(EntityKind::Port, EntityKind::Line, 30))
        .route("/ports/{id}/ships", co_mention_route(EntityKind::Port, EntityKind::Ship, 30))
        .route("/lines/{id}/ports", co_mention_route(EntityKind::Line, EntityKind::Port, 20))
        .route("/ships/{id}/ports", co_mention_route(EntityKind::Ship, EntityKind::Port, 80))
        .with_state(state);

    let app = match metrics {
        Some(m) => app.merge(m),
        None => app,
    };
    app.layer(CorsLayer::very_permissive())
}

fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

#[derive(Deserialize)]
struct AnnotateReq {
    text: String,
}

async fn annotate(State(state): State<AppState>, Json(body): Json<AnnotateReq>) -> Json<Annotation> {
    Json(state.pipeline.annotate(&body.text))
}

async fn ingest_objects(
    State(state): State<AppState>,
    Json(objects): Json<Vec<SourceObject>>,
) -> Result<Json<BackfillStats>, (StatusCode, String)> {
    match ingest::backfill(&objects, &*state.pipeline, &*state.store) {
        Ok(stats) => {
            info!(target: "api", received = objects.len(), annotated = stats.annotated(), "objects ingested");
            Ok(Json(stats))
        }
        Err(e) => {
            warn!(target: "api", error = ?e, "ingest failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_ports(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Json<Vec<EntityRef>> {
    let dict = state.pipeline.extractor().dictionary();
    let snap = state.store.snapshot();
    Json(analytics::list_ports(&snap, dict.as_deref(), clamp_limit(q.limit, 50)))
}

async fn list_lines(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Json<Vec<EntityRef>> {
    let snap = state.store.snapshot();
    Json(analytics::list_lines(&snap, clamp_limit(q.limit, 50)))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

async fn search(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Json<Vec<EntityRef>> {
    let dict = state.pipeline.extractor().dictionary();
    let snap = state.store.snapshot();
    Json(analytics::search(&snap, dict.as_deref(), &q.q, clamp_limit(q.limit, 20)))
}

fn summary_for(state: &AppState, kind: EntityKind, id: &str) -> Json<Value> {
    let snap = state.store.snapshot();
    let summary = analytics::summary(&snap, kind, id);
    let mut out = Map::new();
    out.insert(format!("{kind}_id"), Value::from(id));
    out.insert("sentiment".into(), json!(summary));
    Json(Value::Object(out))
}

async fn port_summary(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    summary_for(&state, EntityKind::Port, &id)
}

async fn line_summary(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    summary_for(&state, EntityKind::Line, &id)
}

async fn ship_summary(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    summary_for(&state, EntityKind::Ship, &id)
}

#[derive(Deserialize)]
struct ThemesQuery {
    limit: Option<usize>,
    min_n: Option<usize>,
}

fn themes_for(state: &AppState, kind: EntityKind, id: &str, q: ThemesQuery) -> Json<Vec<ThemeStat>> {
    let snap = state.store.snapshot();
    Json(analytics::themes(
        &snap,
        kind,
        id,
        q.min_n.unwrap_or(1),
        clamp_limit(q.limit, 15),
    ))
}

async fn port_themes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ThemesQuery>,
) -> Json<Vec<ThemeStat>> {
    themes_for(&state, EntityKind::Port, &id, q)
}

async fn line_themes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ThemesQuery>,
) -> Json<Vec<ThemeStat>> {
    themes_for(&state, EntityKind::Line, &id, q)
}

async fn ship_themes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ThemesQuery>,
) -> Json<Vec<ThemeStat>> {
    themes_for(&state, EntityKind::Ship, &id, q)
}

#[derive(Deserialize)]
struct FeedQuery {
    limit: Option<usize>,
    preview_chars: Option<usize>,
    theme: Option<String>,
}

fn feed_route(kind: EntityKind, order: FeedOrder, default_limit: usize) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>, Path(id): Path<String>, Query(q): Query<FeedQuery>| async move {
            let snap = state.store.snapshot();
            let preview = q
                .preview_chars
                .unwrap_or(PREVIEW_CHARS)
                .clamp(MIN_PREVIEW_CHARS, MAX_PREVIEW_CHARS);
            let theme = q.theme.as_deref().filter(|t| !t.trim().is_empty());
            let items: Vec<FeedItem> = analytics::feed(
                &snap,
                kind,
                &id,
                order,
                theme,
                preview,
                clamp_limit(q.limit, default_limit),
            );
            Json(items)
        },
    )
}

fn trend_route(kind: EntityKind) -> MethodRouter<AppState> {
    get(move |State(state): State<AppState>, Path(id): Path<String>| async move {
        let snap = state.store.snapshot();
        let points: Vec<TrendPoint> = analytics::trend(&snap, kind, &id);
        Json(points)
    })
}

fn co_mention_route(kind: EntityKind, of: EntityKind, default_limit: usize) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>, Path(id): Path<String>, Query(q): Query<ListQuery>| async move {
            let dict = state.pipeline.extractor().dictionary();
            let snap = state.store.snapshot();
            let rows: Vec<CoMention> = analytics::co_mentions(
                &snap,
                kind,
                &id,
                of,
                dict.as_deref(),
                clamp_limit(q.limit, default_limit),
            );
            Json(rows)
        },
    )
}
