// src/ingest/mod.rs
//! Batch annotation of forum objects into an [`AnnotationStore`].

pub mod scheduler;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::analyze::themes::THEME_MODEL_VERSION;
use crate::analyze::{Annotation, Pipeline};
use crate::ingest::types::{ContentSource, ObjectType, SourceObject};
use crate::sentiment::{PolarityAnalyzer, SENTIMENT_MODEL_VERSION};
use crate::store::{dumps_list, AnnotationStore, ExtractionRow, ObjectRow, SentimentRow, ThemeRow};

/// Authors whose objects are never annotated.
pub const SKIP_AUTHORS: &[&str] = &["AutoModerator"];

const PROGRESS_EVERY_POSTS: usize = 500;
const PROGRESS_EVERY_COMMENTS: usize = 5000;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("annotate_objects_total", "Objects annotated and stored.");
        describe_counter!(
            "annotate_skipped_total",
            "Objects skipped (bot author or no text)."
        );
        describe_counter!(
            "annotate_port_fallback_total",
            "Extractions that used the fallback port list."
        );
        describe_counter!("annotate_themes_total", "Theme rows written.");
        describe_counter!(
            "ingest_source_errors_total",
            "Content source fetch errors."
        );
        describe_counter!("ingest_runs_total", "Scheduled ingest ticks.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when ingest last ran.");
    });
}

/// Short, non-reversible fingerprint of text for logs.
pub fn anon_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

/// Text to annotate: post = title + blank line + selftext, comment = body.
/// HTML entities are decoded; the result is trimmed.
pub fn compose_text(obj: &SourceObject) -> String {
    let raw = match obj.object_type {
        ObjectType::Post => format!(
            "{}\n\n{}",
            obj.title.as_deref().unwrap_or_default(),
            obj.body.as_deref().unwrap_or_default()
        ),
        ObjectType::Comment => obj.body.clone().unwrap_or_default(),
    };
    html_escape::decode_html_entities(&raw).trim().to_string()
}

pub fn is_skipped_author(author: Option<&str>) -> bool {
    author.is_some_and(|a| SKIP_AUTHORS.contains(&a))
}

/// Rows produced for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAnnotation {
    pub annotation: Annotation,
    pub object: ObjectRow,
    pub sentiment: SentimentRow,
    pub extraction: ExtractionRow,
    pub themes: Vec<ThemeRow>,
}

/// Annotate one object. `None` for bot authors and objects without text.
pub fn annotate_object<A: PolarityAnalyzer>(
    pipeline: &Pipeline<A>,
    obj: &SourceObject,
    now: i64,
) -> Option<ObjectAnnotation> {
    if is_skipped_author(obj.author.as_deref()) {
        return None;
    }
    let text = compose_text(obj);
    if text.is_empty() {
        return None;
    }

    let annotation = pipeline.annotate(&text);
    let ex = &annotation.extraction;

    let sentiment = SentimentRow {
        object_type: obj.object_type,
        object_id: obj.object_id.clone(),
        sentiment_label: annotation.sentiment.label.as_str().to_string(),
        sentiment_score: annotation.sentiment.score,
        severity_score: annotation.sentiment.severity,
        model_version: SENTIMENT_MODEL_VERSION.to_string(),
        scored_at_utc: now,
    };
    let extraction = ExtractionRow {
        object_type: obj.object_type,
        object_id: obj.object_id.clone(),
        cruise_line: ex.cruise_line.clone(),
        ship_ids: dumps_list(&ex.ship_ids),
        port_ids: dumps_list(&ex.port_ids),
        confidence: ex.confidence,
        extracted_at_utc: now,
    };
    let themes = annotation
        .themes
        .iter()
        .map(|h| ThemeRow {
            object_type: obj.object_type,
            object_id: obj.object_id.clone(),
            theme_label: h.label.as_str().to_string(),
            theme_score: h.score,
            model_version: THEME_MODEL_VERSION.to_string(),
            labeled_at_utc: now,
        })
        .collect();

    debug!(
        target: "ingest",
        object_id = %obj.object_id,
        text_hash = %anon_hash(&text),
        label = annotation.sentiment.label.as_str(),
        ports = ex.port_ids.len(),
        "object annotated"
    );

    let object = ObjectRow {
        object_type: obj.object_type,
        object_id: obj.object_id.clone(),
        created_utc: obj.created_utc,
        subreddit: obj.subreddit.clone(),
        author: obj.author.clone(),
        score: obj.score,
        permalink: obj.permalink.clone(),
        text,
    };

    Some(ObjectAnnotation {
        annotation,
        object,
        sentiment,
        extraction,
        themes,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillStats {
    pub posts: usize,
    pub comments: usize,
    pub skipped: usize,
    pub themes: usize,
}

impl BackfillStats {
    pub fn annotated(&self) -> usize {
        self.posts + self.comments
    }
}

/// Annotate and upsert every object sequentially. Store errors abort the run.
pub fn backfill<A: PolarityAnalyzer>(
    objects: &[SourceObject],
    pipeline: &Pipeline<A>,
    store: &dyn AnnotationStore,
) -> anyhow::Result<BackfillStats> {
    ensure_metrics_described();
    let now = chrono::Utc::now().timestamp();
    let mut stats = BackfillStats::default();

    for obj in objects {
        let Some(out) = annotate_object(pipeline, obj, now) else {
            stats.skipped += 1;
            counter!("annotate_skipped_total").increment(1);
            continue;
        };

        stats.themes += out.themes.len();
        counter!("annotate_themes_total").increment(out.themes.len() as u64);

        store.upsert_object(out.object)?;
        store.upsert_sentiment(out.sentiment)?;
        store.upsert_extraction(out.extraction)?;
        store.upsert_themes(out.themes)?;
        counter!("annotate_objects_total").increment(1);

        match obj.object_type {
            ObjectType::Post => {
                stats.posts += 1;
                if stats.posts % PROGRESS_EVERY_POSTS == 0 {
                    info!(target: "ingest", posts = stats.posts, "backfill progress");
                }
            }
            ObjectType::Comment => {
                stats.comments += 1;
                if stats.comments % PROGRESS_EVERY_COMMENTS == 0 {
                    info!(target: "ingest", comments = stats.comments, "backfill progress");
                }
            }
        }
    }

    info!(
        target: "ingest",
        posts = stats.posts,
        comments = stats.comments,
        skipped = stats.skipped,
        themes = stats.themes,
        "backfill done"
    );
    Ok(stats)
}

/// Fetch from every source (errors are logged and counted), then backfill.
pub async fn run_once<A: PolarityAnalyzer>(
    sources: &[Box<dyn ContentSource>],
    pipeline: &Pipeline<A>,
    store: &dyn AnnotationStore,
) -> anyhow::Result<BackfillStats> {
    ensure_metrics_described();

    let mut objects = Vec::new();
    for s in sources {
        match s.fetch_latest().await {
            Ok(mut v) => objects.append(&mut v),
            Err(e) => {
                warn!(target: "ingest", error = ?e, source = s.name(), "source error");
                counter!("ingest_source_errors_total").increment(1);
            }
        }
    }

    let stats = backfill(&objects, pipeline, store)?;
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    Ok(stats)
}
