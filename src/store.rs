//! Persistence rows for annotations and an in-memory store keyed like the
//! relational tables they mirror (`nlp_scores`, `extraction`, `themes`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Post,
    Comment,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Post => "post",
            ObjectType::Comment => "comment",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(object_type, object_id)`
pub type ObjectKey = (ObjectType, String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRow {
    pub object_type: ObjectType,
    pub object_id: String,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    pub severity_score: f64,
    pub model_version: String,
    pub scored_at_utc: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRow {
    pub object_type: ObjectType,
    pub object_id: String,
    pub cruise_line: Option<String>,
    /// JSON array string, e.g. `["icon-of-the-seas"]`
    pub ship_ids: String,
    /// JSON array string, e.g. `["cozumel","nassau"]`
    pub port_ids: String,
    pub confidence: f64,
    pub extracted_at_utc: i64,
}

impl ExtractionRow {
    pub fn ship_id_list(&self) -> Vec<String> {
        loads_list(&self.ship_ids)
    }

    pub fn port_id_list(&self) -> Vec<String> {
        loads_list(&self.port_ids)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRow {
    pub object_type: ObjectType,
    pub object_id: String,
    pub theme_label: String,
    pub theme_score: f64,
    pub model_version: String,
    pub labeled_at_utc: i64,
}

/// Source metadata kept for feeds and trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRow {
    pub object_type: ObjectType,
    pub object_id: String,
    pub created_utc: Option<i64>,
    pub subreddit: Option<String>,
    pub author: Option<String>,
    /// Upvote score from the source platform.
    pub score: Option<i64>,
    pub permalink: Option<String>,
    /// Composed text that was annotated.
    pub text: String,
}

/// Compact JSON array text. Non-ASCII characters are kept as-is.
pub fn dumps_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Inverse of [`dumps_list`]; anything unparsable reads as empty.
pub fn loads_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

/// Upsert sink for annotation rows. Last write wins per key.
pub trait AnnotationStore: Send + Sync {
    fn upsert_sentiment(&self, row: SentimentRow) -> anyhow::Result<()>;
    fn upsert_extraction(&self, row: ExtractionRow) -> anyhow::Result<()>;
    fn upsert_themes(&self, rows: Vec<ThemeRow>) -> anyhow::Result<()>;
    fn upsert_object(&self, row: ObjectRow) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
struct Tables {
    objects: BTreeMap<ObjectKey, ObjectRow>,
    sentiment: BTreeMap<ObjectKey, SentimentRow>,
    extraction: BTreeMap<ObjectKey, ExtractionRow>,
    themes: BTreeMap<(ObjectType, String, String), ThemeRow>,
}

/// Point-in-time copy of all rows, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub objects: BTreeMap<ObjectKey, ObjectRow>,
    pub sentiment: BTreeMap<ObjectKey, SentimentRow>,
    pub extraction: BTreeMap<ObjectKey, ExtractionRow>,
    pub themes: Vec<ThemeRow>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sentiment(&self, object_type: ObjectType, object_id: &str) -> Option<SentimentRow> {
        let t = self.inner.lock().expect("store mutex poisoned");
        t.sentiment.get(&(object_type, object_id.to_string())).cloned()
    }

    pub fn extraction(&self, object_type: ObjectType, object_id: &str) -> Option<ExtractionRow> {
        let t = self.inner.lock().expect("store mutex poisoned");
        t.extraction.get(&(object_type, object_id.to_string())).cloned()
    }

    pub fn object(&self, object_type: ObjectType, object_id: &str) -> Option<ObjectRow> {
        let t = self.inner.lock().expect("store mutex poisoned");
        t.objects.get(&(object_type, object_id.to_string())).cloned()
    }

    pub fn themes_for(&self, object_type: ObjectType, object_id: &str) -> Vec<ThemeRow> {
        let t = self.inner.lock().expect("store mutex poisoned");
        t.themes
            .values()
            .filter(|r| r.object_type == object_type && r.object_id == object_id)
            .cloned()
            .collect()
    }

    /// (sentiment rows, extraction rows, theme rows)
    pub fn counts(&self) -> (usize, usize, usize) {
        let t = self.inner.lock().expect("store mutex poisoned");
        (t.sentiment.len(), t.extraction.len(), t.themes.len())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let t = self.inner.lock().expect("store mutex poisoned");
        StoreSnapshot {
            objects: t.objects.clone(),
            sentiment: t.sentiment.clone(),
            extraction: t.extraction.clone(),
            themes: t.themes.values().cloned().collect(),
        }
    }
}

impl AnnotationStore for MemoryStore {
    fn upsert_sentiment(&self, row: SentimentRow) -> anyhow::Result<()> {
        let mut t = self.inner.lock().expect("store mutex poisoned");
        t.sentiment.insert((row.object_type, row.object_id.clone()), row);
        Ok(())
    }

    fn upsert_extraction(&self, row: ExtractionRow) -> anyhow::Result<()> {
        let mut t = self.inner.lock().expect("store mutex poisoned");
        t.extraction.insert((row.object_type, row.object_id.clone()), row);
        Ok(())
    }

    fn upsert_themes(&self, rows: Vec<ThemeRow>) -> anyhow::Result<()> {
        let mut t = self.inner.lock().expect("store mutex poisoned");
        for row in rows {
            let key = (row.object_type, row.object_id.clone(), row.theme_label.clone());
            t.themes.insert(key, row);
        }
        Ok(())
    }

    fn upsert_object(&self, row: ObjectRow) -> anyhow::Result<()> {
        let mut t = self.inner.lock().expect("store mutex poisoned");
        t.objects.insert((row.object_type, row.object_id.clone()), row);
        Ok(())
    }
}
