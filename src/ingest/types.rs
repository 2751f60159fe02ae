// src/ingest/types.rs
use anyhow::Result;

pub use crate::store::ObjectType;

/// One forum object as delivered by a content source.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SourceObject {
    pub object_type: ObjectType,
    pub object_id: String,
    #[serde(default)]
    pub title: Option<String>, // posts only
    #[serde(default)]
    pub body: Option<String>, // selftext for posts, body for comments
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub created_utc: Option<i64>, // unix seconds
    #[serde(default)]
    pub score: Option<i64>, // upvotes
    #[serde(default)]
    pub permalink: Option<String>,
}

#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<SourceObject>>;
    fn name(&self) -> &'static str;
}
