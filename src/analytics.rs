//! Read-side aggregations over stored annotations: entity listings,
//! per-entity sentiment summaries, theme breakdowns, co-mentions, comment
//! feeds and monthly trends.
//!
//! Only objects that have both an extraction row and a sentiment row count.
//! Feeds and trends also need the stored source object.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::analyze::AliasDictionary;
use crate::ingest::is_skipped_author;
use crate::store::{ExtractionRow, ObjectRow, ObjectType, SentimentRow, StoreSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Port,
    Line,
    Ship,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Port => "port",
            EntityKind::Line => "line",
            EntityKind::Ship => "ship",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityKind,
    pub id: String,
    pub name: String,
    pub mentions: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub mentions: usize,
    pub avg_sentiment: Option<f64>,
    pub avg_severity: Option<f64>,
    pub neg_count: Option<usize>,
    pub pos_count: Option<usize>,
    pub neu_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeStat {
    pub theme_label: String,
    pub n: usize,
    pub avg_sent: f64,
    pub neg_count: usize,
}

/// `"Royal Caribbean"` -> `"royal-caribbean"`
pub fn line_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn line_name(row: &ExtractionRow) -> Option<&str> {
    row.cruise_line
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn matches(row: &ExtractionRow, kind: EntityKind, id: &str) -> bool {
    match kind {
        EntityKind::Port => row.port_id_list().iter().any(|p| p == id),
        EntityKind::Ship => row.ship_id_list().iter().any(|s| s == id),
        EntityKind::Line => line_name(row).is_some_and(|n| line_id(n) == id),
    }
}

/// Extraction rows joined with their sentiment rows.
fn joined(snap: &StoreSnapshot) -> impl Iterator<Item = (&ExtractionRow, &SentimentRow)> {
    snap.extraction
        .iter()
        .filter_map(|(key, ex)| snap.sentiment.get(key).map(|s| (ex, s)))
}

fn rank(mut out: Vec<EntityRef>, limit: usize) -> Vec<EntityRef> {
    out.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.id.cmp(&b.id)));
    out.truncate(limit);
    out
}

/// Ports by mention count. Names come from the alias dictionary when known.
pub fn list_ports(
    snap: &StoreSnapshot,
    dict: Option<&AliasDictionary>,
    limit: usize,
) -> Vec<EntityRef> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (ex, _) in joined(snap) {
        for p in ex.port_id_list() {
            *counts.entry(p).or_default() += 1;
        }
    }
    let out = counts
        .into_iter()
        .map(|(id, mentions)| EntityRef {
            entity_type: EntityKind::Port,
            name: dict
                .and_then(|d| d.canonical_name(&id))
                .map(str::to_string)
                .unwrap_or_else(|| id.clone()),
            id,
            mentions,
        })
        .collect();
    rank(out, limit)
}

pub fn list_lines(snap: &StoreSnapshot, limit: usize) -> Vec<EntityRef> {
    let mut counts: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for (ex, _) in joined(snap) {
        if let Some(name) = line_name(ex) {
            let e = counts
                .entry(line_id(name))
                .or_insert_with(|| (name.to_string(), 0));
            e.1 += 1;
        }
    }
    let out = counts
        .into_iter()
        .map(|(id, (name, mentions))| EntityRef {
            entity_type: EntityKind::Line,
            id,
            name,
            mentions,
        })
        .collect();
    rank(out, limit)
}

/// Ports and lines whose id or name contains `q` (case-insensitive).
pub fn search(
    snap: &StoreSnapshot,
    dict: Option<&AliasDictionary>,
    q: &str,
    limit: usize,
) -> Vec<EntityRef> {
    let q = q.trim().to_lowercase();
    if q.is_empty() {
        return Vec::new();
    }
    let hit = |e: &EntityRef| e.id.contains(&q) || e.name.to_lowercase().contains(&q);
    let out = list_ports(snap, dict, usize::MAX)
        .into_iter()
        .chain(list_lines(snap, usize::MAX))
        .filter(hit)
        .collect();
    rank(out, limit)
}

pub fn summary(snap: &StoreSnapshot, kind: EntityKind, id: &str) -> SentimentSummary {
    let rows: Vec<&SentimentRow> = joined(snap)
        .filter(|(ex, _)| matches(ex, kind, id))
        .map(|(_, s)| s)
        .collect();
    if rows.is_empty() {
        return SentimentSummary::default();
    }

    let n = rows.len() as f64;
    let count = |label: &str| rows.iter().filter(|s| s.sentiment_label == label).count();
    SentimentSummary {
        mentions: rows.len(),
        avg_sentiment: Some(rows.iter().map(|s| s.sentiment_score).sum::<f64>() / n),
        avg_severity: Some(rows.iter().map(|s| s.severity_score).sum::<f64>() / n),
        neg_count: Some(count("neg")),
        pos_count: Some(count("pos")),
        neu_count: Some(count("neu")),
    }
}

/// Themes seen on objects mentioning the entity, worst average sentiment first.
pub fn themes(
    snap: &StoreSnapshot,
    kind: EntityKind,
    id: &str,
    min_n: usize,
    limit: usize,
) -> Vec<ThemeStat> {
    let matched: HashMap<(crate::store::ObjectType, &str), &SentimentRow> = joined(snap)
        .filter(|(ex, _)| matches(ex, kind, id))
        .map(|(ex, s)| ((ex.object_type, ex.object_id.as_str()), s))
        .collect();

    // label -> (n, sum of scores, neg)
    let mut acc: BTreeMap<&str, (usize, f64, usize)> = BTreeMap::new();
    for t in &snap.themes {
        if let Some(s) = matched.get(&(t.object_type, t.object_id.as_str())) {
            let e = acc.entry(t.theme_label.as_str()).or_default();
            e.0 += 1;
            e.1 += s.sentiment_score;
            if s.sentiment_label == "neg" {
                e.2 += 1;
            }
        }
    }

    let mut out: Vec<ThemeStat> = acc
        .into_iter()
        .filter(|(_, (n, _, _))| *n >= min_n)
        .map(|(label, (n, sum, neg))| ThemeStat {
            theme_label: label.to_string(),
            n,
            avg_sent: sum / n as f64,
            neg_count: neg,
        })
        .collect();
    out.sort_by(|a, b| {
        a.avg_sent
            .partial_cmp(&b.avg_sent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out.truncate(limit);
    out
}

/* ----------------------------
Co-mentions
---------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoMention {
    pub entity_type: EntityKind,
    pub id: String,
    pub name: String,
    pub mentions: usize,
    pub avg_sev: f64,
    pub avg_sent: f64,
}

/// Line implied by a line-specific community when the text named none.
pub fn line_from_subreddit(subreddit: &str) -> Option<&'static str> {
    match subreddit.trim().to_lowercase().as_str() {
        "royalcaribbean" | "rccl" | "rcl" => Some("Royal Caribbean"),
        "carnivalcruise" | "carnivalcruisefans" => Some("Carnival"),
        "ncl" | "norwegiancruise" => Some("Norwegian"),
        "msccruises" => Some("MSC"),
        "disneycruise" | "disneycruiseline" => Some("Disney"),
        "princesscruises" => Some("Princess"),
        "celebritycruises" => Some("Celebrity"),
        "virginvoyages" => Some("Virgin"),
        _ => None,
    }
}

fn object_of<'a>(snap: &'a StoreSnapshot, ex: &ExtractionRow) -> Option<&'a ObjectRow> {
    snap.objects.get(&(ex.object_type, ex.object_id.clone()))
}

/// (id, display name) of every `kind` entity on one object.
fn entities_on(ex: &ExtractionRow, obj: Option<&ObjectRow>, kind: EntityKind) -> Vec<(String, String)> {
    match kind {
        EntityKind::Port => ex.port_id_list().into_iter().map(|p| (p.clone(), p)).collect(),
        EntityKind::Ship => ex.ship_id_list().into_iter().map(|s| (s.clone(), s)).collect(),
        EntityKind::Line => line_name(ex)
            .or_else(|| obj.and_then(|o| o.subreddit.as_deref()).and_then(line_from_subreddit))
            .map(|n| vec![(line_id(n), n.to_string())])
            .unwrap_or_default(),
    }
}

/// Entities of kind `of` that appear on objects mentioning `(kind, id)`, most frequent first.
pub fn co_mentions(
    snap: &StoreSnapshot,
    kind: EntityKind,
    id: &str,
    of: EntityKind,
    dict: Option<&AliasDictionary>,
    limit: usize,
) -> Vec<CoMention> {
    // id -> (name, n, severity sum, sentiment sum)
    let mut acc: BTreeMap<String, (String, usize, f64, f64)> = BTreeMap::new();
    for (ex, s) in joined(snap).filter(|(ex, _)| matches(ex, kind, id)) {
        for (eid, name) in entities_on(ex, object_of(snap, ex), of) {
            if of == kind && eid == id {
                continue;
            }
            let e = acc.entry(eid).or_insert_with(|| (name, 0, 0.0, 0.0));
            e.1 += 1;
            e.2 += s.severity_score;
            e.3 += s.sentiment_score;
        }
    }

    let mut out: Vec<CoMention> = acc
        .into_iter()
        .map(|(eid, (name, n, sev, sent))| CoMention {
            entity_type: of,
            name: match of {
                EntityKind::Port => dict
                    .and_then(|d| d.canonical_name(&eid))
                    .map(str::to_string)
                    .unwrap_or(name),
                _ => name,
            },
            id: eid,
            mentions: n,
            avg_sev: sev / n as f64,
            avg_sent: sent / n as f64,
        })
        .collect();
    out.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.id.cmp(&b.id)));
    out.truncate(limit);
    out
}

/* ----------------------------
Feeds
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrder {
    /// Highest severity first, then most negative.
    Worst,
    /// Highest upvote score first, then highest severity.
    Top,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub object_type: ObjectType,
    pub object_id: String,
    pub created_utc: Option<i64>,
    pub subreddit: Option<String>,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    pub severity_score: f64,
    pub preview: String,
    pub permalink: Option<String>,
}

/// Objects mentioning the entity, optionally restricted to one theme label.
pub fn feed(
    snap: &StoreSnapshot,
    kind: EntityKind,
    id: &str,
    order: FeedOrder,
    theme: Option<&str>,
    preview_chars: usize,
    limit: usize,
) -> Vec<FeedItem> {
    let themed: Option<HashSet<(ObjectType, &str)>> = theme.map(|label| {
        snap.themes
            .iter()
            .filter(|t| t.theme_label == label)
            .map(|t| (t.object_type, t.object_id.as_str()))
            .collect()
    });

    let mut rows: Vec<(&SentimentRow, &ObjectRow)> = joined(snap)
        .filter(|(ex, _)| matches(ex, kind, id))
        .filter(|(ex, _)| {
            themed
                .as_ref()
                .map_or(true, |set| set.contains(&(ex.object_type, ex.object_id.as_str())))
        })
        .filter_map(|(ex, s)| object_of(snap, ex).map(|o| (s, o)))
        .filter(|(_, o)| !is_skipped_author(o.author.as_deref()))
        .collect();

    match order {
        FeedOrder::Worst => rows.sort_by(|(a, _), (b, _)| {
            b.severity_score
                .total_cmp(&a.severity_score)
                .then(a.sentiment_score.total_cmp(&b.sentiment_score))
        }),
        FeedOrder::Top => rows.sort_by(|(a, ao), (b, bo)| {
            bo.score
                .unwrap_or(i64::MIN)
                .cmp(&ao.score.unwrap_or(i64::MIN))
                .then(b.severity_score.total_cmp(&a.severity_score))
        }),
    }

    rows.into_iter()
        .take(limit)
        .map(|(s, o)| FeedItem {
            object_type: o.object_type,
            object_id: o.object_id.clone(),
            created_utc: o.created_utc,
            subreddit: o.subreddit.clone(),
            sentiment_label: s.sentiment_label.clone(),
            sentiment_score: s.sentiment_score,
            severity_score: s.severity_score,
            preview: o.text.chars().take(preview_chars).collect(),
            permalink: o.permalink.clone(),
        })
        .collect()
}

/* ----------------------------
Trend
---------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM` (UTC)
    pub month: String,
    pub n: usize,
    pub avg_sev: f64,
    pub avg_sent: f64,
}

/// Monthly averages for objects mentioning the entity; objects without a timestamp are left out.
pub fn trend(snap: &StoreSnapshot, kind: EntityKind, id: &str) -> Vec<TrendPoint> {
    let mut acc: BTreeMap<String, (usize, f64, f64)> = BTreeMap::new();
    for (ex, s) in joined(snap).filter(|(ex, _)| matches(ex, kind, id)) {
        let Some(month) = object_of(snap, ex)
            .and_then(|o| o.created_utc)
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|d| d.format("%Y-%m").to_string())
        else {
            continue;
        };
        let e = acc.entry(month).or_default();
        e.0 += 1;
        e.1 += s.severity_score;
        e.2 += s.sentiment_score;
    }
    acc.into_iter()
        .map(|(month, (n, sev, sent))| TrendPoint {
            month,
            n,
            avg_sev: sev / n as f64,
            avg_sent: sent / n as f64,
        })
        .collect()
}
