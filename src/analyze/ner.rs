// src/analyze/ner.rs
//! Entity extraction: cruise line, ships and ports from free text.
//!
//! Everything runs on normalized text (see [`crate::normalize`]), so all matching is
//! plain word-bounded substring search:
//! - cruise line: ordered pattern table, first pattern that matches wins
//! - ports: alias dictionary, longest alias first, non-overlapping spans, deduped by id;
//!   without a dictionary an exact-match fallback over a caller-supplied list is used
//! - ships: exact names only, longest first, deduped by id
//!
//! Combined confidence weights the line strongest (0.55), then ports (0.35), then ships (0.10).

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use super::ports::{AliasDictionary, HotReloadAliases, DEFAULT_ALIAS_SOURCE_PATH};
use super::round3;
use crate::normalize::{find_bounded, normalize_text, slugify};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    pub cruise_line: Option<String>,
    pub ship_ids: Vec<String>,
    pub port_ids: Vec<String>,
    pub confidence: f64,
}

/* ----------------------------
Cruise line table
---------------------------- */

/// One word-bounded pattern (already normalized).
#[derive(Debug, Clone, Copy)]
pub struct LinePattern {
    pub pattern: &'static str,
    /// Short abbreviation prone to false positives; forces confidence to 0.65.
    pub low_confidence: bool,
}

const fn p(pattern: &'static str) -> LinePattern {
    LinePattern {
        pattern,
        low_confidence: false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CruiseLine {
    pub name: &'static str,
    pub patterns: &'static [LinePattern],
}

/// Order matters: lines are tried top to bottom, patterns left to right.
pub static CRUISE_LINES: &[CruiseLine] = &[
    CruiseLine {
        name: "Royal Caribbean",
        patterns: &[p("royal caribbean"), p("rcl"), p("rccl"), p("royal")],
    },
    CruiseLine {
        name: "Carnival",
        patterns: &[p("carnival"), p("ccl")],
    },
    CruiseLine {
        name: "Norwegian",
        patterns: &[p("norwegian"), p("ncl")],
    },
    CruiseLine {
        name: "MSC",
        patterns: &[p("msc"), p("msc cruises")],
    },
    CruiseLine {
        name: "Celebrity",
        patterns: &[p("celebrity")],
    },
    CruiseLine {
        name: "Disney",
        patterns: &[p("disney cruise"), p("disney"), p("dcl")],
    },
    CruiseLine {
        name: "Princess",
        patterns: &[p("princess")],
    },
    CruiseLine {
        name: "Virgin",
        patterns: &[
            p("virgin voyages"),
            p("virgin"),
            LinePattern {
                pattern: "vv",
                low_confidence: true,
            },
        ],
    },
];

const LOW_CONFIDENCE_LINE: f64 = 0.65;

struct CompiledLine {
    name: &'static str,
    full_name: bool,
    patterns: Vec<(Regex, bool)>,
}

// Normalized text only holds [a-z0-9 ], so `\b` is exactly an alphanumeric edge.
static COMPILED_LINES: Lazy<Vec<CompiledLine>> = Lazy::new(|| {
    CRUISE_LINES
        .iter()
        .map(|line| CompiledLine {
            name: line.name,
            full_name: normalize_text(line.name).contains(' '),
            patterns: line
                .patterns
                .iter()
                .map(|lp| {
                    let re = Regex::new(&format!(r"\b{}\b", regex::escape(lp.pattern)))
                        .expect("cruise line pattern");
                    (re, lp.low_confidence)
                })
                .collect(),
        })
        .collect()
});

/// First matching cruise line and its confidence (0.9 full name, 0.8 single word,
/// 0.65 for flagged abbreviations). No match -> `(None, 0.0)`.
pub fn guess_cruise_line(text_norm: &str) -> (Option<&'static str>, f64) {
    for line in COMPILED_LINES.iter() {
        for (re, low) in &line.patterns {
            if re.is_match(text_norm) {
                let conf = if *low {
                    LOW_CONFIDENCE_LINE
                } else if line.full_name {
                    0.9
                } else {
                    0.8
                };
                return (Some(line.name), conf);
            }
        }
    }
    (None, 0.0)
}

/* ----------------------------
Ports
---------------------------- */

fn overlaps(a: (usize, usize), b: (usize, usize)) -> bool {
    !(a.1 <= b.0 || a.0 >= b.1)
}

/// Dictionary-backed port matching. Aliases are tried longest first; a match whose
/// span overlaps an already accepted span is rejected, and each port id is accepted once.
pub fn extract_ports(text_norm: &str, dict: &AliasDictionary) -> (Vec<String>, f64) {
    let mut found: Vec<String> = Vec::new();
    let mut used_spans: Vec<(usize, usize)> = Vec::new();

    for (alias, port_id) in dict.ordered_aliases() {
        let Some(span) = find_bounded(text_norm, alias) else {
            continue;
        };
        if used_spans.iter().any(|s| overlaps(span, *s)) {
            continue;
        }
        if !found.contains(port_id) {
            found.push(port_id.clone());
            used_spans.push(span);
        }
    }

    if found.is_empty() {
        return (found, 0.0);
    }

    let multiword = found
        .iter()
        .filter(|id| {
            dict.canonical_name(id)
                .map(|c| normalize_text(c).contains(' '))
                .unwrap_or(false)
        })
        .count();

    let conf = (0.70 + 0.05 * found.len() as f64 + 0.05 * multiword as f64).min(0.95);
    (found, conf)
}

/// Cold-start matching without a dictionary: exact word-bounded names, flat 0.65 confidence.
pub fn extract_ports_fallback(text_norm: &str, ports: &[String]) -> (Vec<String>, f64) {
    let mut found: Vec<String> = Vec::new();
    for port in ports {
        let norm = normalize_text(port);
        if find_bounded(text_norm, &norm).is_some() {
            let id = norm.replace(' ', "-");
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    let conf = if found.is_empty() { 0.0 } else { 0.65 };
    (found, conf)
}

/* ----------------------------
Ships
---------------------------- */

/// Conservative ship matching: exact names, longest first, deduped by id.
pub fn extract_ships(text_norm: &str, ships: &[String]) -> (Vec<String>, f64) {
    let mut candidates: Vec<(String, String)> = ships
        .iter()
        .map(|s| (normalize_text(s), slugify(s)))
        .filter(|(n, _)| !n.is_empty())
        .collect();
    candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut found: Vec<String> = Vec::new();
    for (name, id) in candidates {
        if find_bounded(text_norm, &name).is_some() && !found.contains(&id) {
            found.push(id);
        }
    }

    if found.is_empty() {
        return (found, 0.0);
    }
    let conf = (0.70 + 0.05 * found.len() as f64).min(0.90);
    (found, conf)
}

/// Weighted blend of the per-entity confidences, rounded to 3 decimals.
pub fn combine_confidence(
    line_conf: Option<f64>,
    port_conf: Option<f64>,
    ship_conf: Option<f64>,
) -> f64 {
    let mut conf = 0.0;
    if let Some(c) = line_conf {
        conf += 0.55 * c;
    }
    if let Some(c) = port_conf {
        conf += 0.35 * c;
    }
    if let Some(c) = ship_conf {
        conf += 0.10 * c;
    }
    round3(conf)
}

fn extract_with(
    text: &str,
    dict: Option<&AliasDictionary>,
    ships: &[String],
    port_fallback: &[String],
) -> ExtractResult {
    let text_norm = normalize_text(text);
    if text_norm.is_empty() {
        return ExtractResult::default();
    }

    let (line, line_conf) = guess_cruise_line(&text_norm);

    let (port_ids, port_conf) = match dict {
        Some(d) => extract_ports(&text_norm, d),
        None => {
            counter!("annotate_port_fallback_total").increment(1);
            extract_ports_fallback(&text_norm, port_fallback)
        }
    };

    let (ship_ids, ship_conf) = extract_ships(&text_norm, ships);

    let confidence = combine_confidence(
        line.map(|_| line_conf),
        (!port_ids.is_empty()).then_some(port_conf),
        (!ship_ids.is_empty()).then_some(ship_conf),
    );

    ExtractResult {
        cruise_line: line.map(str::to_string),
        ship_ids,
        port_ids,
        confidence,
    }
}

fn load_or_fallback(path: &Path) -> Option<AliasDictionary> {
    match AliasDictionary::load(path) {
        Ok(d) => Some(d),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(target: "ner", path = %path.display(), "alias source missing; using port fallback list");
            None
        }
        Err(e) => {
            warn!(target: "ner", error = %e, path = %path.display(), "alias source unreadable; using port fallback list");
            None
        }
    }
}

/// One-shot extraction: loads the alias source on every call (`None` -> `config/ports.txt`).
/// A missing alias source falls back to exact matches over `port_fallback`.
pub fn extract(
    text: &str,
    ships: &[String],
    port_fallback: &[String],
    alias_source: Option<&Path>,
) -> ExtractResult {
    let path = alias_source.unwrap_or_else(|| Path::new(DEFAULT_ALIAS_SOURCE_PATH));
    let dict = load_or_fallback(path);
    extract_with(text, dict.as_ref(), ships, port_fallback)
}

/* ----------------------------
Reusable extractor
---------------------------- */

#[derive(Debug)]
enum Aliases {
    Fixed(Option<Arc<AliasDictionary>>),
    Hot(HotReloadAliases),
}

/// Extractor that keeps the alias dictionary (or its absence) between calls.
#[derive(Debug)]
pub struct EntityExtractor {
    aliases: Aliases,
    ships: Vec<String>,
    port_fallback: Vec<String>,
}

impl EntityExtractor {
    /// No dictionary: ports always use the fallback list.
    pub fn new(ships: Vec<String>, port_fallback: Vec<String>) -> Self {
        Self {
            aliases: Aliases::Fixed(None),
            ships,
            port_fallback,
        }
    }

    pub fn with_dictionary(mut self, dict: AliasDictionary) -> Self {
        self.aliases = Aliases::Fixed(Some(Arc::new(dict)));
        self
    }

    /// Load the alias source once; a missing file leaves the extractor in fallback mode.
    pub fn from_alias_source(path: &Path, ships: Vec<String>, port_fallback: Vec<String>) -> Self {
        let dict = load_or_fallback(path).map(Arc::new);
        Self {
            aliases: Aliases::Fixed(dict),
            ships,
            port_fallback,
        }
    }

    /// Re-read the alias source whenever its mtime changes.
    pub fn hot_reload(path: &Path, ships: Vec<String>, port_fallback: Vec<String>) -> Self {
        Self {
            aliases: Aliases::Hot(HotReloadAliases::new(Some(path))),
            ships,
            port_fallback,
        }
    }

    pub fn dictionary(&self) -> Option<Arc<AliasDictionary>> {
        match &self.aliases {
            Aliases::Fixed(d) => d.clone(),
            Aliases::Hot(h) => h.current(),
        }
    }

    pub fn extract(&self, text: &str) -> ExtractResult {
        let dict = self.dictionary();
        extract_with(text, dict.as_deref(), &self.ships, &self.port_fallback)
    }
}
