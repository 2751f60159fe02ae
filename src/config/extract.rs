// src/config/extract.rs
//! Ship names and the cold-start port list used by entity extraction.
//!
//! Accepted formats (same keys in both):
//! ```toml
//! ships = ["Icon of the Seas"]
//! ports_fallback = ["Cozumel", "Nassau"]
//! ```
//! ```json
//! { "ships": ["Icon of the Seas"], "ports_fallback": ["Cozumel"] }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractLists {
    #[serde(default)]
    pub ships: Vec<String>,
    #[serde(default)]
    pub ports_fallback: Vec<String>,
}

impl Default for ExtractLists {
    fn default() -> Self {
        Self {
            ships: [
                "Wonder of the Seas",
                "Icon of the Seas",
                "Oasis of the Seas",
                "Symphony of the Seas",
                "Harmony of the Seas",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ports_fallback: [
                "Cozumel",
                "Costa Maya",
                "Belize City",
                "Roatan",
                "Nassau",
                "Labadee",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Load lists from an explicit path. Supports TOML or JSON.
pub fn load_extract_lists_from(path: &Path) -> Result<ExtractLists> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading extract lists from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_extract_lists(&content, ext.as_str())
}

fn parse_extract_lists(s: &str, hint_ext: &str) -> Result<ExtractLists> {
    if hint_ext != "json" {
        if let Ok(v) = toml::from_str::<ExtractLists>(s) {
            return Ok(clean(v));
        }
    }
    if let Ok(v) = serde_json::from_str::<ExtractLists>(s) {
        return Ok(clean(v));
    }
    if hint_ext == "json" {
        if let Ok(v) = toml::from_str::<ExtractLists>(s) {
            return Ok(clean(v));
        }
    }
    Err(anyhow!("unsupported extract list format"))
}

/// Trim entries, drop blanks, keep first occurrence order.
fn clean(v: ExtractLists) -> ExtractLists {
    fn clean_list(items: Vec<String>) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(items.len());
        for it in items {
            let t = it.trim();
            if !t.is_empty() && !out.iter().any(|o| o == t) {
                out.push(t.to_string());
            }
        }
        out
    }
    ExtractLists {
        ships: clean_list(v.ships),
        ports_fallback: clean_list(v.ports_fallback),
    }
}
