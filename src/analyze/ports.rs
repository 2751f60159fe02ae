//! Port alias dictionary loaded from a line-oriented text source (`config/ports.txt`).
//!
//! Format:
//! ```text
//! # comment
//! Cozumel
//! Costa Maya | Mahahual, Majahual
//! ```
//! Each canonical name gets a slug id (`costa-maya`); every alias plus the canonical
//! name itself is normalized and indexed. Aliases are then ordered longest first so
//! multi-word mentions are tried before the single words inside them.
//!
//! The file can be hot-reloaded on mtime change via [`HotReloadAliases`].

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    time::SystemTime,
};
use tracing::{debug, warn};

use crate::normalize::{normalize_text, slugify};

pub const DEFAULT_ALIAS_SOURCE_PATH: &str = "config/ports.txt";

#[derive(Debug, Clone, Default)]
pub struct AliasDictionary {
    /// port id -> canonical display name
    canonical: HashMap<String, String>,
    /// normalized alias -> port id
    alias_index: HashMap<String, String>,
    /// (normalized alias, port id), longest alias first
    ordered: Vec<(String, String)>,
    collisions: usize,
}

impl AliasDictionary {
    /// Load from a file. A missing file is reported as `io::ErrorKind::NotFound`.
    /// Lines that are not valid UTF-8 are skipped; the rest of the file still loads.
    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::parse(&valid_lines(&bytes)))
    }

    /// Build from in-memory source text. Lines without usable content are skipped.
    pub fn parse(content: &str) -> Self {
        let mut canonical: HashMap<String, String> = HashMap::new();
        let mut alias_index: HashMap<String, String> = HashMap::new();
        // insertion order of first appearance keeps length ties deterministic
        let mut insertion: Vec<String> = Vec::new();
        let mut collisions = 0usize;

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (canon, aliases): (&str, Vec<&str>) = match line.split_once('|') {
                Some((c, rest)) => (
                    c.trim(),
                    rest.split(',').map(str::trim).filter(|a| !a.is_empty()).collect(),
                ),
                None => (line, Vec::new()),
            };

            let port_id = slugify(canon);
            if port_id.is_empty() {
                debug!(target: "ports", line = raw, "skipping alias line without a usable name");
                continue;
            }
            canonical.insert(port_id.clone(), canon.to_string());

            for alias in aliases.into_iter().chain(std::iter::once(canon)) {
                let norm = normalize_text(alias);
                if norm.is_empty() {
                    continue;
                }
                match alias_index.insert(norm.clone(), port_id.clone()) {
                    None => insertion.push(norm),
                    Some(prev) if prev != port_id => {
                        collisions += 1;
                        warn!(
                            target: "ports",
                            alias = %norm, previous = %prev, current = %port_id,
                            "alias collision; last definition wins"
                        );
                    }
                    Some(_) => {}
                }
            }
        }

        let mut ordered: Vec<(String, String)> = insertion
            .into_iter()
            .map(|a| {
                let id = alias_index[&a].clone();
                (a, id)
            })
            .collect();
        // stable: equal lengths keep insertion order
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            canonical,
            alias_index,
            ordered,
            collisions,
        }
    }

    pub fn canonical_name(&self, port_id: &str) -> Option<&str> {
        self.canonical.get(port_id).map(String::as_str)
    }

    pub fn port_for_alias(&self, normalized_alias: &str) -> Option<&str> {
        self.alias_index.get(normalized_alias).map(String::as_str)
    }

    /// Aliases in match order (longest first).
    pub fn ordered_aliases(&self) -> &[(String, String)] {
        &self.ordered
    }

    pub fn port_count(&self) -> usize {
        self.canonical.len()
    }

    /// Number of aliases that were redefined to point at a different port.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

fn valid_lines(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for (i, line) in bytes.split(|b| *b == b'\n').enumerate() {
        match std::str::from_utf8(line) {
            Ok(l) => {
                out.push_str(l);
                out.push('\n');
            }
            Err(_) => warn!(target: "ports", line = i + 1, "skipping alias line with invalid UTF-8"),
        }
    }
    out
}

/// Hot-reload wrapper: reloads the alias source when its mtime changes.
/// `current()` yields `None` while the file is missing.
#[derive(Debug)]
pub struct HotReloadAliases {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    dict: Option<Arc<AliasDictionary>>,
    last_modified: Option<SystemTime>,
}

impl HotReloadAliases {
    /// Create with a path (defaults to "config/ports.txt" if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ALIAS_SOURCE_PATH));
        Self {
            path,
            inner: RwLock::new(State {
                dict: None,
                last_modified: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest dictionary, reloading if the file changed. Keeps the previous
    /// dictionary if the file disappears or becomes unreadable.
    pub fn current(&self) -> Option<Arc<AliasDictionary>> {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(_) => return self.inner.read().expect("alias lock poisoned").dict.clone(),
        };

        {
            let guard = self.inner.read().expect("alias lock poisoned");
            if guard.last_modified == Some(mtime) {
                return guard.dict.clone();
            }
        }

        let mut guard = self.inner.write().expect("alias lock poisoned");
        // Double-check in case another reader reloaded meanwhile.
        if guard.last_modified != Some(mtime) {
            match AliasDictionary::load(&self.path) {
                Ok(dict) => {
                    debug!(target: "ports", ports = dict.port_count(), "alias source reloaded");
                    guard.dict = Some(Arc::new(dict));
                    guard.last_modified = Some(mtime);
                }
                Err(e) => {
                    warn!(target: "ports", error = %e, path = %self.path.display(), "alias reload failed");
                }
            }
        }
        guard.dict.clone()
    }
}
