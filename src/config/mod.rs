// src/config/mod.rs
//! Runtime settings resolved from environment variables with file + built-in fallbacks.

pub mod extract;

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::info;

use crate::analyze::ports::DEFAULT_ALIAS_SOURCE_PATH;
use crate::analyze::themes::DEFAULT_MAX_THEMES;
use extract::{load_extract_lists_from, ExtractLists};

// --- env names & defaults ---
pub const ENV_ALIAS_SOURCE_PATH: &str = "ALIAS_SOURCE_PATH";
pub const ENV_EXTRACT_CONFIG_PATH: &str = "EXTRACT_CONFIG_PATH";
pub const ENV_MAX_THEMES: &str = "MAX_THEMES";
pub const ENV_ALIAS_HOT_RELOAD: &str = "ALIAS_HOT_RELOAD";

pub const DEFAULT_EXTRACT_CONFIG_PATH: &str = "config/extract.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub alias_source_path: PathBuf,
    pub alias_hot_reload: bool,
    pub max_themes: usize,
    pub ships: Vec<String>,
    pub ports_fallback: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let lists = ExtractLists::default();
        Self {
            alias_source_path: PathBuf::from(DEFAULT_ALIAS_SOURCE_PATH),
            alias_hot_reload: false,
            max_themes: DEFAULT_MAX_THEMES,
            ships: lists.ships,
            ports_fallback: lists.ports_fallback,
        }
    }
}

// parse optional usize env and clamp to 1..=12 (taxonomy size)
fn parse_max_themes(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .map(|v| v.clamp(1, 12))
}

impl Settings {
    /// Resolve settings:
    /// 1) `$EXTRACT_CONFIG_PATH` (must exist when set)
    /// 2) `config/extract.toml` if present
    /// 3) built-in ship / port lists
    pub fn from_env() -> Result<Self> {
        let mut s = Settings::default();

        if let Ok(p) = std::env::var(ENV_ALIAS_SOURCE_PATH) {
            s.alias_source_path = PathBuf::from(p);
        }
        s.alias_hot_reload = std::env::var(ENV_ALIAS_HOT_RELOAD).ok().as_deref() == Some("1");
        if let Some(n) = parse_max_themes(std::env::var(ENV_MAX_THEMES).ok()) {
            s.max_themes = n;
        }

        let lists = match std::env::var(ENV_EXTRACT_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("EXTRACT_CONFIG_PATH points to non-existent path"));
                }
                Some(load_extract_lists_from(&pb)?)
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_EXTRACT_CONFIG_PATH);
                if pb.exists() {
                    Some(load_extract_lists_from(&pb)?)
                } else {
                    None
                }
            }
        };
        if let Some(l) = lists {
            s.ships = l.ships;
            s.ports_fallback = l.ports_fallback;
        }

        info!(
            target: "config",
            alias_source = %s.alias_source_path.display(),
            hot_reload = s.alias_hot_reload,
            max_themes = s.max_themes,
            ships = s.ships.len(),
            ports_fallback = s.ports_fallback.len(),
            "settings resolved"
        );
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    fn clear_env() {
        for k in [
            ENV_ALIAS_SOURCE_PATH,
            ENV_EXTRACT_CONFIG_PATH,
            ENV_MAX_THEMES,
            ENV_ALIAS_HOT_RELOAD,
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn max_themes_parsing_clamps() {
        assert_eq!(parse_max_themes(Some("5".into())), Some(5));
        assert_eq!(parse_max_themes(Some("0".into())), Some(1));
        assert_eq!(parse_max_themes(Some("99".into())), Some(12));
        assert_eq!(parse_max_themes(Some("x".into())), None);
        assert_eq!(parse_max_themes(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn env_then_file_then_defaults() {
        // Isolate CWD so the repo's own config/ is not picked up
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        clear_env();

        // 1) Nothing -> built-ins
        let s = Settings::from_env().unwrap();
        assert_eq!(s, Settings::default());

        // 2) ./config/extract.toml
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join("config/extract.toml"),
            r#"ships = ["Utopia of the Seas"]
ports_fallback = ["Labadee"]"#,
        )
        .unwrap();
        let s = Settings::from_env().unwrap();
        assert_eq!(s.ships, vec!["Utopia of the Seas".to_string()]);

        // 3) Env wins
        let p = tmp.path().join("lists.json");
        fs::write(&p, r#"{"ships":["X"],"ports_fallback":["Y"]}"#).unwrap();
        env::set_var(ENV_EXTRACT_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_MAX_THEMES, "2");
        env::set_var(ENV_ALIAS_HOT_RELOAD, "1");
        let s = Settings::from_env().unwrap();
        assert_eq!(s.ships, vec!["X".to_string()]);
        assert_eq!(s.ports_fallback, vec!["Y".to_string()]);
        assert_eq!(s.max_themes, 2);
        assert!(s.alias_hot_reload);

        // 4) Env pointing nowhere is an error
        env::set_var(ENV_EXTRACT_CONFIG_PATH, "does/not/exist.toml");
        assert!(Settings::from_env().is_err());

        clear_env();
        env::set_current_dir(&old).unwrap();
    }
}
