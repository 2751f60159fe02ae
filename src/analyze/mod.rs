// src/analyze/mod.rs
//! Annotation pipeline entry: sentiment, entity extraction and themes for one text.
//!
//! Extraction and themes consume normalized text; sentiment reads the raw text.

pub mod ner;
pub mod ports;
pub mod themes;

use serde::Serialize;

use crate::config::Settings;
use crate::sentiment::{LexiconAnalyzer, PolarityAnalyzer, SentimentResult, SentimentScorer};

// Re-export convenient types.
pub use crate::analyze::ner::{extract, EntityExtractor, ExtractResult};
pub use crate::analyze::ports::{AliasDictionary, HotReloadAliases};
pub use crate::analyze::themes::{classify, ThemeHit, ThemeLabel};

/// Round to 3 decimals (confidence and theme scores).
///
/// Rounds the exact binary value, so `0.6675` stored as `0.66749999..` gives `0.667`.
pub(crate) fn round3(x: f64) -> f64 {
    format!("{x:.3}").parse().unwrap_or(x)
}

/// Everything the pipeline knows about one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub sentiment: SentimentResult,
    pub extraction: ExtractResult,
    pub themes: Vec<ThemeHit>,
}

/// Scorer + extractor + theme limit, built once and shared by workers.
#[derive(Debug)]
pub struct Pipeline<A = LexiconAnalyzer> {
    scorer: SentimentScorer<A>,
    extractor: EntityExtractor,
    max_themes: usize,
}

impl Pipeline<LexiconAnalyzer> {
    /// Build from resolved settings (alias source, ship/port lists, theme limit).
    pub fn from_settings(settings: &Settings) -> Self {
        let extractor = if settings.alias_hot_reload {
            EntityExtractor::hot_reload(
                &settings.alias_source_path,
                settings.ships.clone(),
                settings.ports_fallback.clone(),
            )
        } else {
            EntityExtractor::from_alias_source(
                &settings.alias_source_path,
                settings.ships.clone(),
                settings.ports_fallback.clone(),
            )
        };
        Self::new(SentimentScorer::new(), extractor, settings.max_themes)
    }
}

impl<A: PolarityAnalyzer> Pipeline<A> {
    pub fn new(scorer: SentimentScorer<A>, extractor: EntityExtractor, max_themes: usize) -> Self {
        Self {
            scorer,
            extractor,
            max_themes,
        }
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    pub fn max_themes(&self) -> usize {
        self.max_themes
    }

    pub fn annotate(&self, text: &str) -> Annotation {
        Annotation {
            sentiment: self.scorer.score(text),
            extraction: self.extractor.extract(text),
            themes: classify(text, self.max_themes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;

    fn pipeline() -> Pipeline {
        let dict = AliasDictionary::parse("Cozumel\nCosta Maya\n");
        let extractor = EntityExtractor::new(vec![], vec![]).with_dictionary(dict);
        Pipeline::new(SentimentScorer::new(), extractor, 3)
    }

    #[test]
    fn round3_behaves() {
        assert_eq!(round3(0.12345), 0.123);
        assert_eq!(round3(0.9999), 1.0);
        assert_eq!(round3(0.0), 0.0);
    }

    #[test]
    fn round3_uses_exact_binary_value() {
        // 0.55 * 0.8 + 0.35 * 0.65 is just below 0.6675
        assert_eq!(round3(0.55 * 0.8 + 0.35 * 0.65), 0.667);
        assert_eq!(round3(1.0005), 1.0);
        assert_eq!(round3(-0.0004), 0.0);
    }

    #[test]
    fn empty_text_is_zero_information() {
        let a = pipeline().annotate("");
        assert_eq!(a.sentiment.label, SentimentLabel::Neu);
        assert_eq!(a.sentiment.score, 0.0);
        assert_eq!(a.sentiment.severity, 0.0);
        assert_eq!(a.extraction, ExtractResult::default());
        assert!(a.themes.is_empty());
    }

    #[test]
    fn annotation_serializes_vocabulary() {
        let a = pipeline().annotate("Costa Maya buffet was terrible");
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["sentiment"]["label"], "neg");
        assert_eq!(v["extraction"]["port_ids"][0], "costa-maya");
        assert_eq!(v["themes"][0]["label"], "food_dining");
    }
}
