//! Sentiment scoring: lexicon polarity -> 3-way label + complaint severity.
//!
//! `LexiconAnalyzer` is a VADER-style rule/lexicon analyzer producing a compound
//! score in [-1, 1]. `SentimentScorer` wraps any [`PolarityAnalyzer`] and applies the
//! fixed label thresholds (±0.05) and the severity heuristic. Build one scorer and share
//! it; there is no process-global analyzer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const EMBEDDED_LEXICON: &str = include_str!("../sentiment_lexicon.json");

pub const SENTIMENT_MODEL_VERSION: &str = "vader_v1";

const POS_THRESHOLD: f64 = 0.05;
const NEG_THRESHOLD: f64 = -0.05;

/// Complaint-indicative phrases counted (as substrings of lowercased raw text) for severity.
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "refund",
    "sick",
    "food poisoning",
    "cancel",
    "canceled",
    "delayed",
    "delay",
    "missed",
    "overbooked",
    "dirty",
    "mold",
    "bedbugs",
    "theft",
    "stolen",
    "charged",
    "complaint",
    "awful",
    "terrible",
    "worst",
    "never again",
];

// VADER constants
const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
const C_INCR: f64 = 0.733;
const N_SCALAR: f64 = -0.74;
const ALPHA: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Pos,
    Neg,
    Neu,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Pos => "pos",
            SentimentLabel::Neg => "neg",
            SentimentLabel::Neu => "neu",
        }
    }

    /// Fixed thresholds: >= 0.05 pos, <= -0.05 neg, otherwise neu.
    pub fn from_compound(compound: f64) -> Self {
        if compound >= POS_THRESHOLD {
            SentimentLabel::Pos
        } else if compound <= NEG_THRESHOLD {
            SentimentLabel::Neg
        } else {
            SentimentLabel::Neu
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f64,
    pub severity: f64,
}

impl SentimentResult {
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neu,
            score: 0.0,
            severity: 0.0,
        }
    }
}

/// Anything that maps text to a compound polarity in [-1, 1].
pub trait PolarityAnalyzer: Send + Sync {
    fn compound(&self, text: &str) -> f64;
}

/* ----------------------------
Lexicon analyzer
---------------------------- */

#[derive(Debug, Clone)]
pub struct LexiconAnalyzer {
    lexicon: HashMap<String, f64>,
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconAnalyzer {
    /// Analyzer over the embedded lexicon.
    pub fn new() -> Self {
        Self::from_json(EMBEDDED_LEXICON).expect("valid embedded sentiment lexicon")
    }

    /// Analyzer over a custom `{ "word": valence }` JSON lexicon.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: HashMap<String, f64> = serde_json::from_str(raw)?;
        let lexicon = parsed
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Ok(Self { lexicon })
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    #[inline]
    fn valence(&self, w: &str) -> Option<f64> {
        self.lexicon.get(w).copied()
    }

    /// Sum of per-token valences after boosters, caps emphasis, negation and "but" shifts.
    fn sentiment_sum(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let cap_diff = allcap_differential(&tokens);

        let mut sentiments: Vec<f64> = Vec::with_capacity(tokens.len());
        for (i, word) in lowered.iter().enumerate() {
            if booster_scalar(word).is_some() {
                sentiments.push(0.0);
                continue;
            }
            let Some(mut v) = self.valence(word) else {
                sentiments.push(0.0);
                continue;
            };

            if cap_diff && is_all_caps(&tokens[i]) {
                v += C_INCR * v.signum();
            }

            let mut negated = false;
            for k in 1..=3usize {
                if i < k {
                    break;
                }
                let prev = lowered[i - k].as_str();
                // boosters farther away count less
                if let Some(mut scalar) = booster_scalar(prev) {
                    if v < 0.0 {
                        scalar = -scalar;
                    }
                    if cap_diff && is_all_caps(&tokens[i - k]) {
                        scalar += C_INCR * v.signum();
                    }
                    scalar *= match k {
                        1 => 1.0,
                        2 => 0.95,
                        _ => 0.9,
                    };
                    v += scalar;
                }
                if is_negator(prev) {
                    negated = true;
                }
            }
            if negated {
                v *= N_SCALAR;
            }

            sentiments.push(v);
        }

        // "but" shifts weight toward the clause that follows it
        if let Some(bi) = lowered.iter().position(|w| w == "but") {
            for (i, s) in sentiments.iter_mut().enumerate() {
                if i < bi {
                    *s *= 0.5;
                } else if i > bi {
                    *s *= 1.5;
                }
            }
        }

        let mut sum: f64 = sentiments.iter().sum();
        if sum != 0.0 {
            let amp = punctuation_emphasis(text);
            sum += amp * sum.signum();
        }
        sum
    }
}

impl PolarityAnalyzer for LexiconAnalyzer {
    fn compound(&self, text: &str) -> f64 {
        let sum = self.sentiment_sum(text);
        if sum == 0.0 {
            return 0.0;
        }
        let c = (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0);
        (c * 10_000.0).round() / 10_000.0
    }
}

/// Whitespace tokens with surrounding punctuation trimmed; inner apostrophes kept ("isn't").
fn tokenize(s: &str) -> Vec<String> {
    s.split_whitespace()
        .map(|t| {
            t.replace('\u{2019}', "'")
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_all_caps(tok: &str) -> bool {
    tok.chars().any(char::is_alphabetic) && !tok.chars().any(char::is_lowercase)
}

/// True when some, but not all, tokens are shouted.
fn allcap_differential(tokens: &[String]) -> bool {
    let caps = tokens.iter().filter(|t| is_all_caps(t)).count();
    caps > 0 && caps < tokens.len()
}

fn punctuation_emphasis(text: &str) -> f64 {
    let ep = text.matches('!').count().min(4) as f64 * 0.292;
    let qm = text.matches('?').count();
    let qm_amp = if qm > 1 {
        if qm <= 3 {
            qm as f64 * 0.18
        } else {
            0.96
        }
    } else {
        0.0
    };
    ep + qm_amp
}

fn booster_scalar(w: &str) -> Option<f64> {
    match w {
        "absolutely" | "amazingly" | "completely" | "considerably" | "deeply" | "enormously"
        | "entirely" | "especially" | "exceptionally" | "extremely" | "fully" | "greatly"
        | "highly" | "hugely" | "incredibly" | "insanely" | "intensely" | "majorly" | "more"
        | "most" | "particularly" | "purely" | "quite" | "really" | "remarkably" | "so"
        | "super" | "thoroughly" | "totally" | "tremendously" | "truly" | "unbelievably"
        | "utterly" | "very" => Some(B_INCR),
        "almost" | "barely" | "hardly" | "kinda" | "kindof" | "less" | "little" | "marginally"
        | "occasionally" | "partly" | "scarcely" | "slightly" | "somewhat" | "sorta" => {
            Some(B_DECR)
        }
        _ => None,
    }
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "nor"
            | "neither"
            | "nothing"
            | "nowhere"
            | "none"
            | "without"
            | "cannot"
            | "isn't"
            | "isnt"
            | "wasn't"
            | "wasnt"
            | "aren't"
            | "arent"
            | "weren't"
            | "won't"
            | "wont"
            | "can't"
            | "cant"
            | "don't"
            | "dont"
            | "doesn't"
            | "doesnt"
            | "didn't"
            | "didnt"
            | "couldn't"
            | "shouldn't"
            | "wouldn't"
            | "haven't"
            | "hasn't"
            | "hadn't"
            | "ain't"
    )
}

/* ----------------------------
Scorer
---------------------------- */

#[derive(Debug, Clone)]
pub struct SentimentScorer<A = LexiconAnalyzer> {
    analyzer: A,
}

impl SentimentScorer<LexiconAnalyzer> {
    pub fn new() -> Self {
        Self {
            analyzer: LexiconAnalyzer::new(),
        }
    }
}

impl Default for SentimentScorer<LexiconAnalyzer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PolarityAnalyzer> SentimentScorer<A> {
    pub fn with_analyzer(analyzer: A) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Label, compound score and severity for raw (un-normalized) text.
    pub fn score(&self, text: &str) -> SentimentResult {
        let text = text.trim();
        if text.is_empty() {
            return SentimentResult::neutral();
        }

        let compound = self.analyzer.compound(text);
        let label = SentimentLabel::from_compound(compound);

        let severity = if label == SentimentLabel::Neg {
            let hits = negative_keyword_hits(text);
            (0.8 * compound.abs() + 0.05 * hits as f64).min(1.0)
        } else {
            0.0
        };

        SentimentResult {
            label,
            score: compound,
            severity,
        }
    }
}

/// Number of distinct complaint phrases present in the lowercased text.
pub fn negative_keyword_hits(text: &str) -> usize {
    let lowered = text.to_lowercase();
    NEGATIVE_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    impl PolarityAnalyzer for Fixed {
        fn compound(&self, _text: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn embedded_lexicon_loads() {
        let a = LexiconAnalyzer::new();
        assert!(!a.is_empty());
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(SentimentLabel::from_compound(0.05), SentimentLabel::Pos);
        assert_eq!(SentimentLabel::from_compound(-0.05), SentimentLabel::Neg);
        assert_eq!(SentimentLabel::from_compound(0.0499), SentimentLabel::Neu);
        assert_eq!(SentimentLabel::from_compound(-0.0499), SentimentLabel::Neu);
    }

    #[test]
    fn empty_is_neutral() {
        let s = SentimentScorer::new();
        assert_eq!(s.score(""), SentimentResult::neutral());
        assert_eq!(s.score("   \n\t"), SentimentResult::neutral());
    }

    #[test]
    fn severity_only_for_negative() {
        let pos = SentimentScorer::with_analyzer(Fixed(0.9));
        let r = pos.score("refund refund, worst, never again");
        assert_eq!(r.label, SentimentLabel::Pos);
        assert_eq!(r.severity, 0.0);

        let neu = SentimentScorer::with_analyzer(Fixed(0.0));
        assert_eq!(neu.score("food poisoning").severity, 0.0);
    }

    #[test]
    fn severity_formula_and_cap() {
        let neg = SentimentScorer::with_analyzer(Fixed(-0.5));
        // "delayed" also contains "delay"; "refund" counted once
        let r = neg.score("Refund please, we were DELAYED. Refund!");
        assert_eq!(r.label, SentimentLabel::Neg);
        assert!((r.severity - (0.4 + 0.05 * 3.0)).abs() < 1e-9);

        let very = SentimentScorer::with_analyzer(Fixed(-1.0));
        let r = very.score("worst awful terrible refund");
        assert_eq!(r.severity, 1.0);
    }

    #[test]
    fn lexicon_polarity_direction() {
        let a = LexiconAnalyzer::new();
        assert!(a.compound("The cruise was great and the crew was friendly") > 0.05);
        assert!(a.compound("Terrible food and a dirty cabin") < -0.05);
        assert_eq!(a.compound("We sailed on Tuesday"), 0.0);
    }

    #[test]
    fn negation_flips_and_boosters_amplify() {
        let a = LexiconAnalyzer::new();
        assert!(a.compound("not good") < 0.0);
        assert!(a.compound("very good") > a.compound("good"));
        assert!(a.compound("good!!!") > a.compound("good"));
    }

    #[test]
    fn but_weights_second_clause() {
        let a = LexiconAnalyzer::new();
        assert!(a.compound("The food was good but the service was terrible") < 0.0);
    }

    #[test]
    fn compound_is_bounded() {
        let a = LexiconAnalyzer::new();
        let c = a.compound(&"AMAZING wonderful best love ".repeat(50));
        assert!(c <= 1.0 && c > 0.9);
    }
}
