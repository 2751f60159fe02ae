//! Rule-based theme classifier over a fixed 12-label taxonomy.
//!
//! Each theme owns a keyword bag; a theme's hit count is the number of distinct
//! keywords present (substring of the normalized text). Score saturates at 4 hits.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::round3;
use crate::normalize::normalize_text;

pub const THEME_MODEL_VERSION: &str = "themes_v1_rules_2025-12-28";
pub const DEFAULT_MAX_THEMES: usize = 3;

const SATURATION_HITS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeLabel {
    PricingFeesRefunds,
    EmbarkationLines,
    ItineraryChanges,
    Excursions,
    ServiceStaff,
    FoodDining,
    Cleanliness,
    CabinRoom,
    CrowdsNoise,
    WifiTech,
    HealthIllness,
    SafetySecurity,
}

impl ThemeLabel {
    pub const ALL: [ThemeLabel; 12] = [
        ThemeLabel::PricingFeesRefunds,
        ThemeLabel::EmbarkationLines,
        ThemeLabel::ItineraryChanges,
        ThemeLabel::Excursions,
        ThemeLabel::ServiceStaff,
        ThemeLabel::FoodDining,
        ThemeLabel::Cleanliness,
        ThemeLabel::CabinRoom,
        ThemeLabel::CrowdsNoise,
        ThemeLabel::WifiTech,
        ThemeLabel::HealthIllness,
        ThemeLabel::SafetySecurity,
    ];

    /// Persisted vocabulary; must match `theme_label` values stored downstream.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeLabel::PricingFeesRefunds => "pricing_fees_refunds",
            ThemeLabel::EmbarkationLines => "embarkation_lines",
            ThemeLabel::ItineraryChanges => "itinerary_changes",
            ThemeLabel::Excursions => "excursions",
            ThemeLabel::ServiceStaff => "service_staff",
            ThemeLabel::FoodDining => "food_dining",
            ThemeLabel::Cleanliness => "cleanliness",
            ThemeLabel::CabinRoom => "cabin_room",
            ThemeLabel::CrowdsNoise => "crowds_noise",
            ThemeLabel::WifiTech => "wifi_tech",
            ThemeLabel::HealthIllness => "health_illness",
            ThemeLabel::SafetySecurity => "safety_security",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Raw keyword bag (un-normalized, as authored).
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ThemeLabel::PricingFeesRefunds => &[
                "refund", "refunded", "charge", "charged", "overcharged", "billing", "bill",
                "fee", "fees", "gratuity", "gratuities", "service charge", "port fee", "taxes",
                "credit", "onboard credit", "cancellation", "cancelled", "canceled",
                "travel insurance", "insurance denied", "dispute", "claim", "compensation",
                "voucher",
            ],
            ThemeLabel::EmbarkationLines => &[
                "embark", "embarkation", "disembark", "disembarkation", "terminal",
                "port terminal", "check in", "checkin", "security line", "tsa", "customs",
                "immigration", "passport control", "long line", "lines were insane",
                "took hours", "waiting for hours", "boarding", "boarded late", "missed boarding",
                "late boarding", "shuttle", "transfer", "traffic", "parking", "baggage drop",
                "lost luggage", "luggage", "bag tag",
            ],
            ThemeLabel::ItineraryChanges => &[
                "itinerary", "itinerary change", "changed itinerary", "cancelled port",
                "canceled port", "missed port", "skipped port", "port cancelled",
                "port canceled", "sea day", "extra sea day", "rerouted", "route changed",
                "weather changed", "could not dock", "tender cancelled", "tender canceled",
            ],
            ThemeLabel::Excursions => &[
                "excursion", "shore excursion", "shorex", "shore x", "tour", "tours",
                "third party", "shoreexcursionsgroup", "viator", "getyourguide", "snorkel",
                "snorkeling", "zip line", "zipline", "ruins", "atv", "beach day", "resort pass",
            ],
            ThemeLabel::ServiceStaff => &[
                "customer service", "guest services", "front desk", "desk", "rude",
                "unhelpful", "dismissive", "manager", "supervisor", "steward",
                "stateroom attendant", "room attendant", "waiter", "waitress", "server",
                "bartender", "service was", "treated", "ignored", "won't help",
                "would not help",
            ],
            ThemeLabel::FoodDining => &[
                "food", "dining", "buffet", "main dining", "mdr", "specialty dining",
                "restaurant", "steakhouse", "sushi", "pizza", "dessert", "cold food",
                "warm food", "undercooked", "overcooked", "food poisoning",
                "got sick from food", "quality of food",
            ],
            ThemeLabel::Cleanliness => &[
                "dirty", "filthy", "gross", "smell", "smelled", "mold", "mould", "cockroach",
                "bugs", "bed bugs", "stains", "sticky", "not clean", "unclean",
                "bathroom was dirty",
            ],
            ThemeLabel::CabinRoom => &[
                "cabin", "stateroom", "room", "suite", "small room", "tiny room",
                "air conditioning", "ac broken", "a c broken", "no ac", "hot room",
                "noise in cabin", "loud cabin", "engine noise", "balcony", "bathroom",
                "shower", "toilet", "bed", "pillow", "mattress",
            ],
            ThemeLabel::CrowdsNoise => &[
                "crowded", "crowds", "too many people", "overcrowded", "packed",
                "line everywhere", "long waits", "loud", "noise", "noisy", "screaming kids",
                "kids running", "chair hog", "pool deck packed",
            ],
            ThemeLabel::WifiTech => &[
                "wifi", "wi fi", "internet", "connection", "slow internet", "starlink",
                "app crashed", "app", "website", "online check in", "chat package",
                "streaming", "vpn",
            ],
            ThemeLabel::HealthIllness => &[
                "norovirus", "noro", "covid", "flu", "sickness", "illness", "vomit",
                "vomiting", "diarrhea", "diarrhoea", "quarantine", "medical", "medical center",
                "seasick", "seasickness",
            ],
            ThemeLabel::SafetySecurity => &[
                "unsafe", "safety", "security", "assault", "rape", "harassed", "harrassed",
                "stolen", "theft", "robbed", "fight", "fighting", "police", "injury", "injured",
            ],
        }
    }
}

impl fmt::Display for ThemeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThemeHit {
    pub label: ThemeLabel,
    pub score: f64,
    pub hits: usize,
}

// Keyword bags normalized once; duplicates after normalization collapse to one entry.
static NORMALIZED_KEYWORDS: Lazy<Vec<(ThemeLabel, Vec<String>)>> = Lazy::new(|| {
    ThemeLabel::ALL
        .iter()
        .map(|t| {
            let mut kws: Vec<String> = Vec::new();
            for k in t.keywords() {
                let n = normalize_text(k);
                if !n.is_empty() && !kws.contains(&n) {
                    kws.push(n);
                }
            }
            (*t, kws)
        })
        .collect()
});

/// Top `max_themes` themes by distinct keyword hits (ties keep taxonomy order).
pub fn classify(text: &str, max_themes: usize) -> Vec<ThemeHit> {
    let t = normalize_text(text);
    if t.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<ThemeHit> = NORMALIZED_KEYWORDS
        .iter()
        .filter_map(|(label, kws)| {
            let count = kws.iter().filter(|k| t.contains(k.as_str())).count();
            (count > 0).then(|| ThemeHit {
                label: *label,
                score: round3((count as f64 / SATURATION_HITS).min(1.0)),
                hits: count,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.hits
            .cmp(&a.hits)
            .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
    });
    hits.truncate(max_themes);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_vocabulary() {
        for t in ThemeLabel::ALL {
            assert_eq!(ThemeLabel::parse(t.as_str()), Some(t));
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        assert_eq!(ThemeLabel::parse("nope"), None);
    }

    #[test]
    fn empty_text_has_no_themes() {
        assert!(classify("", 3).is_empty());
        assert!(classify("?!.", 3).is_empty());
    }

    #[test]
    fn five_keywords_saturate_single_theme() {
        let hits = classify("filthy, dirty, gross; mold and stains everywhere", 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, ThemeLabel::Cleanliness);
        assert_eq!(hits[0].hits, 5);
        assert_eq!(hits[0].score, 1.0);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let hits = classify("wifi wifi wifi", 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, ThemeLabel::WifiTech);
        assert_eq!(hits[0].hits, 1);
        assert_eq!(hits[0].score, 0.25);
    }

    #[test]
    fn ranking_and_truncation() {
        // pricing: refund, refunded, voucher (3); food: buffet, sushi (2); wifi: wifi (1)
        let text = "They refunded half, promised a refund voucher. Buffet sushi ok. wifi";
        let all = classify(text, 12);
        let labels: Vec<ThemeLabel> = all.iter().map(|h| h.label).collect();
        assert_eq!(
            labels,
            vec![ThemeLabel::PricingFeesRefunds, ThemeLabel::FoodDining, ThemeLabel::WifiTech]
        );
        assert_eq!(all[0].hits, 3);
        assert_eq!(all[0].score, 0.75);

        let top1 = classify(text, 1);
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].label, ThemeLabel::PricingFeesRefunds);
        assert!(classify(text, 0).is_empty());
    }
}
