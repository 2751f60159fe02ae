// tests/normalize_props.rs
//
// Seeded randomized checks for the normalizer and the confidence bounds.

use rand::{rngs::StdRng, Rng, SeedableRng};

use cruise_sentiment_analyzer::analyze::ner::combine_confidence;
use cruise_sentiment_analyzer::analyze::{AliasDictionary, EntityExtractor};
use cruise_sentiment_analyzer::normalize::normalize_text;

const PIECES: &[&str] = &[
    "Roatán", "COZUMEL", "costa-maya", "  ", "!!!", "\t", "Curaçao", "ß", "ñ", "é", "9", "_",
    "Royal", "caribbean", "VV", "💥", "日本", "\n", "o'clock", "St.", "Perfect Day",
];

fn random_text(rng: &mut StdRng) -> String {
    let n = rng.random_range(0..12);
    (0..n)
        .map(|_| PIECES[rng.random_range(0..PIECES.len())])
        .collect::<Vec<_>>()
        .join(if rng.random_bool(0.5) { " " } else { "" })
}

#[test]
fn normalizer_is_idempotent_and_canonical() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let s = random_text(&mut rng);
        let once = normalize_text(&s);
        assert_eq!(normalize_text(&once), once, "input {s:?}");
        assert!(
            once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '),
            "unexpected chars in {once:?}"
        );
        assert!(!once.starts_with(' ') && !once.ends_with(' ') && !once.contains("  "));
    }
}

#[test]
fn extraction_confidence_stays_in_unit_range() {
    let dict = AliasDictionary::parse("Cozumel\nRoatán | roatan honduras\nPerfect Day at CocoCay | cococay\n");
    let ex = EntityExtractor::new(vec!["Royal".into()], vec![]).with_dictionary(dict);

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..300 {
        let s = random_text(&mut rng);
        let r = ex.extract(&s);
        assert!((0.0..=1.0).contains(&r.confidence), "{s:?} -> {}", r.confidence);
        if r.cruise_line.is_none() && r.port_ids.is_empty() && r.ship_ids.is_empty() {
            assert_eq!(r.confidence, 0.0);
        }
    }

    for _ in 0..300 {
        let pick = |rng: &mut StdRng| rng.random_bool(0.5).then(|| rng.random_range(0.0..=1.0));
        let (a, b, c) = (pick(&mut rng), pick(&mut rng), pick(&mut rng));
        let v = combine_confidence(a, b, c);
        assert!((0.0..=1.0).contains(&v));
    }
}
