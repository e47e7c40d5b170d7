//! Table-driven scoring rules for the candidate reranker.
//!
//! Every adjustment the reranker applies — trust tiers, query-class
//! multipliers, card-type multipliers, domain fallbacks, display names —
//! lives here as a lookup, so the rules stay testable in isolation and the
//! reranker's loop stays free of special cases.

use crate::config::ScoringConfig;
use crate::query::{CardType, QueryClass};
use crate::types::SourceCategory;

/// Apply the trust-priority boost to a base score. High tiers multiply and
/// lift by the priority, low tiers only add it; chunks without a priority
/// fall back to the per-domain table.
pub fn trust_boost(
    cfg: &ScoringConfig,
    base: f32,
    trust_priority: Option<i32>,
    source_id: &str,
) -> f32 {
    match trust_priority {
        Some(p) if p >= cfg.high_trust_threshold => {
            base * cfg.high_trust_multiplier + p as f32
        }
        Some(p) if p >= cfg.mid_trust_threshold => base * cfg.mid_trust_multiplier + p as f32,
        Some(p) => base + p as f32,
        None => base + domain_adjustment(cfg, source_id),
    }
}

pub fn domain_adjustment(cfg: &ScoringConfig, source_id: &str) -> f32 {
    let id = source_id.to_lowercase();
    cfg.domain_adjustments
        .iter()
        .find(|a| id.contains(&a.domain))
        .map(|a| a.adjustment)
        .unwrap_or(0.0)
}

/// Query-class multiplier for a source category. Lookups want dictionaries,
/// not magazine articles; educational queries want the inverse.
pub fn query_class_weight(
    cfg: &ScoringConfig,
    class: QueryClass,
    category: SourceCategory,
) -> f32 {
    match class {
        QueryClass::Lookup => match category {
            SourceCategory::Dictionary => cfg.lookup_dictionary_boost,
            SourceCategory::Encyclopedia | SourceCategory::Blog => cfg.lookup_narrative_discount,
            SourceCategory::Archive => cfg.lookup_archive_discount,
            SourceCategory::Lesson | SourceCategory::Story | SourceCategory::Other => 1.0,
        },
        QueryClass::Educational => match category {
            SourceCategory::Lesson | SourceCategory::Story => cfg.educational_source_boost,
            SourceCategory::Dictionary => cfg.educational_dictionary_discount,
            _ => 1.0,
        },
    }
}

/// Card-type multiplier table. Each card type boosts the source kinds that
/// make good cards of that type and penalizes the rest.
pub fn card_type_weight(cfg: &ScoringConfig, card: CardType, category: SourceCategory) -> f32 {
    use CardType::*;
    use SourceCategory::*;
    match (card, category) {
        (Vocabulary, Dictionary) => cfg.card_favored_boost,
        (Vocabulary, Lesson) => 1.0,
        (Vocabulary, Encyclopedia | Blog) => cfg.card_strong_penalty,
        (Vocabulary, _) => cfg.card_soft_penalty,

        (Phrase, Lesson | Story) => cfg.card_favored_boost,
        (Phrase, Dictionary) => cfg.card_soft_penalty,
        (Phrase, _) => cfg.card_strong_penalty,

        (Numbers, Lesson) => cfg.card_favored_boost,
        (Numbers, Dictionary) => cfg.card_soft_penalty,
        (Numbers, _) => cfg.card_strong_penalty,

        (Cultural, Encyclopedia | Blog) => cfg.card_favored_boost,
        (Cultural, Story) => 1.0,
        (Cultural, Dictionary) => cfg.card_strong_penalty,
        (Cultural, _) => cfg.card_soft_penalty,
    }
}

/// Friendly display names for citation labels, keyed on source id
/// substrings. Unknown sources fall back to their category label.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("learningchamorro", "Learning Chamorro"),
    ("guampedia", "Guampedia"),
    ("chamoru.info", "Chamoru.info"),
    ("topping", "Chamorro-English Dictionary (Topping & Dungca)"),
    ("vonpreissig", "Von Preissig Dictionary (1918)"),
    ("safford", "Safford Grammar (1909)"),
];

pub fn display_name(source_id: &str, category: SourceCategory) -> String {
    let id = source_id.to_lowercase();
    DISPLAY_NAMES
        .iter()
        .find(|(key, _)| id.contains(key))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("{} ({})", category.label(), source_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn test_trust_tiers() {
        let c = cfg();
        assert_eq!(trust_boost(&c, 10.0, Some(95), "x"), 10.0 * 3.0 + 95.0);
        assert_eq!(trust_boost(&c, 10.0, Some(60), "x"), 10.0 * 2.0 + 60.0);
        assert_eq!(trust_boost(&c, 10.0, Some(20), "x"), 30.0);
    }

    #[test]
    fn test_domain_fallback_when_no_priority() {
        let c = cfg();
        assert_eq!(
            trust_boost(&c, 10.0, None, "https://learningchamorro.com/lesson-3"),
            50.0
        );
        assert_eq!(trust_boost(&c, 10.0, None, "vonpreissig-p-112"), -10.0);
        assert_eq!(trust_boost(&c, 10.0, None, "unknown-source"), 10.0);
    }

    #[test]
    fn test_lookup_weights_favor_dictionaries() {
        let c = cfg();
        assert_eq!(
            query_class_weight(&c, QueryClass::Lookup, SourceCategory::Dictionary),
            10.0
        );
        assert_eq!(
            query_class_weight(&c, QueryClass::Lookup, SourceCategory::Blog),
            0.2
        );
        assert_eq!(
            query_class_weight(&c, QueryClass::Lookup, SourceCategory::Archive),
            0.5
        );
    }

    #[test]
    fn test_educational_weights_invert() {
        let c = cfg();
        assert_eq!(
            query_class_weight(&c, QueryClass::Educational, SourceCategory::Lesson),
            2.0
        );
        assert_eq!(
            query_class_weight(&c, QueryClass::Educational, SourceCategory::Dictionary),
            0.5
        );
    }

    #[test]
    fn test_card_tables_penalize_unfavored_sources() {
        let c = cfg();
        assert_eq!(
            card_type_weight(&c, CardType::Vocabulary, SourceCategory::Dictionary),
            1.5
        );
        assert_eq!(
            card_type_weight(&c, CardType::Cultural, SourceCategory::Dictionary),
            0.7
        );
        assert_eq!(
            card_type_weight(&c, CardType::Phrase, SourceCategory::Lesson),
            1.5
        );
        assert_eq!(
            card_type_weight(&c, CardType::Numbers, SourceCategory::Blog),
            0.7
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            display_name("https://guampedia.com/latte-stones", SourceCategory::Encyclopedia),
            "Guampedia"
        );
        assert_eq!(
            display_name("some-new-site", SourceCategory::Lesson),
            "Lesson (some-new-site)"
        );
    }
}
