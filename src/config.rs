use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Generation model family; selects the tokenizer.
    pub model: String,
    pub search: SearchConfig,
    pub scoring: ScoringConfig,
    pub budget: BudgetConfig,
    pub history: HistoryConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of chunks handed to the context assembler.
    pub default_k: usize,
    /// Vector search fans out to `default_k * candidate_multiplier` so the
    /// reranker has a wide pool to work with.
    pub candidate_multiplier: usize,
}

/// Token split for one assembled prompt. The five sections must sum to at
/// most `total`; `TokenBudget::from_config` rejects anything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub total: usize,
    pub system_prompt: usize,
    pub rag_context: usize,
    pub conversation_history: usize,
    pub current_message: usize,
    pub response_reserve: usize,
}

impl BudgetConfig {
    pub fn allocated(&self) -> usize {
        self.system_prompt
            + self.rag_context
            + self.conversation_history
            + self.current_message
            + self.response_reserve
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Turns kept verbatim at the end of an oversized history.
    pub recent_turns: usize,
    /// Below this many leftover tokens, the older portion is dropped
    /// instead of summarized.
    pub min_useful_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

/// Per-domain score adjustment for chunks ingested without a trust
/// priority. Positive for modern/authoritative sites, negative for
/// archival scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainAdjustment {
    pub domain: String,
    pub adjustment: f32,
}

/// Reranker constants. The multipliers and discounts are empirically tuned
/// values carried over from production traffic; override from config rather
/// than editing the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Base score for exact head-word hits. Must stay above the highest
    /// score a semantic candidate can reach after every boost.
    pub exact_match_base: f32,
    /// Trust priority at or above this marks lesson/story-grade content.
    pub high_trust_threshold: i32,
    pub mid_trust_threshold: i32,
    pub high_trust_multiplier: f32,
    pub mid_trust_multiplier: f32,
    pub lookup_dictionary_boost: f32,
    /// Applied to blogs and encyclopedic articles on lookup queries; a
    /// single-word lookup should not surface a magazine piece.
    pub lookup_narrative_discount: f32,
    pub lookup_archive_discount: f32,
    pub educational_source_boost: f32,
    pub educational_dictionary_discount: f32,
    pub card_favored_boost: f32,
    pub card_soft_penalty: f32,
    pub card_strong_penalty: f32,
    pub domain_adjustments: Vec<DomainAdjustment>,
}

impl EngineConfig {
    /// Validate config values, returning errors for clearly broken
    /// configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.search.default_k == 0 {
            return Err("search.default_k must be > 0".into());
        }
        if self.search.candidate_multiplier == 0 {
            return Err("search.candidate_multiplier must be > 0".into());
        }
        if self.budget.total == 0 {
            return Err("budget.total must be > 0".into());
        }
        if self.budget.allocated() > self.budget.total {
            return Err(format!(
                "budget sections sum to {} tokens, over the {}-token total",
                self.budget.allocated(),
                self.budget.total
            ));
        }
        if self.history.recent_turns == 0 {
            return Err("history.recent_turns must be > 0".into());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".into());
        }
        let s = &self.scoring;
        if s.exact_match_base <= 0.0 {
            return Err("scoring.exact_match_base must be > 0".into());
        }
        if s.high_trust_multiplier < 1.0 || s.mid_trust_multiplier < 1.0 {
            return Err("scoring trust multipliers must be >= 1.0".into());
        }
        for (name, v) in [
            ("lookup_narrative_discount", s.lookup_narrative_discount),
            ("lookup_archive_discount", s.lookup_archive_discount),
            ("educational_dictionary_discount", s.educational_dictionary_discount),
            ("card_soft_penalty", s.card_soft_penalty),
            ("card_strong_penalty", s.card_strong_penalty),
        ] {
            if !(0.0..=1.0).contains(&v) || v == 0.0 {
                return Err(format!("scoring.{} must be in (0.0, 1.0]", name));
            }
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            search: SearchConfig {
                default_k: 6,
                candidate_multiplier: 10,
            },
            scoring: ScoringConfig::default(),
            budget: BudgetConfig {
                total: 8192,
                system_prompt: 800,
                rag_context: 2400,
                conversation_history: 2000,
                current_message: 1500,
                response_reserve: 1400,
            },
            history: HistoryConfig {
                recent_turns: 6,
                min_useful_tokens: 100,
            },
            retry: RetryConfig {
                max_attempts: 2,
                base_delay_ms: 200,
            },
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            exact_match_base: 10_000.0,
            high_trust_threshold: 90,
            mid_trust_threshold: 50,
            high_trust_multiplier: 3.0,
            mid_trust_multiplier: 2.0,
            lookup_dictionary_boost: 10.0,
            lookup_narrative_discount: 0.2,
            lookup_archive_discount: 0.5,
            educational_source_boost: 2.0,
            educational_dictionary_discount: 0.5,
            card_favored_boost: 1.5,
            card_soft_penalty: 0.8,
            card_strong_penalty: 0.7,
            domain_adjustments: vec![
                DomainAdjustment {
                    domain: "learningchamorro".into(),
                    adjustment: 40.0,
                },
                DomainAdjustment {
                    domain: "guampedia".into(),
                    adjustment: 20.0,
                },
                DomainAdjustment {
                    domain: "chamoru.info".into(),
                    adjustment: 15.0,
                },
                DomainAdjustment {
                    domain: "vonpreissig".into(),
                    adjustment: -20.0,
                },
                DomainAdjustment {
                    domain: "safford".into(),
                    adjustment: -20.0,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overallocated_budget_rejected() {
        let mut config = EngineConfig::default();
        config.budget.rag_context = config.budget.total;
        let err = config.validate().unwrap_err();
        assert!(err.contains("budget sections"), "unexpected error: {}", err);
    }

    #[test]
    fn test_zero_k_rejected() {
        let mut config = EngineConfig::default();
        config.search.default_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discount_range_checked() {
        let mut config = EngineConfig::default();
        config.scoring.lookup_narrative_discount = 1.5;
        assert!(config.validate().is_err());
    }
}
