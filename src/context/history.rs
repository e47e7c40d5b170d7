//! Hybrid conversation-history preparation.
//!
//! The common case is a no-op: the full history fits and passes through
//! unchanged. Oversized histories keep a verbatim recent tail and compress
//! the older turns — summarized when the generation capability cooperates,
//! truncated with a visible marker when it does not.

use crate::config::HistoryConfig;
use crate::llm::Summarizer;
use crate::tokenizer::TokenCounter;
use crate::types::ConversationTurn;

/// The summary targets a quarter of whatever budget the older turns have
/// left, leaving slack for the model overshooting its output cap.
const SUMMARY_BUDGET_DIVISOR: usize = 4;

/// Per-turn cost on top of the content: role name and formatting markers
/// in the wire format.
const TURN_OVERHEAD_TOKENS: usize = 4;

const TRUNCATION_MARKER: &str = "[earlier conversation truncated]";

const SUMMARY_INSTRUCTIONS: &str = "You condense the earlier turns of a conversation between a \
    learner and a Chamorro language tutor. Keep the facts established so far: vocabulary already \
    covered, corrections given, the learner's goals and preferences. Write one compact paragraph.";

pub struct HistoryPreparer<'a> {
    counter: &'a TokenCounter,
    cfg: &'a HistoryConfig,
}

impl<'a> HistoryPreparer<'a> {
    pub fn new(counter: &'a TokenCounter, cfg: &'a HistoryConfig) -> Self {
        Self { counter, cfg }
    }

    /// Produce a history that fits `budget` tokens. The caller's slice is
    /// never mutated; the newest turn always survives.
    pub async fn prepare(
        &self,
        turns: &[ConversationTurn],
        budget: usize,
        summarizer: Option<&dyn Summarizer>,
    ) -> Vec<ConversationTurn> {
        if turns.is_empty() {
            return Vec::new();
        }
        if self.count_turns(turns) <= budget {
            return turns.to_vec();
        }

        let split = turns.len().saturating_sub(self.cfg.recent_turns);
        let (older, recent) = turns.split_at(split);

        let recent_cost = self.count_turns(recent);
        if recent_cost > budget {
            return self.truncate_backward(recent, budget);
        }

        let remaining = budget - recent_cost;
        if older.is_empty() || remaining < self.cfg.min_useful_tokens {
            if !older.is_empty() {
                tracing::debug!(
                    remaining,
                    dropped_turns = older.len(),
                    "No useful budget for older history, keeping recent tail only"
                );
            }
            return recent.to_vec();
        }

        let older_text = render_turns(older);
        let lead_content = match summarizer {
            Some(s) => {
                let target = (remaining / SUMMARY_BUDGET_DIVISOR).max(1);
                match s.generate(SUMMARY_INSTRUCTIONS, &older_text, target).await {
                    Ok(summary) => {
                        format!("Summary of the earlier conversation: {}", summary.trim())
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "History summarization failed, falling back to truncation");
                        self.truncated_older(&older_text, remaining)
                    }
                }
            }
            None => self.truncated_older(&older_text, remaining),
        };
        // Guard against the model ignoring its output cap.
        let room = remaining.saturating_sub(TURN_OVERHEAD_TOKENS);
        let lead_content = if self.counter.count(&lead_content) > room {
            self.counter.truncate(&lead_content, room)
        } else {
            lead_content
        };

        let mut out = Vec::with_capacity(recent.len() + 1);
        out.push(ConversationTurn::assistant(lead_content));
        out.extend_from_slice(recent);
        out
    }

    /// Keep whole turns newest-first; the turn that no longer fits is cut
    /// down to the leftover room and everything older is dropped entirely.
    fn truncate_backward(
        &self,
        recent: &[ConversationTurn],
        budget: usize,
    ) -> Vec<ConversationTurn> {
        let mut kept: Vec<ConversationTurn> = Vec::new();
        let mut used = 0usize;
        for turn in recent.iter().rev() {
            let cost = self.count_turn(turn);
            let room = budget.saturating_sub(used);
            if cost <= room {
                used += cost;
                kept.push(turn.clone());
                continue;
            }
            if room > TURN_OVERHEAD_TOKENS || kept.is_empty() {
                let content_room = room.saturating_sub(TURN_OVERHEAD_TOKENS);
                kept.push(ConversationTurn {
                    role: turn.role,
                    content: self.counter.truncate(&turn.content, content_room),
                });
            }
            break;
        }
        kept.reverse();
        kept
    }

    fn truncated_older(&self, older_text: &str, remaining: usize) -> String {
        let marker_cost = self.counter.count(TRUNCATION_MARKER);
        let room = remaining
            .saturating_sub(marker_cost + TURN_OVERHEAD_TOKENS + 1);
        let body = self.counter.truncate(older_text, room);
        format!("{}\n{}", body, TRUNCATION_MARKER)
    }

    pub fn count_turn(&self, turn: &ConversationTurn) -> usize {
        TURN_OVERHEAD_TOKENS + self.counter.count(&turn.content)
    }

    pub fn count_turns(&self, turns: &[ConversationTurn]) -> usize {
        turns.iter().map(|t| self.count_turn(t)).sum()
    }
}

fn render_turns(turns: &[ConversationTurn]) -> String {
    let mut out = String::new();
    for turn in turns {
        out.push_str(turn.role.label());
        out.push_str(": ");
        out.push_str(&turn.content);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedSummarizer(String);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn generate(&self, _: &str, _: &str, _: usize) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn generate(&self, _: &str, _: &str, _: usize) -> Result<String> {
            Err(anyhow::anyhow!("model temporarily unavailable"))
        }
    }

    fn cfg() -> HistoryConfig {
        HistoryConfig {
            recent_turns: 6,
            min_useful_tokens: 100,
        }
    }

    fn turns(n: usize, words_each: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| {
                let content = format!("turn {} {}", i, "word ".repeat(words_each));
                if i % 2 == 0 {
                    ConversationTurn::user(content)
                } else {
                    ConversationTurn::assistant(content)
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fitting_history_passes_through() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let history = turns(4, 5);
        let out = preparer.prepare(&history, 10_000, None).await;
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].content, history[0].content);
    }

    #[tokio::test]
    async fn test_older_turns_summarized_into_lead_message() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let history = turns(20, 30);
        let recent_cost = preparer.count_turns(&history[14..]);
        let budget = recent_cost + 300;
        let summarizer = FixedSummarizer("they covered greetings and numbers".into());
        let out = preparer.prepare(&history, budget, Some(&summarizer)).await;

        assert_eq!(out.len(), 7); // 6 recent + synthetic lead
        assert!(out[0].content.contains("they covered greetings and numbers"));
        assert!(preparer.count_turns(&out) <= budget);
        assert_eq!(out.last().unwrap().content, history.last().unwrap().content);
    }

    #[tokio::test]
    async fn test_summarizer_failure_falls_back_to_truncation() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let history = turns(20, 30);
        let recent_cost = preparer.count_turns(&history[14..]);
        let budget = recent_cost + 300;
        let out = preparer.prepare(&history, budget, Some(&FailingSummarizer)).await;

        assert!(preparer.count_turns(&out) <= budget);
        assert!(out[0].content.contains(TRUNCATION_MARKER));
        assert_eq!(out.last().unwrap().content, history.last().unwrap().content);
    }

    #[tokio::test]
    async fn test_no_summarizer_truncates_older_text() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let history = turns(12, 40);
        let recent_cost = preparer.count_turns(&history[6..]);
        let budget = recent_cost + 200;
        let out = preparer.prepare(&history, budget, None).await;
        assert!(out[0].content.ends_with(TRUNCATION_MARKER));
        assert!(preparer.count_turns(&out) <= budget);
    }

    #[tokio::test]
    async fn test_small_leftover_drops_older_portion() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let history = turns(20, 30);
        let recent_cost = preparer.count_turns(&history[14..]);
        let budget = recent_cost + 50; // under min_useful_tokens
        let out = preparer.prepare(&history, budget, None).await;
        assert_eq!(out.len(), 6);
        assert_eq!(out[0].content, history[14].content);
    }

    #[tokio::test]
    async fn test_oversized_tail_truncates_backward() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let history = turns(8, 100);
        let budget = 250;
        let out = preparer.prepare(&history, budget, None).await;
        assert!(!out.is_empty());
        assert!(preparer.count_turns(&out) <= budget);
        // Newest turn survives, possibly cut down.
        let newest = &history.last().unwrap().content;
        assert!(newest.starts_with(out.last().unwrap().content.as_str()));
    }

    #[tokio::test]
    async fn test_most_recent_turn_always_present() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let history = turns(10, 200);
        for budget in [30usize, 80, 150, 400] {
            let out = preparer.prepare(&history, budget, None).await;
            assert!(!out.is_empty(), "budget {} produced empty history", budget);
            assert!(preparer.count_turns(&out) <= budget);
            let newest = &history.last().unwrap().content;
            let kept = &out.last().unwrap().content;
            assert!(newest.starts_with(kept.as_str()));
        }
    }

    #[tokio::test]
    async fn test_empty_history_is_noop() {
        let counter = TokenCounter::estimate_only();
        let config = cfg();
        let preparer = HistoryPreparer::new(&counter, &config);
        let out = preparer.prepare(&[], 100, None).await;
        assert!(out.is_empty());
    }
}
