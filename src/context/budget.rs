//! Token budget ownership and per-section preparation.
//!
//! A `TokenBudget` fixes the split for one prompt; a `BudgetManager` pairs
//! it with a tokenizer and guarantees every `prepare_*` result fits its
//! section. Budget pressure is never an error here — sections truncate,
//! summarize, or drop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BudgetConfig, HistoryConfig};
use crate::context::assembler;
use crate::context::history::HistoryPreparer;
use crate::llm::Summarizer;
use crate::tokenizer::TokenCounter;
use crate::types::{AssembledContext, ConversationTurn, ScoredCandidate};

/// Marker inserted where the middle of an attached document was removed.
fn removal_marker(tokens: usize) -> String {
    format!("[... {} tokens removed ...]", tokens)
}

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("section budgets sum to {allocated} tokens, over the {total}-token total")]
    OverAllocated { allocated: usize, total: usize },
    #[error("total budget must be greater than zero")]
    ZeroTotal,
}

/// Fixed token split for one assembled prompt. The five sections must sum
/// to at most `total`; construction fails fast otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenBudget {
    pub total: usize,
    pub system_prompt: usize,
    pub rag_context: usize,
    pub conversation_history: usize,
    pub current_message: usize,
    pub response_reserve: usize,
}

impl TokenBudget {
    pub fn new(
        total: usize,
        system_prompt: usize,
        rag_context: usize,
        conversation_history: usize,
        current_message: usize,
        response_reserve: usize,
    ) -> Result<Self, BudgetError> {
        if total == 0 {
            return Err(BudgetError::ZeroTotal);
        }
        let budget = Self {
            total,
            system_prompt,
            rag_context,
            conversation_history,
            current_message,
            response_reserve,
        };
        let allocated = budget.allocated();
        if allocated > total {
            return Err(BudgetError::OverAllocated { allocated, total });
        }
        Ok(budget)
    }

    pub fn from_config(cfg: &BudgetConfig) -> Result<Self, BudgetError> {
        Self::new(
            cfg.total,
            cfg.system_prompt,
            cfg.rag_context,
            cfg.conversation_history,
            cfg.current_message,
            cfg.response_reserve,
        )
    }

    pub fn allocated(&self) -> usize {
        self.system_prompt
            + self.rag_context
            + self.conversation_history
            + self.current_message
            + self.response_reserve
    }
}

/// What each prepared section actually consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionUsage {
    pub system_prompt: usize,
    pub rag_context: usize,
    pub conversation_history: usize,
    pub current_message: usize,
}

impl SectionUsage {
    pub fn total(&self) -> usize {
        self.system_prompt + self.rag_context + self.conversation_history + self.current_message
    }
}

pub struct BudgetManager {
    budget: TokenBudget,
    counter: TokenCounter,
    usage: SectionUsage,
}

impl BudgetManager {
    pub fn new(budget: TokenBudget, counter: TokenCounter) -> Self {
        Self {
            budget,
            counter,
            usage: SectionUsage::default(),
        }
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    pub fn usage(&self) -> &SectionUsage {
        &self.usage
    }

    /// System prompts are authored to fit; truncation here is a rare
    /// degraded mode that keeps the prefix.
    pub fn prepare_system_prompt(&mut self, prompt: &str) -> String {
        let out = self.clamp(prompt, self.budget.system_prompt, "system_prompt");
        self.usage.system_prompt = self.counter.count(&out);
        out
    }

    pub fn prepare_rag_context(&mut self, candidates: &[ScoredCandidate]) -> AssembledContext {
        let assembled = assembler::assemble(&self.counter, candidates, self.budget.rag_context);
        self.usage.rag_context = self.counter.count(&assembled.text);
        assembled
    }

    /// Truncate the current message to its section budget. Calling this on
    /// already-prepared output returns it unchanged.
    pub fn prepare_message(&mut self, message: &str) -> String {
        let out = self.clamp(message, self.budget.current_message, "current_message");
        self.usage.current_message = self.counter.count(&out);
        out
    }

    pub async fn prepare_history(
        &mut self,
        turns: &[ConversationTurn],
        cfg: &HistoryConfig,
        summarizer: Option<&dyn Summarizer>,
    ) -> Vec<ConversationTurn> {
        let preparer = HistoryPreparer::new(&self.counter, cfg);
        let out = preparer
            .prepare(turns, self.budget.conversation_history, summarizer)
            .await;
        self.usage.conversation_history = preparer.count_turns(&out);
        out
    }

    /// Headroom left in the current-message section once the live message
    /// is counted. Attached document text must fit inside it.
    pub fn message_headroom(&self, live_message: &str) -> usize {
        self.budget
            .current_message
            .saturating_sub(self.counter.count(live_message))
    }

    /// Fit extracted document text into `headroom` tokens. When neither end
    /// alone would do, keep 60% from the start and 30% from the end with an
    /// explicit marker for the removed middle, so context from both ends of
    /// the document survives.
    pub fn fit_document(&self, text: &str, headroom: usize) -> String {
        let total = self.counter.count(text);
        if total <= headroom {
            return text.to_string();
        }
        if headroom == 0 {
            return String::new();
        }
        let head_tokens = headroom * 6 / 10;
        let tail_tokens = headroom * 3 / 10;
        if tail_tokens == 0 {
            return self.counter.truncate(text, headroom);
        }
        let removed = total - head_tokens - tail_tokens;
        tracing::debug!(total, headroom, removed, "Splitting document into head and tail");
        let head = self.counter.truncate(text, head_tokens);
        let tail = self.counter.truncate_start(text, tail_tokens);
        format!("{}\n{}\n{}", head, removal_marker(removed), tail)
    }

    /// `total − sum(sections used)`, floored at zero. Informational only —
    /// model APIs cap output length on their own.
    pub fn tokens_remaining_for_response(&self) -> usize {
        self.budget.total.saturating_sub(self.usage.total())
    }

    fn clamp(&self, text: &str, limit: usize, section: &str) -> String {
        if self.counter.count(text) <= limit {
            return text.to_string();
        }
        tracing::warn!(section, limit, "Section over budget, truncating");
        self.counter.truncate(text, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> TokenBudget {
        TokenBudget::new(1000, 100, 300, 250, 200, 150).unwrap()
    }

    fn manager() -> BudgetManager {
        BudgetManager::new(budget(), TokenCounter::estimate_only())
    }

    #[test]
    fn test_valid_budget_constructs() {
        let b = budget();
        assert_eq!(b.allocated(), 1000);
    }

    #[test]
    fn test_overallocated_budget_rejected() {
        let err = TokenBudget::new(100, 50, 50, 50, 0, 0).unwrap_err();
        assert!(matches!(
            err,
            BudgetError::OverAllocated {
                allocated: 150,
                total: 100
            }
        ));
    }

    #[test]
    fn test_zero_total_rejected() {
        assert!(matches!(
            TokenBudget::new(0, 0, 0, 0, 0, 0),
            Err(BudgetError::ZeroTotal)
        ));
    }

    #[test]
    fn test_underallocated_budget_is_fine() {
        assert!(TokenBudget::new(1000, 10, 10, 10, 10, 10).is_ok());
    }

    #[test]
    fn test_prepare_message_within_budget() {
        let mut m = manager();
        let long = "word ".repeat(500);
        let out = m.prepare_message(&long);
        assert!(m.counter.count(&out) <= m.budget.current_message);
        assert_eq!(m.usage.current_message, m.counter.count(&out));
    }

    #[test]
    fn test_prepare_message_idempotent() {
        let mut m = manager();
        let long = "word ".repeat(500);
        let once = m.prepare_message(&long);
        let twice = m.prepare_message(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_short_message_unchanged() {
        let mut m = manager();
        assert_eq!(m.prepare_message("håfa adai"), "håfa adai");
    }

    #[test]
    fn test_system_prompt_truncated_when_oversized() {
        let mut m = manager();
        let prompt = "instructions ".repeat(100);
        let out = m.prepare_system_prompt(&prompt);
        assert!(m.counter.count(&out) <= m.budget.system_prompt);
    }

    #[test]
    fn test_message_headroom() {
        let m = manager();
        let live = "a".repeat(400); // 100 tokens under the estimate
        assert_eq!(m.message_headroom(&live), 100);
        assert_eq!(m.message_headroom(&"a".repeat(4000)), 0);
    }

    #[test]
    fn test_fit_document_passthrough_when_small() {
        let m = manager();
        assert_eq!(m.fit_document("short doc", 50), "short doc");
    }

    #[test]
    fn test_fit_document_splits_head_and_tail() {
        let m = manager();
        let doc = format!("START{}END", " filler".repeat(2000));
        let out = m.fit_document(&doc, 100);
        assert!(out.starts_with("START"));
        assert!(out.ends_with("END"));
        assert!(out.contains("tokens removed"));
        // 60% + 30% + marker stays inside the headroom.
        assert!(m.counter.count(&out) <= 100);
    }

    #[test]
    fn test_fit_document_zero_headroom() {
        let m = manager();
        assert_eq!(m.fit_document("anything", 0), "");
    }

    #[test]
    fn test_tokens_remaining_for_response() {
        let mut m = manager();
        m.prepare_message(&"word ".repeat(500));
        m.prepare_system_prompt("short");
        let remaining = m.tokens_remaining_for_response();
        assert_eq!(
            remaining,
            m.budget.total - m.usage.current_message - m.usage.system_prompt
        );
        assert!(remaining <= m.budget.total);
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        let b = TokenBudget::new(10, 10, 0, 0, 0, 0).unwrap();
        let mut m = BudgetManager::new(b, TokenCounter::estimate_only());
        m.usage.system_prompt = 50; // simulate an estimate drifting over
        assert_eq!(m.tokens_remaining_for_response(), 0);
    }
}
