//! Token counting for prompt budgeting.
//!
//! Wraps a `tiktoken` BPE selected by model family. When no tokenizer is
//! available for the model the counter degrades to a fixed chars-per-token
//! estimate instead of failing the request.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

/// Rough BPE average on English/Chamorro prose; used when no real
/// tokenizer is loaded.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Clone)]
pub struct TokenCounter {
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenCounter {
    /// Tokenizer for a specific model family, falling back to the generic
    /// `cl100k_base` vocabulary for unknown models and to the estimate when
    /// even that fails to load.
    pub fn for_model(model: &str) -> Self {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .or_else(|_| tiktoken_rs::cl100k_base())
            .ok();
        if bpe.is_none() {
            tracing::warn!(model, "No tokenizer available, using chars-per-token estimate");
        }
        Self {
            bpe: bpe.map(Arc::new),
        }
    }

    /// Generic tokenizer, independent of any model id.
    pub fn generic() -> Self {
        Self {
            bpe: tiktoken_rs::cl100k_base().ok().map(Arc::new),
        }
    }

    /// Estimate-only counter. This is the degraded mode; tests also use it
    /// for predictable counts.
    pub fn estimate_only() -> Self {
        Self { bpe: None }
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => estimate_tokens(text),
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u32> {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text),
            None => Vec::new(),
        }
    }

    pub fn decode(&self, tokens: &[u32]) -> String {
        match &self.bpe {
            Some(bpe) => bpe.decode(tokens.to_vec()).unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Truncate to at most `max_tokens`, keeping the prefix. The result is
    /// guaranteed to re-count within the limit.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> String {
        if self.count(text) <= max_tokens {
            return text.to_string();
        }
        match &self.bpe {
            Some(bpe) => {
                let tokens = bpe.encode_with_special_tokens(text);
                let mut end = max_tokens.min(tokens.len());
                loop {
                    if end == 0 {
                        return String::new();
                    }
                    match bpe.decode(tokens[..end].to_vec()) {
                        // Re-encoding a decoded prefix can merge tokens
                        // differently, so verify before returning.
                        Ok(s) if bpe.encode_with_special_tokens(&s).len() <= max_tokens => {
                            return s;
                        }
                        _ => end -= 1,
                    }
                }
            }
            None => prefix_bytes(text, max_tokens * CHARS_PER_TOKEN),
        }
    }

    /// Truncate to at most `max_tokens`, keeping the suffix.
    pub fn truncate_start(&self, text: &str, max_tokens: usize) -> String {
        if self.count(text) <= max_tokens {
            return text.to_string();
        }
        match &self.bpe {
            Some(bpe) => {
                let tokens = bpe.encode_with_special_tokens(text);
                let mut start = tokens.len().saturating_sub(max_tokens);
                loop {
                    if start >= tokens.len() {
                        return String::new();
                    }
                    match bpe.decode(tokens[start..].to_vec()) {
                        Ok(s) if bpe.encode_with_special_tokens(&s).len() <= max_tokens => {
                            return s;
                        }
                        _ => start += 1,
                    }
                }
            }
            None => suffix_bytes(text, max_tokens * CHARS_PER_TOKEN),
        }
    }
}

/// Fixed chars-per-token estimate. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

fn prefix_bytes(text: &str, max_bytes: usize) -> String {
    let mut end = max_bytes.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

fn suffix_bytes(text: &str, max_bytes: usize) -> String {
    let mut start = text.len().saturating_sub(max_bytes);
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
