//! Generation capability used for history summarization.
//!
//! The chat-completion model itself lives outside this crate; history
//! preparation only needs "given instructions and text, return generated
//! text". Failures here are recoverable — callers fall back to truncation.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Generate at most `max_output_tokens` of text for `user_text` under
    /// `system_instructions`. May fail transiently.
    async fn generate(
        &self,
        system_instructions: &str,
        user_text: &str,
        max_output_tokens: usize,
    ) -> Result<String>;
}
