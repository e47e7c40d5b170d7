//! Vector similarity retrieval.
//!
//! Thin wrapper around the external vector-store capability: cleans the
//! query, widens the fan-out, and retries transient failures. No ranking
//! logic lives here — that belongs to the reranker.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{RetryConfig, SearchConfig};
use crate::search::retry::RetryPolicy;
use crate::types::Chunk;

/// The external vector-store capability. Implementations return chunks
/// already annotated with category and trust metadata from ingestion.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    async fn search(&self, text: &str, k: usize) -> Result<Vec<Chunk>>;
}

/// Generic words that pollute the embedding on short queries. The
/// language's own name is the worst offender: every chunk in the corpus is
/// "about Chamorro", so the neighborhood degenerates.
const CONTAMINATING_WORDS: &[&str] = &[
    "chamorro",
    "chamoru",
    "word",
    "translate",
    "translation",
    "mean",
    "meaning",
    "say",
    "english",
];

pub struct VectorRetriever {
    store: Arc<dyn SemanticSearch>,
    retry: RetryPolicy,
    candidate_multiplier: usize,
}

impl VectorRetriever {
    pub fn new(store: Arc<dyn SemanticSearch>, search: &SearchConfig, retry: &RetryConfig) -> Self {
        Self {
            store,
            retry: RetryPolicy::from_config(retry),
            candidate_multiplier: search.candidate_multiplier,
        }
    }

    /// Fetch a wide candidate pool for the reranker. Failures degrade to an
    /// empty pool rather than erroring the request.
    pub async fn candidates(&self, query: &str, k: usize) -> Vec<Chunk> {
        let cleaned = clean_query(query);
        let text = if cleaned.is_empty() {
            query.to_string()
        } else {
            cleaned
        };
        let fan_out = k.saturating_mul(self.candidate_multiplier).max(k);
        let result = self
            .retry
            .run("vector search", || {
                let store = Arc::clone(&self.store);
                let text = text.clone();
                async move { store.search(&text, fan_out).await }
            })
            .await;
        match result {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(error = %e, "Vector search unavailable, continuing without semantic candidates");
                Vec::new()
            }
        }
    }
}

/// Strip contaminating generic words before embedding. Keeps the glota so
/// Chamorro words survive intact.
pub fn clean_query(query: &str) -> String {
    query
        .split_whitespace()
        .filter(|word| {
            let bare = word
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();
            !bare.is_empty() && !CONTAMINATING_WORDS.contains(&bare.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}
