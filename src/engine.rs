//! Request orchestration.
//!
//! `ContextEngine` is the dependency-injected service object tying the
//! pipeline together: classify the query, retrieve exact and semantic
//! candidates concurrently, rerank, then hand every prompt section to the
//! budget manager. One call per user turn; no state survives the request
//! beyond the pooled store handles.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;

use crate::config::EngineConfig;
use crate::context::budget::{BudgetManager, TokenBudget};
use crate::llm::Summarizer;
use crate::query::{classify_query, CardType, ClassifiedQuery, LookupDirection, QueryClass};
use crate::reranking::{rerank, RerankContext};
use crate::search::{DictionaryIndex, SemanticSearch, VectorRetriever};
use crate::tokenizer::TokenCounter;
use crate::types::{ConversationTurn, ScoredCandidate, SourceRef};

/// Everything the caller supplies for one user turn.
pub struct TurnRequest<'a> {
    pub query: &'a str,
    pub card_type: Option<CardType>,
    pub system_prompt: &'a str,
    pub history: &'a [ConversationTurn],
    /// Text extracted from an attached document, if any. Shares the
    /// current-message budget with the query itself.
    pub document_text: Option<&'a str>,
}

/// The budgeted prompt sections for one turn. The caller concatenates them
/// for the generation call.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub system_prompt: String,
    pub rag_context: String,
    pub citations: Vec<SourceRef>,
    pub history: Vec<ConversationTurn>,
    pub message: String,
    /// Informational: tokens left under the total after all sections.
    pub response_headroom: usize,
}

pub struct ContextEngine {
    config: EngineConfig,
    budget: TokenBudget,
    counter: TokenCounter,
    dictionary: DictionaryIndex,
    vectors: VectorRetriever,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ContextEngine {
    pub fn new(
        config: EngineConfig,
        pool: PgPool,
        store: Arc<dyn SemanticSearch>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid engine configuration")?;
        let budget = TokenBudget::from_config(&config.budget)?;
        let counter = TokenCounter::for_model(&config.model);
        let dictionary = DictionaryIndex::from_pool(pool, &config.retry);
        let vectors = VectorRetriever::new(store, &config.search, &config.retry);
        Ok(Self {
            config,
            budget,
            counter,
            dictionary,
            vectors,
            summarizer,
        })
    }

    /// Retrieve and rank the knowledge-base candidates for a classified
    /// query. Both retrieval paths degrade to empty on failure, so the
    /// worst case is an empty result, never an error.
    pub async fn retrieve(&self, query: &ClassifiedQuery, k: usize) -> Vec<ScoredCandidate> {
        // The dictionary index is keyed by Chamorro head-words, so only
        // Chamorro→English lookups with an extracted term consult it.
        let exact_term = match (query.class, query.direction, &query.target_term) {
            (QueryClass::Lookup, LookupDirection::ChamorroToEnglish, Some(term)) => {
                Some(term.clone())
            }
            _ => None,
        };

        let (exact, semantic) = futures::join!(
            async {
                match &exact_term {
                    Some(term) => self.dictionary.lookup(term, k).await,
                    None => Vec::new(),
                }
            },
            self.vectors.candidates(&query.normalized, k),
        );

        tracing::debug!(
            exact = exact.len(),
            semantic = semantic.len(),
            class = ?query.class,
            "Retrieved candidate pools"
        );

        let ctx = RerankContext {
            class: query.class,
            card_type: query.card_type,
        };
        rerank(&self.config.scoring, exact, semantic, &ctx, k)
    }

    /// Assemble the full budgeted prompt for one turn.
    pub async fn prepare_turn(&self, req: TurnRequest<'_>) -> PreparedPrompt {
        let classified = classify_query(req.query, req.card_type);
        tracing::debug!(
            class = ?classified.class,
            term = ?classified.target_term,
            direction = ?classified.direction,
            "Classified query"
        );

        let candidates = self
            .retrieve(&classified, self.config.search.default_k)
            .await;

        let mut manager = BudgetManager::new(self.budget, self.counter.clone());
        let system_prompt = manager.prepare_system_prompt(req.system_prompt);
        let assembled = manager.prepare_rag_context(&candidates);
        let history = manager
            .prepare_history(req.history, &self.config.history, self.summarizer.as_deref())
            .await;
        let message = match req.document_text {
            Some(doc) => {
                let headroom = manager.message_headroom(req.query);
                let fitted = manager.fit_document(doc, headroom);
                manager.prepare_message(&format!("{}\n\n[Attached document]\n{}", req.query, fitted))
            }
            None => manager.prepare_message(req.query),
        };

        PreparedPrompt {
            system_prompt,
            rag_context: assembled.text,
            citations: assembled.citations,
            history,
            message,
            response_headroom: manager.tokens_remaining_for_response(),
        }
    }
}
