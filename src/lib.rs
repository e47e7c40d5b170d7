pub mod config;
pub mod context;
pub mod engine;
pub mod llm;
pub mod query;
pub mod reranking;
pub mod search;
pub mod tokenizer;
pub mod types;

// Re-export primary types for convenience
pub use config::EngineConfig;
pub use context::{BudgetError, BudgetManager, TokenBudget};
pub use engine::{ContextEngine, PreparedPrompt, TurnRequest};
pub use llm::Summarizer;
pub use query::{CardType, ClassifiedQuery, LookupDirection, QueryClass};
pub use search::{DictionaryIndex, SemanticSearch};
pub use tokenizer::TokenCounter;
pub use types::{
    AssembledContext, Chunk, ConversationTurn, Role, ScoredCandidate, SourceCategory, SourceRef,
};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
