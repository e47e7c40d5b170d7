use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A retrievable unit of corpus text with its source metadata.
///
/// Chunks are owned by the corpus; the engine only references them for the
/// duration of one request and never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub content: String,
    pub source_id: String,
    pub category: SourceCategory,
    /// Authority/recency score set at ingestion (higher = more trusted).
    /// Absent for sources ingested before the trust pass; the reranker
    /// falls back to per-domain adjustments.
    pub trust_priority: Option<i32>,
    pub title: String,
    /// Page or section reference inside the source, when known.
    pub locator: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Dictionary,
    Lesson,
    Story,
    Encyclopedia,
    Blog,
    /// Archival material, mostly 19th/early-20th century orthography.
    Archive,
    Other,
}

impl SourceCategory {
    /// Parse the category string stored with each chunk. Unknown values map
    /// to `Other` rather than failing the whole retrieval.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dictionary" => Self::Dictionary,
            "lesson" => Self::Lesson,
            "story" => Self::Story,
            "encyclopedia" => Self::Encyclopedia,
            "blog" => Self::Blog,
            "archive" => Self::Archive,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dictionary => "Dictionary",
            Self::Lesson => "Lesson",
            Self::Story => "Story",
            Self::Encyclopedia => "Encyclopedia",
            Self::Blog => "Blog",
            Self::Archive => "Archive",
            Self::Other => "Reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One turn of conversation history. The engine treats the caller's history
/// as read-only and returns a fresh, possibly shorter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    ExactMatch,
    Semantic,
}

/// A chunk with its reranking score attached.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub score: f32,
    pub origin: CandidateOrigin,
}

/// Citation entry for a chunk that made it into the assembled context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_name: String,
    pub locator: Option<String>,
}

/// The rendered context block plus citations for the chunks it includes,
/// in the same order. Chunks dropped for budget reasons are not cited.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    pub text: String,
    pub citations: Vec<SourceRef>,
}
