pub mod exact;
pub mod retry;
pub mod semantic;

pub use exact::DictionaryIndex;
pub use retry::{FailureKind, RetryPolicy};
pub use semantic::{SemanticSearch, VectorRetriever};
