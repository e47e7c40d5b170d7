pub mod reranker;
pub mod scoring;

pub use reranker::{rerank, RerankContext};
pub use scoring::display_name;
