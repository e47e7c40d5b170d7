//! Candidate reranking.
//!
//! Merges the exact-match and semantic candidate pools, applies the
//! multi-factor scoring rules, and returns the ordered top-k. Exact hits
//! occupy a reserved score band above anything a semantic candidate can
//! reach, so they always surface first.

use std::collections::HashSet;

use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::query::{CardType, QueryClass};
use crate::reranking::scoring::{card_type_weight, query_class_weight, trust_boost};
use crate::types::{CandidateOrigin, Chunk, ScoredCandidate};

#[derive(Debug, Clone, Copy)]
pub struct RerankContext {
    pub class: QueryClass,
    pub card_type: Option<CardType>,
}

/// Score and order the merged candidate pool, returning at most `k` chunks.
/// An empty pool returns empty; `k` beyond the pool returns the whole pool.
pub fn rerank(
    cfg: &ScoringConfig,
    exact: Vec<Chunk>,
    semantic: Vec<Chunk>,
    ctx: &RerankContext,
    k: usize,
) -> Vec<ScoredCandidate> {
    let pool_len = semantic.len();
    let mut scored: Vec<ScoredCandidate> = Vec::with_capacity(exact.len() + pool_len);

    for chunk in exact {
        let base = cfg.exact_match_base;
        let score = apply_context_weights(cfg, trust_boost(cfg, base, chunk.trust_priority, &chunk.source_id), ctx, &chunk);
        scored.push(ScoredCandidate {
            chunk,
            score,
            origin: CandidateOrigin::ExactMatch,
        });
    }

    // An exact hit also showing up in the semantic pool keeps its
    // exact-match band; the duplicate is dropped.
    let exact_ids: HashSet<Uuid> = scored.iter().map(|c| c.chunk.id).collect();
    for (rank, chunk) in semantic.into_iter().enumerate() {
        if exact_ids.contains(&chunk.id) {
            continue;
        }
        // Earlier retrieval rank means higher base.
        let base = (pool_len - rank) as f32;
        let score = apply_context_weights(cfg, trust_boost(cfg, base, chunk.trust_priority, &chunk.source_id), ctx, &chunk);
        scored.push(ScoredCandidate {
            chunk,
            score,
            origin: CandidateOrigin::Semantic,
        });
    }

    // Deterministic order: score, then trust priority, then shorter
    // content, then source id. `total_cmp` keeps NaN-free floats stable.
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                b.chunk
                    .trust_priority
                    .unwrap_or(0)
                    .cmp(&a.chunk.trust_priority.unwrap_or(0))
            })
            .then_with(|| a.chunk.content.len().cmp(&b.chunk.content.len()))
            .then_with(|| a.chunk.source_id.cmp(&b.chunk.source_id))
    });
    scored.truncate(k);
    scored
}

fn apply_context_weights(
    cfg: &ScoringConfig,
    mut score: f32,
    ctx: &RerankContext,
    chunk: &Chunk,
) -> f32 {
    score *= query_class_weight(cfg, ctx.class, chunk.category);
    if let Some(card) = ctx.card_type {
        score *= card_type_weight(cfg, card, chunk.category);
    }
    score
}
