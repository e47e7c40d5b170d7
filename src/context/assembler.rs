//! Renders ranked chunks into the instructional context block.
//!
//! The block opens with a fixed preamble — source-priority policy,
//! disambiguation hints, anti-hallucination instructions — followed by one
//! numbered passage per chunk. Chunks stop once the running token count
//! would pass the budget; the preamble itself is only cut when nothing
//! else fits, since passages outrank boilerplate.

use crate::reranking::display_name;
use crate::tokenizer::TokenCounter;
use crate::types::{AssembledContext, ScoredCandidate, SourceRef};

fn build_preamble() -> String {
    let mut p = String::new();
    p.push_str("# REFERENCE MATERIAL\n");
    p.push_str("Answer using the numbered passages below. They are ordered by reliability: ");
    p.push_str("dictionary entries and modern lessons first, then stories and articles.\n");
    p.push_str("- When sources disagree, prefer the earlier passage and modern orthography (å, ñ, ') over 19th-century spellings.\n");
    p.push_str("- A Chamorro word can carry several unrelated senses; if the passages show more than one, present them instead of guessing.\n");
    p.push_str("- If the passages do not contain the answer, say you don't know. Never invent a translation.\n");
    p.push_str("- Cite passages inline as [1], [2] where you use them.\n\n");
    p
}

/// Assemble the context block for the given candidates under `budget`
/// tokens. An empty candidate list yields an empty context; the caller
/// proceeds without reference material rather than erroring.
pub fn assemble(
    counter: &TokenCounter,
    candidates: &[ScoredCandidate],
    budget: usize,
) -> AssembledContext {
    if candidates.is_empty() {
        return AssembledContext::default();
    }

    let preamble = build_preamble();
    let mut used = counter.count(&preamble);
    let mut text = preamble;
    let mut citations = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        let chunk = &candidate.chunk;
        let source_name = display_name(&chunk.source_id, chunk.category);
        let block = match &chunk.locator {
            Some(locator) => format!(
                "[{}] (Source: {}, {})\n{}\n\n",
                i + 1,
                source_name,
                locator,
                chunk.content.trim()
            ),
            None => format!(
                "[{}] (Source: {})\n{}\n\n",
                i + 1,
                source_name,
                chunk.content.trim()
            ),
        };
        let cost = counter.count(&block);
        if used + cost > budget {
            tracing::debug!(
                included = citations.len(),
                dropped = candidates.len() - citations.len(),
                "Context budget reached, dropping remaining chunks"
            );
            break;
        }
        used += cost;
        text.push_str(&block);
        citations.push(SourceRef {
            source_name,
            locator: chunk.locator.clone(),
        });
    }

    // Degenerate budgets where even the preamble overflows: cut the
    // boilerplate last so whatever fits is still passage text.
    if counter.count(&text) > budget {
        tracing::warn!(budget, "Preamble alone exceeds the context budget, truncating");
        text = counter.truncate(&text, budget);
    }

    AssembledContext { text, citations }
}
