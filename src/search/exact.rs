//! Exact-match head-word lookup against the dictionary corpus.
//!
//! Chamorro→English lookups hit the relational store directly: dictionary
//! entries are keyed by Chamorro head-words, so a plain pattern match beats
//! the embedding space for single-word queries. English→Chamorro lookups
//! skip this path entirely.

use std::collections::HashSet;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::config::RetryConfig;
use crate::search::retry::RetryPolicy;
use crate::types::{Chunk, SourceCategory};

/// How much of an entry counts as the definition area — roughly the first
/// few lines, before the example sentences start.
const DEFINITION_WINDOW: i32 = 240;

pub struct DictionaryIndex {
    pool: PgPool,
    retry: RetryPolicy,
}

impl DictionaryIndex {
    pub async fn connect(database_url: &str, retry: &RetryConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Postgres connection for dictionary index failed")?;
        tracing::info!("Connected to Postgres for dictionary lookups");
        Ok(Self::from_pool(pool, retry))
    }

    pub fn from_pool(pool: PgPool, retry: &RetryConfig) -> Self {
        Self {
            pool,
            retry: RetryPolicy::from_config(retry),
        }
    }

    /// Look up `term` as a Chamorro head-word. Returns up to `k` chunks, or
    /// an empty list when the store stays unreachable after retries — the
    /// caller then continues on semantic results alone.
    pub async fn lookup(&self, term: &str, k: usize) -> Vec<Chunk> {
        let term = term.trim().to_lowercase();
        if term.is_empty() || k == 0 {
            return Vec::new();
        }
        let result = self
            .retry
            .run("dictionary lookup", || {
                let pool = self.pool.clone();
                let term = term.clone();
                async move { query_headword(&pool, &term, k).await }
            })
            .await;
        match result {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(
                    term = %term,
                    error = %e,
                    "Dictionary lookup unavailable, continuing with semantic results only"
                );
                Vec::new()
            }
        }
    }
}

/// Rank order: bolded head-word opening the entry, then a hit inside the
/// definition area, then any other occurrence — shorter entries first
/// within each band.
async fn query_headword(pool: &PgPool, term: &str, k: usize) -> Result<Vec<Chunk>> {
    let rows = sqlx::query(
        "SELECT id, content, source_id, category, trust_priority, title, locator \
         FROM chunks \
         WHERE category = 'dictionary' \
           AND lower(content) LIKE '%' || $1 || '%' \
         ORDER BY CASE \
             WHEN lower(content) LIKE '**' || $1 || '**%' THEN 0 \
             WHEN strpos(lower(left(content, $2)), $1) > 0 THEN 1 \
             ELSE 2 END, \
           length(content) ASC \
         LIMIT $3",
    )
    .bind(term)
    .bind(DEFINITION_WINDOW)
    // Overfetch so dedup can still fill k.
    .bind((k * 2) as i64)
    .fetch_all(pool)
    .await
    .context("Head-word query failed")?;

    let mut seen = HashSet::new();
    let mut chunks = Vec::with_capacity(k);
    for row in &rows {
        let chunk = row_to_chunk(row)?;
        if seen.insert(chunk.content.clone()) {
            chunks.push(chunk);
            if chunks.len() == k {
                break;
            }
        }
    }
    Ok(chunks)
}

fn row_to_chunk(row: &PgRow) -> Result<Chunk> {
    let category: String = row.try_get("category")?;
    Ok(Chunk {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        source_id: row.try_get("source_id")?,
        category: SourceCategory::parse(&category),
        trust_priority: row.try_get("trust_priority")?,
        title: row.try_get("title")?,
        locator: row.try_get("locator")?,
    })
}
