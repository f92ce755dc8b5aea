//! Case retrieval
//!
//! Embeds the question, over-fetches from the vector index, then narrows the
//! candidates down to at most [`TARGET_CASES`] unique cases:
//! - Semantic search fetches `15 × 3` candidates (only dedup thins them)
//! - Hybrid search fetches `15 × 20` and keeps only candidates containing
//!   every detected keyword
//!
//! The final list keeps first-seen order after dedup; it is not re-sorted by
//! score.

mod filter;

pub use filter::{dedup_by_case, filter_by_keywords};

use crate::embeddings::Embedder;
use crate::index::{IndexHit, VectorIndex};
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Number of unique cases handed to the synthesizer
pub const TARGET_CASES: usize = 15;

/// Over-fetch multiplier for plain semantic search
pub const SEMANTIC_OVERFETCH: usize = 3;

/// Over-fetch multiplier for keyword-filtered search
pub const HYBRID_OVERFETCH: usize = 20;

/// Search strategy for a legal query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Vector similarity only
    Semantic,
    /// Vector similarity plus mandatory keyword match
    Hybrid,
}

impl SearchType {
    /// Hybrid when any keyword was detected
    pub fn for_keywords(keywords: &[String]) -> Self {
        if keywords.is_empty() {
            SearchType::Semantic
        } else {
            SearchType::Hybrid
        }
    }

    /// Candidates to request from the index
    pub fn fetch_limit(self) -> usize {
        match self {
            SearchType::Semantic => TARGET_CASES * SEMANTIC_OVERFETCH,
            SearchType::Hybrid => TARGET_CASES * HYBRID_OVERFETCH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Semantic => "semantic",
            SearchType::Hybrid => "hybrid",
        }
    }
}

/// Retrieves unique, relevant cases for a question
pub struct CaseRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl CaseRetriever {
    /// Create a new case retriever
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Fetch, filter, dedup and cut to [`TARGET_CASES`]
    pub async fn retrieve(
        &self,
        query: &str,
        search_type: SearchType,
        keywords: &[String],
    ) -> Result<Vec<IndexHit>> {
        let start = Instant::now();
        let limit = search_type.fetch_limit();

        let vector = self.embedder.embed(&embedding_input(query)).await?;
        let hits = self.index.query(vector, limit).await?;
        let fetched = hits.len();

        let candidates = match search_type {
            SearchType::Hybrid => filter_by_keywords(hits, keywords),
            SearchType::Semantic => hits,
        };
        let filtered = candidates.len();

        let mut cases = dedup_by_case(candidates);
        let unique = cases.len();
        cases.truncate(TARGET_CASES);

        debug!(
            search_type = search_type.as_str(),
            limit, fetched, filtered, unique, "Candidates narrowed"
        );
        info!(
            search_type = search_type.as_str(),
            keywords = ?keywords,
            cases = cases.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Cases retrieved"
        );

        Ok(cases)
    }
}

/// Embedding models treat literal newlines as content; flatten them
fn embedding_input(query: &str) -> String {
    query.replace('\n', " ")
}
