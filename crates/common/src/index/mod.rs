//! Vector index access
//!
//! Nearest-neighbour queries against the pre-populated case collection in
//! Qdrant. Hits are converted to [`CaseRecord`] here, so the rest of the
//! pipeline never handles raw payload maps.

mod payload;

pub use payload::{CaseKey, CaseRecord};

use crate::config::IndexConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use qdrant_client::qdrant::{Query, QueryPointsBuilder};
use qdrant_client::Qdrant;
use std::sync::Mutex;
use std::time::Instant;

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    /// Similarity score (higher is closer)
    pub score: f32,

    /// Case fields stored with the point
    pub record: CaseRecord,
}

/// Nearest-neighbour search over case chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `limit` hits for `vector`, highest score first
    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<IndexHit>>;
}

/// Qdrant-backed index
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    /// Connect to Qdrant using the index configuration
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let collection = config
            .collection
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "index.collection is required".to_string(),
            })?;

        let mut builder = Qdrant::from_url(&config.url);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder.build().map_err(|e| AppError::Configuration {
            message: format!("Failed to create Qdrant client: {}", e),
        })?;

        Ok(Self { client, collection })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<IndexHit>> {
        let start = Instant::now();

        let request = QueryPointsBuilder::new(self.collection.clone())
            .query(Query::new_nearest(vector))
            .limit(limit as u64)
            .with_payload(true);

        let result = self.client.query(request).await.map_err(|e| AppError::IndexQuery {
            message: e.to_string(),
        });
        metrics::record_index_query(start.elapsed().as_secs_f64(), limit, result.is_ok());

        Ok(result?
            .result
            .into_iter()
            .map(|point| IndexHit {
                score: point.score,
                record: CaseRecord::from_payload(&point.payload),
            })
            .collect())
    }
}

/// In-memory index for tests
///
/// Returns the stored hits in the order given, cut to the requested limit, and
/// remembers every limit it was asked for.
pub struct StaticIndex {
    hits: Vec<IndexHit>,
    fail: bool,
    limits: Mutex<Vec<usize>>,
}

impl StaticIndex {
    pub fn new(hits: Vec<IndexHit>) -> Self {
        Self {
            hits,
            fail: false,
            limits: Mutex::new(Vec::new()),
        }
    }

    /// An index whose every query fails
    pub fn failing() -> Self {
        Self {
            hits: Vec::new(),
            fail: true,
            limits: Mutex::new(Vec::new()),
        }
    }

    /// Limits requested so far, in call order
    pub fn limits(&self) -> Vec<usize> {
        self.limits.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn query(&self, _vector: Vec<f32>, limit: usize) -> Result<Vec<IndexHit>> {
        if let Ok(mut limits) = self.limits.lock() {
            limits.push(limit);
        }

        if self.fail {
            return Err(AppError::IndexQuery {
                message: "static index configured to fail".to_string(),
            });
        }

        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}
