//! Embedding service abstraction
//!
//! Query vectors come from an OpenAI-compatible `/embeddings` endpoint
//! (text-embedding-3-small by default). `MockEmbedder` stands in for it in tests.

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder from configuration
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "OpenAI API key required for embeddings".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
        })
    }

    /// Make request with retry
    ///
    /// Only transport failures, timeouts, rate limits and 5xx responses are
    /// retried. Any other rejection (bad key, unknown model) fails at once.
    async fn request_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(failure) if !failure.retryable => return Err(failure.error),
                Err(failure) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %failure.error,
                        "Embedding request failed, retrying"
                    );
                    last_error = Some(failure.error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::EmbeddingError {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, text: &str) -> std::result::Result<Vec<f32>, RequestFailure> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAIRequest {
            input: vec![text],
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RequestFailure::retryable(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("API error {}: {}", status, body);
            return Err(if is_retryable(status) {
                RequestFailure::retryable(message)
            } else {
                RequestFailure::fatal(message)
            });
        }

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| RequestFailure::fatal(format!("Failed to parse response: {}", e)))?;

        result
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| RequestFailure::fatal("Empty response".to_string()))
    }
}

/// One failed attempt
struct RequestFailure {
    error: AppError,
    retryable: bool,
}

impl RequestFailure {
    fn retryable(message: String) -> Self {
        Self {
            error: AppError::EmbeddingError { message },
            retryable: true,
        }
    }

    fn fatal(message: String) -> Self {
        Self {
            error: AppError::EmbeddingError { message },
            retryable: false,
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let result = self.request_with_retry(text).await;
        metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock embedder for testing
///
/// Produces a deterministic vector derived from the input bytes and keeps the
/// inputs it was asked to embed.
pub struct MockEmbedder {
    dimension: usize,
    fail: bool,
    inputs: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// An embedder whose every call fails
    pub fn failing() -> Self {
        Self {
            dimension: 0,
            fail: true,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Texts received so far, in call order
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(text.to_string());
        }

        if self.fail {
            return Err(AppError::EmbeddingError {
                message: "mock embedder configured to fail".to_string(),
            });
        }

        let seed: u32 = text.bytes().map(u32::from).sum();
        Ok((0..self.dimension)
            .map(|i| ((seed as usize + i) % 97) as f32 / 97.0)
            .collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}
