//! Chat handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use jurisrag_common::{
    errors::{AppError, Result},
    QueryState,
};

/// Chat request
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub query: String,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub intent: String,
    pub num_cases: usize,
    /// `semantic`, `hybrid`, or empty for small talk
    pub search_type: String,
}

impl From<QueryState> for ChatResponse {
    fn from(state: QueryState) -> Self {
        Self {
            intent: state.intent_label().to_string(),
            search_type: state.search_type_label().to_string(),
            num_cases: state.cases.len(),
            response: state.response,
        }
    }
}

/// Answer one question
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let start = Instant::now();
    let timeout = state.config.request_timeout();

    let result = tokio::time::timeout(timeout, state.assistant.run(&request.query))
        .await
        .map_err(|_| AppError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        })??;

    tracing::info!(
        intent = result.intent_label(),
        num_cases = result.cases.len(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Chat request served"
    );

    Ok(Json(ChatResponse::from(result)))
}
