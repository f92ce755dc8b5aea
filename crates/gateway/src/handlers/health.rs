//! Health check handlers

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// Liveness check, healthy whenever the server is up
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: jurisrag_common::VERSION.to_string(),
    })
}

/// Service banner
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "JurisRAG legal case assistant".to_string(),
        version: jurisrag_common::VERSION.to_string(),
        endpoints: vec!["POST /chat".to_string(), "GET /health".to_string()],
    })
}
