//! JurisRAG API Gateway
//!
//! HTTP front door for the legal case assistant.
//! Handles:
//! - Request validation and routing
//! - Whole-request timeouts
//! - Observability (logging, metrics, request ids)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use jurisrag_common::{config::AppConfig, metrics, telemetry, CaseAssistant};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::oneshot};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub assistant: Arc<CaseAssistant>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (reads .env first)
    let config = AppConfig::load()?;

    telemetry::init_tracing(&config.observability)?;
    info!(
        service = %config.observability.service_name,
        "Starting JurisRAG API Gateway v{}",
        jurisrag_common::VERSION
    );

    config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets(metrics::QUERY_BUCKETS)?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    let assistant = Arc::new(CaseAssistant::from_config(&config)?);

    let state = AppState {
        config: config.clone(),
        assistant,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => {
            joined??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(joined) => joined??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "In-flight requests did not drain before the shutdown timeout"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/chat", post(handlers::chat::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use jurisrag_common::{
        embeddings::MockEmbedder,
        index::{CaseRecord, IndexHit, StaticIndex},
        llm::ScriptedModel,
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(replies: &[&str], hits: Vec<IndexHit>) -> Router {
        let assistant = CaseAssistant::new(
            Arc::new(ScriptedModel::new(replies.iter().copied())),
            Arc::new(MockEmbedder::new(8)),
            Arc::new(StaticIndex::new(hits)),
            vec!["PIAR".to_string()],
        );
        create_router(AppState {
            config: Arc::new(AppConfig::default()),
            assistant: Arc::new(assistant),
        })
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(&[], vec![])
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], jurisrag_common::VERSION);
    }

    #[tokio::test]
    async fn test_casual_chat() {
        let response = app(&["casual_conversation", "¡Hola! ¿En qué te ayudo?"], vec![])
            .oneshot(chat_request(json!({ "query": "Hola, buenos días" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["response"], "¡Hola! ¿En qué te ayudo?");
        assert_eq!(body["intent"], "casual_conversation");
        assert_eq!(body["num_cases"], 0);
        assert_eq!(body["search_type"], "");
    }

    #[tokio::test]
    async fn test_legal_chat_reports_cases() {
        let hits = (0..3)
            .map(|i| IndexHit {
                score: 0.9,
                record: CaseRecord {
                    case_id: Some(i.to_string().into()),
                    synthesis: "ajustes del PIAR".to_string(),
                    ..CaseRecord::default()
                },
            })
            .collect();

        let response = app(&["legal_query", "Hay tres casos."], hits)
            .oneshot(chat_request(json!({ "query": "¿Casos sobre el PIAR?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["intent"], "legal_query");
        assert_eq!(body["search_type"], "hybrid");
        assert_eq!(body["num_cases"], 3);
        assert_eq!(body["response"], "Hay tres casos.");
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let response = app(&["legal_query"], vec![])
            .oneshot(chat_request(json!({ "query": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "query");
    }

    #[tokio::test]
    async fn test_provider_failure_is_bad_gateway() {
        let assistant = CaseAssistant::new(
            Arc::new(ScriptedModel::failing()),
            Arc::new(MockEmbedder::new(8)),
            Arc::new(StaticIndex::new(vec![])),
            vec![],
        );
        let router = create_router(AppState {
            config: Arc::new(AppConfig::default()),
            assistant: Arc::new(assistant),
        });

        let response = router
            .oneshot(chat_request(json!({ "query": "tutela" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_slow_pipeline_times_out() {
        let model = ScriptedModel::new(["casual_conversation"]).with_delay(Duration::from_secs(3));
        let assistant = CaseAssistant::new(
            Arc::new(model),
            Arc::new(MockEmbedder::new(8)),
            Arc::new(StaticIndex::new(vec![])),
            vec![],
        );
        let mut config = AppConfig::default();
        config.server.request_timeout_secs = 1;
        let router = create_router(AppState {
            config: Arc::new(config),
            assistant: Arc::new(assistant),
        });

        let response = router
            .oneshot(chat_request(json!({ "query": "Hola" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "TIMEOUT");
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app(&[], vec![])
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
