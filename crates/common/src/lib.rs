//! JurisRAG Common Library
//!
//! Shared code for the JurisRAG binaries including:
//! - The query pipeline (classification, retrieval, synthesis)
//! - Embedding, language model and vector index clients
//! - Error types and handling
//! - Configuration management
//! - Metrics and logging setup

pub mod config;
pub mod context;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod llm;
pub mod metrics;
pub mod retrieval;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::{CaseAssistant, QueryState};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
