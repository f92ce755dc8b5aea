//! Language model client
//!
//! Single-turn chat completions against an OpenAI-compatible endpoint. Every
//! pipeline stage that needs a model goes through [`LanguageModel`], so tests
//! can swap in [`ScriptedModel`].

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Single-turn text completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one user prompt and return the reply text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI chat completions client
pub struct OpenAIChat {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIChat {
    /// Create a new chat client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "OpenAI API key required for chat completions".to_string(),
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
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    async fn call(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal {
                message: format!("LLM API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| AppError::Internal {
            message: format!("Failed to parse LLM response: {}", e),
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Internal {
                message: "Empty response from LLM".to_string(),
            })
    }
}

#[async_trait]
impl LanguageModel for OpenAIChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let result = self.call(prompt).await;
        metrics::record_llm(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Language model double that replays queued replies
///
/// Replies are consumed in order. Once the queue is empty the fallback reply is
/// returned (or an error, for [`ScriptedModel::failing`]). Every prompt is kept.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    /// Replay `replies`, then keep answering with the last one
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies: VecDeque<String> = replies.into_iter().map(Into::into).collect();
        let fallback = replies.back().cloned();
        Self {
            replies: Mutex::new(replies),
            fallback,
            delay: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A model whose every call fails
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Wait `delay` before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        queued.or_else(|| self.fallback.clone()).ok_or_else(|| AppError::Internal {
            message: "scripted model has no reply".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(["legal_query", "respuesta"]);

        assert_eq!(model.complete("a").await.unwrap(), "legal_query");
        assert_eq!(model.complete("b").await.unwrap(), "respuesta");
        // queue exhausted: last reply repeats
        assert_eq!(model.complete("c").await.unwrap(), "respuesta");
        assert_eq!(model.calls(), 3);
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delayed_model_waits() {
        let model = ScriptedModel::new(["ok"]).with_delay(Duration::from_millis(50));
        let start = Instant::now();

        assert_eq!(model.complete("a").await.unwrap(), "ok");
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_failing_model() {
        let model = ScriptedModel::failing();
        assert!(model.complete("hola").await.is_err());
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn test_chat_client_endpoint() {
        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            api_base: "https://example.test/v1/".into(),
            ..LlmConfig::default()
        };
        let chat = OpenAIChat::new(&config).unwrap();
        assert_eq!(chat.endpoint, "https://example.test/v1/chat/completions");
        assert_eq!(chat.model_name(), "gpt-4.1-mini");
    }

    #[test]
    fn test_chat_client_requires_key() {
        assert!(OpenAIChat::new(&LlmConfig::default()).is_err());
    }
}
