//! Query pipeline: classify, then either retrieve + synthesize or chat
//!
//! Each call to [`CaseAssistant::run`] builds a fresh [`QueryState`] and walks
//! it through one of two paths:
//!
//! ```text
//! classify ─┬─ legal_query ─────────▶ retrieve ─▶ synthesize ─▶ done
//!           └─ casual_conversation ─▶ respond_casual ─────────▶ done
//! ```

use super::classifier::{Intent, IntentClassifier};
use super::responder::CasualResponder;
use super::synthesizer::Synthesizer;
use crate::config::AppConfig;
use crate::embeddings::{Embedder, OpenAIEmbedder};
use crate::errors::Result;
use crate::index::{IndexHit, QdrantIndex, VectorIndex};
use crate::llm::{LanguageModel, OpenAIChat};
use crate::metrics;
use crate::retrieval::{CaseRetriever, SearchType};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// State threaded through one pipeline run
#[derive(Debug, Clone)]
pub struct QueryState {
    query: String,

    /// Unset until classification runs
    pub intent: Option<Intent>,

    /// Non-empty only for hybrid legal queries
    pub keywords_detected: Vec<String>,

    /// `None` on the casual path
    pub search_type: Option<SearchType>,

    /// Retrieved cases; always empty on the casual path
    pub cases: Vec<IndexHit>,

    pub response: String,
}

impl QueryState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            intent: None,
            keywords_detected: Vec::new(),
            search_type: None,
            cases: Vec::new(),
            response: String::new(),
        }
    }

    /// The question as received
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Intent label, empty before classification
    pub fn intent_label(&self) -> &'static str {
        self.intent.map(Intent::as_str).unwrap_or("")
    }

    /// `semantic`, `hybrid`, or empty on the casual path
    pub fn search_type_label(&self) -> &'static str {
        self.search_type.map(SearchType::as_str).unwrap_or("")
    }
}

/// The legal case assistant
pub struct CaseAssistant {
    classifier: IntentClassifier,
    retriever: CaseRetriever,
    casual: CasualResponder,
    synthesizer: Synthesizer,
}

impl CaseAssistant {
    /// Wire the pipeline from already-built clients
    pub fn new(
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone(), keywords),
            retriever: CaseRetriever::new(embedder, index),
            casual: CasualResponder::new(model.clone()),
            synthesizer: Synthesizer::new(model),
        }
    }

    /// Build the OpenAI and Qdrant clients described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let model: Arc<dyn LanguageModel> = Arc::new(OpenAIChat::new(&config.llm)?);
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(&config.embedding)?);
        let index: Arc<dyn VectorIndex> = Arc::new(QdrantIndex::new(&config.index)?);

        info!(
            chat_model = model.model_name(),
            embedding_model = embedder.model_name(),
            collection = config.collection().unwrap_or_default(),
            "Case assistant initialized"
        );

        Ok(Self::new(model, embedder, index, config.retrieval.keywords.clone()))
    }

    /// Run one question through the pipeline
    pub async fn run(&self, query: &str) -> Result<QueryState> {
        let start = Instant::now();
        let mut state = QueryState::new(query);

        async {
            info!(query = %state.query, "Query received");

            let classification = self.classifier.classify(&state.query).await?;
            state.intent = Some(classification.intent);
            state.keywords_detected = classification.keywords_detected;
            state.search_type = classification.search_type;

            match (classification.intent, state.search_type) {
                (Intent::LegalQuery, Some(search_type)) => {
                    state.cases = self
                        .retriever
                        .retrieve(&state.query, search_type, &state.keywords_detected)
                        .await?;
                    state.response = self.synthesizer.synthesize(&state.query, &state.cases).await?;
                }
                _ => {
                    state.response = self.casual.respond(&state.query).await?;
                }
            }

            Ok::<_, crate::errors::AppError>(())
        }
        .instrument(info_span!("query_pipeline"))
        .await?;

        let elapsed = start.elapsed();
        metrics::record_query(
            elapsed.as_secs_f64(),
            state.intent_label(),
            state.search_type_label(),
            state.cases.len(),
        );
        info!(
            intent = state.intent_label(),
            search_type = state.search_type_label(),
            num_cases = state.cases.len(),
            latency_ms = elapsed.as_millis() as u64,
            "Query completed"
        );

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NO_CASES_RESPONSE;
    use crate::embeddings::MockEmbedder;
    use crate::errors::AppError;
    use crate::index::{CaseRecord, StaticIndex};
    use crate::llm::ScriptedModel;

    fn case(id: usize, score: f32, synthesis: &str) -> IndexHit {
        IndexHit {
            score,
            record: CaseRecord {
                case_id: Some(id.to_string().into()),
                providencia: format!("T-{}/2022", id),
                synthesis: synthesis.to_string(),
                ..CaseRecord::default()
            },
        }
    }

    struct Harness {
        assistant: CaseAssistant,
        model: Arc<ScriptedModel>,
        embedder: Arc<MockEmbedder>,
        index: Arc<StaticIndex>,
    }

    fn harness(replies: &[&str], hits: Vec<IndexHit>) -> Harness {
        let model = Arc::new(ScriptedModel::new(replies.iter().copied()));
        let embedder = Arc::new(MockEmbedder::new(8));
        let index = Arc::new(StaticIndex::new(hits));
        let assistant = CaseAssistant::new(
            model.clone(),
            embedder.clone(),
            index.clone(),
            vec!["PIAR".to_string()],
        );
        Harness { assistant, model, embedder, index }
    }

    #[tokio::test]
    async fn test_piar_scenario() {
        let mut hits: Vec<IndexHit> = (0..30)
            .map(|i| case(i, 0.9 - i as f32 / 100.0, "ajustes del PIAR"))
            .collect();
        hits.push(case(99, 0.99, "tutela de salud"));
        let h = harness(&["legal_query", "Sí, hay varios casos..."], hits);

        let state = h
            .assistant
            .run("¿Existen casos que hablan sobre el PIAR?")
            .await
            .unwrap();

        assert_eq!(state.intent, Some(Intent::LegalQuery));
        assert_eq!(state.keywords_detected, vec!["PIAR".to_string()]);
        assert_eq!(state.search_type_label(), "hybrid");
        assert_eq!(h.index.limits(), vec![300]);
        assert_eq!(state.cases.len(), 15);
        assert!(state
            .cases
            .iter()
            .all(|c| c.record.searchable_text().contains("PIAR")));
        assert_eq!(state.response, "Sí, hay varios casos...");
        assert_eq!(h.model.calls(), 2);
    }

    #[tokio::test]
    async fn test_greeting_scenario() {
        let h = harness(
            &["casual_conversation", "¡Buenos días! ¿En qué te ayudo?"],
            vec![case(1, 0.9, "x")],
        );

        let state = h.assistant.run("Hola, buenos días").await.unwrap();

        assert_eq!(state.intent_label(), "casual_conversation");
        assert!(state.cases.is_empty());
        assert!(state.keywords_detected.is_empty());
        assert_eq!(state.search_type_label(), "");
        assert_eq!(state.response, "¡Buenos días! ¿En qué te ayudo?");
        // no retrieval on the casual path
        assert!(h.embedder.inputs().is_empty());
        assert!(h.index.limits().is_empty());
    }

    #[tokio::test]
    async fn test_zero_hits_scenario() {
        let h = harness(&["legal_query", "no debería usarse"], vec![case(1, 0.9, "tutela")]);

        let state = h.assistant.run("casos sobre el PIAR en colegios").await.unwrap();

        assert_eq!(state.search_type_label(), "hybrid");
        assert!(state.cases.is_empty());
        assert_eq!(state.response, NO_CASES_RESPONSE);
        // classification only; the synthesizer never called the model
        assert_eq!(h.model.calls(), 1);
    }

    #[tokio::test]
    async fn test_semantic_scenario() {
        let hits = vec![case(1, 0.7, "a"), case(2, 0.9, "b"), case(1, 0.8, "c")];
        let h = harness(&["legal_query", "respuesta"], hits);

        let state = h.assistant.run("tutela por salud").await.unwrap();

        assert_eq!(state.search_type, Some(SearchType::Semantic));
        assert_eq!(h.index.limits(), vec![45]);
        assert_eq!(state.cases.len(), 2);
        assert_eq!(state.cases[0].record.synthesis, "c");
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let assistant = CaseAssistant::new(
            Arc::new(ScriptedModel::new(["legal_query"])),
            Arc::new(MockEmbedder::new(8)),
            Arc::new(StaticIndex::failing()),
            vec![],
        );

        let err = assistant.run("tutela").await.unwrap_err();

        assert!(matches!(err, AppError::IndexQuery { .. }));
    }

    #[test]
    fn test_fresh_state() {
        let state = QueryState::new("hola");
        assert_eq!(state.query(), "hola");
        assert_eq!(state.intent_label(), "");
        assert_eq!(state.search_type_label(), "");
        assert!(state.cases.is_empty());
        assert!(state.response.is_empty());
    }
}
