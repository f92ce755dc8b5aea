//! Intent classifier - routes a question to case lookup or small talk
//!
//! Provides:
//! - LLM-based intent labelling with a fail-safe toward legal lookup
//! - Domain keyword detection that switches retrieval to hybrid search

use crate::errors::{AppError, Result};
use crate::llm::LanguageModel;
use crate::retrieval::SearchType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// What the user is asking for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// A question about cases, rulings, tutelas or any legal topic
    LegalQuery,
    /// Greetings, thanks, farewells and other small talk
    CasualConversation,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::LegalQuery => "legal_query",
            Intent::CasualConversation => "casual_conversation",
        }
    }

    /// Normalize a free-text model reply into an intent
    ///
    /// Anything that mentions neither label is treated as legal, so an odd
    /// reply still leads to a case search.
    pub fn from_label(reply: &str) -> Self {
        let reply = reply.trim().to_lowercase();
        if reply.contains("legal") {
            Intent::LegalQuery
        } else if reply.contains("casual") || reply.contains("conversation") {
            Intent::CasualConversation
        } else {
            Intent::LegalQuery
        }
    }
}

/// Classifier output
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,

    /// Uppercase domain terms found in the question (legal intent only)
    pub keywords_detected: Vec<String>,

    /// `None` on the casual path
    pub search_type: Option<SearchType>,
}

/// Labels questions and picks the search strategy
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
    keywords: Vec<String>,
}

impl IntentClassifier {
    /// Create a classifier that watches for the given domain keywords
    pub fn new(model: Arc<dyn LanguageModel>, keywords: Vec<String>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self { model, keywords }
    }

    /// Classify a question with one model call
    pub async fn classify(&self, query: &str) -> Result<Classification> {
        let reply = self
            .model
            .complete(&self.build_prompt(query))
            .await
            .map_err(|e| AppError::Classification {
                message: e.to_string(),
            })?;

        let intent = Intent::from_label(&reply);
        info!(intent = intent.as_str(), "Intent detected");

        let classification = match intent {
            Intent::LegalQuery => {
                let keywords_detected = self.detect_keywords(query);
                let search_type = SearchType::for_keywords(&keywords_detected);
                info!(
                    search_type = search_type.as_str(),
                    keywords = ?keywords_detected,
                    "Legal query analysed"
                );
                Classification {
                    intent,
                    keywords_detected,
                    search_type: Some(search_type),
                }
            }
            Intent::CasualConversation => Classification {
                intent,
                keywords_detected: Vec::new(),
                search_type: None,
            },
        };

        Ok(classification)
    }

    /// Configured keywords present in the query, in configuration order
    pub fn detect_keywords(&self, query: &str) -> Vec<String> {
        let query = query.to_uppercase();
        self.keywords
            .iter()
            .filter(|k| query.contains(k.as_str()))
            .cloned()
            .collect()
    }

    fn build_prompt(&self, query: &str) -> String {
        let mut topics = String::from("casos legales, sentencias, demandas, tutelas");
        for keyword in &self.keywords {
            topics.push_str(", ");
            topics.push_str(keyword);
        }

        format!(
            r#"Clasifica la consulta del usuario en una de estas dos categorías:

1. "legal_query": preguntas sobre {topics} o cualquier otro tema jurídico
2. "casual_conversation": saludos, agradecimientos, despedidas o conversación general

CONSULTA: {query}

Responde únicamente "legal_query" o "casual_conversation", sin ninguna explicación."#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;

    fn classifier(reply: &str) -> (IntentClassifier, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new([reply]));
        (IntentClassifier::new(model.clone(), vec!["piar".to_string()]), model)
    }

    #[test]
    fn test_label_normalization() {
        assert_eq!(Intent::from_label("legal_query"), Intent::LegalQuery);
        assert_eq!(Intent::from_label("  LEGAL_QUERY\n"), Intent::LegalQuery);
        assert_eq!(Intent::from_label("casual_conversation"), Intent::CasualConversation);
        assert_eq!(Intent::from_label("\"Casual\""), Intent::CasualConversation);
        assert_eq!(Intent::from_label("conversation"), Intent::CasualConversation);
    }

    #[test]
    fn test_ambiguous_label_defaults_to_legal() {
        for reply in ["", "no sé", "saludo", "42", "categoría 2"] {
            assert_eq!(Intent::from_label(reply), Intent::LegalQuery, "reply {:?}", reply);
        }
    }

    #[tokio::test]
    async fn test_piar_query_is_hybrid() {
        let (classifier, model) = classifier("legal_query");

        let result = classifier
            .classify("¿Existen casos que hablan sobre el PIAR?")
            .await
            .unwrap();

        assert_eq!(result.intent, Intent::LegalQuery);
        assert_eq!(result.keywords_detected, vec!["PIAR".to_string()]);
        assert_eq!(result.search_type, Some(SearchType::Hybrid));
        assert_eq!(model.calls(), 1);
        assert!(model.prompts()[0].contains("¿Existen casos que hablan sobre el PIAR?"));
    }

    #[tokio::test]
    async fn test_keyword_match_is_case_insensitive() {
        let (classifier, _) = classifier("legal_query");

        let result = classifier.classify("qué dice la corte del piar").await.unwrap();

        assert_eq!(result.keywords_detected, vec!["PIAR".to_string()]);
    }

    #[tokio::test]
    async fn test_legal_without_keywords_is_semantic() {
        let (classifier, _) = classifier("legal_query");

        let result = classifier.classify("tutela por derecho a la salud").await.unwrap();

        assert!(result.keywords_detected.is_empty());
        assert_eq!(result.search_type, Some(SearchType::Semantic));
    }

    #[tokio::test]
    async fn test_casual_clears_keywords() {
        let (classifier, _) = classifier("casual_conversation");

        // mentions PIAR, but casual intent never carries keywords
        let result = classifier.classify("gracias por lo del PIAR").await.unwrap();

        assert_eq!(result.intent, Intent::CasualConversation);
        assert!(result.keywords_detected.is_empty());
        assert_eq!(result.search_type, None);
    }

    #[tokio::test]
    async fn test_malformed_reply_searches() {
        let (classifier, _) = classifier("No estoy seguro");

        let result = classifier.classify("Hola").await.unwrap();

        assert_eq!(result.intent, Intent::LegalQuery);
        assert_eq!(result.search_type, Some(SearchType::Semantic));
    }

    #[tokio::test]
    async fn test_model_failure_is_classification_error() {
        let classifier = IntentClassifier::new(Arc::new(ScriptedModel::failing()), vec![]);

        let err = classifier.classify("Hola").await.unwrap_err();

        assert!(matches!(err, AppError::Classification { .. }));
    }

    #[tokio::test]
    async fn test_prompt_lists_keywords_as_topics() {
        let (with_keywords, model) = classifier("legal_query");
        with_keywords.classify("hola").await.unwrap();
        assert!(model.prompts()[0].contains("tutelas, PIAR o cualquier otro tema jurídico"));

        let model = Arc::new(ScriptedModel::new(["legal_query"]));
        let without_keywords = IntentClassifier::new(model.clone(), vec![]);
        without_keywords.classify("hola").await.unwrap();
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("demandas, tutelas o cualquier otro tema jurídico"));
        assert!(!prompt.contains(",  o"));
    }

    #[test]
    fn test_keywords_reported_in_configured_order() {
        let classifier = IntentClassifier::new(
            Arc::new(ScriptedModel::new(["legal_query"])),
            vec!["piar".into(), " ".into(), "Dbu".into()],
        );

        assert_eq!(
            classifier.detect_keywords("el DBU y el PIAR"),
            vec!["PIAR".to_string(), "DBU".to_string()]
        );
    }
}
