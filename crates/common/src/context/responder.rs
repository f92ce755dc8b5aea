//! Small-talk replies for non-legal messages

use crate::errors::{AppError, Result};
use crate::llm::LanguageModel;
use std::sync::Arc;
use tracing::info;

/// Answers greetings, thanks and other non-legal messages without retrieval
pub struct CasualResponder {
    model: Arc<dyn LanguageModel>,
}

impl CasualResponder {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Produce a short cordial reply
    pub async fn respond(&self, query: &str) -> Result<String> {
        let reply = self
            .model
            .complete(&build_prompt(query))
            .await
            .map_err(|e| AppError::Synthesis {
                message: e.to_string(),
            })?;

        info!("Casual response generated");
        Ok(reply)
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        r#"Eres un asistente legal amable. El usuario escribió algo que NO es una consulta legal.

MENSAJE DEL USUARIO: {query}

Contesta con cordialidad y profesionalismo. Si es un saludo, devuelve el saludo. Si es un agradecimiento, agradece con amabilidad. Si es una despedida, despídete. Si pide ayuda en general, explica en pocas palabras que puedes ayudar con consultas sobre casos legales y sentencias.

Tu respuesta debe ser breve: 2 o 3 líneas como máximo."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;

    #[tokio::test]
    async fn test_reply_is_returned_verbatim() {
        let model = Arc::new(ScriptedModel::new(["¡Hola! ¿En qué te puedo ayudar?"]));
        let responder = CasualResponder::new(model.clone());

        let reply = responder.respond("Hola, buenos días").await.unwrap();

        assert_eq!(reply, "¡Hola! ¿En qué te puedo ayudar?");
        assert_eq!(model.calls(), 1);
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("MENSAJE DEL USUARIO: Hola, buenos días"));
        assert!(prompt.contains("2 o 3 líneas"));
    }

    #[tokio::test]
    async fn test_model_failure_is_synthesis_error() {
        let responder = CasualResponder::new(Arc::new(ScriptedModel::failing()));

        let err = responder.respond("gracias").await.unwrap_err();

        assert!(matches!(err, AppError::Synthesis { .. }));
    }
}
