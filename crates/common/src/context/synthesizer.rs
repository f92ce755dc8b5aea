//! Legal answer synthesizer - turns retrieved cases into a plain-language reply
//!
//! Provides:
//! - A numbered context block, one section per case
//! - A colloquial-answer prompt grounded in that block
//! - A fixed fallback, without any model call, when nothing was retrieved

use crate::errors::{AppError, Result};
use crate::index::IndexHit;
use crate::llm::LanguageModel;
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

/// Reply used when retrieval produced no cases
pub const NO_CASES_RESPONSE: &str =
    "No encontré casos relevantes para tu consulta. ¿Podrías reformular tu pregunta?";

/// Synthesizer for answers grounded in retrieved cases
pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    /// Create a new synthesizer
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Answer `question` from `cases`; returns the model reply unchanged
    pub async fn synthesize(&self, question: &str, cases: &[IndexHit]) -> Result<String> {
        if cases.is_empty() {
            info!("No cases retrieved, returning fallback response");
            return Ok(NO_CASES_RESPONSE.to_string());
        }

        let context = build_context(cases);
        let prompt = build_prompt(question, &context);

        let answer = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| AppError::Synthesis {
                message: e.to_string(),
            })?;

        info!(cases = cases.len(), "Legal response generated");
        Ok(answer)
    }
}

/// Render the cases as numbered sections; empty fields keep their label
pub fn build_context(cases: &[IndexHit]) -> String {
    let mut context = String::from("CASOS LEGALES RELEVANTES:\n\n");

    for (i, case) in cases.iter().enumerate() {
        let record = &case.record;
        // writing to a String cannot fail
        let _ = write!(
            context,
            "--- CASO {} ---\nProvidencia: {}\nTema: {}\nSíntesis: {}\nSentencia: {}\n\n",
            i + 1,
            record.providencia,
            record.topic,
            record.synthesis,
            record.ruling
        );
    }

    context
}

fn build_prompt(question: &str, context: &str) -> String {
    format!(
        r#"Eres un asesor legal. Responde en lenguaje coloquial.

PREGUNTA: {question}

{context}

INSTRUCCIONES:
- Usa lenguaje coloquial, como si le explicaras a un amigo que NO sabe de leyes
- Evita los términos jurídicos complicados o explícalos de forma muy sencilla
- Si hay varios casos, resúmelos de forma clara y ordenada
- Si preguntan por sentencias, explica en palabras simples qué se decidió
- Si los casos NO tienen información relevante para alguna parte de la pregunta, dilo claramente
- Sé preciso pero fácil de entender
- Usa ejemplos o analogías cuando ayuden a aclarar

RESPUESTA:"#
    )
}
