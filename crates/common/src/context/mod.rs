//! Conversational core
//!
//! The pieces one question passes through:
//! - Intent classification and keyword detection
//! - Small-talk replies
//! - Case-grounded answer synthesis
//! - The pipeline that routes between them

mod classifier;
mod pipeline;
mod responder;
mod synthesizer;

pub use classifier::{Classification, Intent, IntentClassifier};
pub use pipeline::{CaseAssistant, QueryState};
pub use responder::CasualResponder;
pub use synthesizer::{build_context, Synthesizer, NO_CASES_RESPONSE};
