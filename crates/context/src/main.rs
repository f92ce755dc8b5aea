//! JurisRAG one-shot runner
//!
//! Sends a single question through the case assistant and prints the answer:
//!
//! ```text
//! ask "¿Existen casos que hablan sobre el PIAR?"
//! ```

use jurisrag_common::{config::AppConfig, telemetry, CaseAssistant, VERSION};
use tracing::info;

const DEFAULT_QUERY: &str = "¿Existen casos que hablan sobre el PIAR?";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    telemetry::init_tracing(&config.observability)?;

    info!("Starting JurisRAG runner v{}", VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let query = if args.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        args.join(" ")
    };

    let assistant = CaseAssistant::from_config(&config)?;
    let state = assistant.run(&query).await?;

    println!("Pregunta: {}", state.query());
    println!("Intención: {}", state.intent_label());
    if !state.search_type_label().is_empty() {
        println!("Búsqueda: {}", state.search_type_label());
    }
    println!("Casos encontrados: {}", state.cases.len());
    println!();
    println!("{}", state.response);

    Ok(())
}
