// navbrain demo binary — wires one Brain and runs a single `navigate_to`.
//
// Not part of the library surface: CLI/env parsing is an external
// collaborator's job (spec §1 Out of scope). This reads the one variable the
// demo actually needs.

use std::sync::Arc;

use anyhow::{Context, Result};

use navbrain::action_executor::UnavailableInputBackend;
#[cfg(target_os = "macos")]
use navbrain::action_executor::macos::MacosInputBackend;
use navbrain::action_executor::InputBackend;
use navbrain::config::BrainConfig;
use navbrain::llm::orchestrator::Orchestrator;
use navbrain::llm::providers::AnthropicStyleProvider;
use navbrain::logging::init_tracing;
use navbrain::perception::{SystemCapture, UnavailableOcr};
#[cfg(feature = "ocr")]
use navbrain::perception::ocr::uni_ocr_backend::UniOcrBackend;
use navbrain::BrainController;

#[cfg(target_os = "macos")]
fn input_backend() -> Result<Arc<dyn InputBackend>> {
    Ok(Arc::new(MacosInputBackend::new()?))
}

#[cfg(not(target_os = "macos"))]
fn input_backend() -> Result<Arc<dyn InputBackend>> {
    Ok(Arc::new(UnavailableInputBackend))
}

#[cfg(feature = "ocr")]
fn ocr_backend() -> Arc<dyn navbrain::perception::OcrBackend> {
    Arc::new(UniOcrBackend)
}

#[cfg(not(feature = "ocr"))]
fn ocr_backend() -> Arc<dyn navbrain::perception::OcrBackend> {
    Arc::new(UnavailableOcr)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Settings".to_string());

    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .context("ANTHROPIC_API_KEY must be set to run the navbrain demo")?;

    let provider = Arc::new(AnthropicStyleProvider::new(api_key, None, None)?);
    let orchestrator = Arc::new(Orchestrator::new(provider, None, None));

    let graph_path = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("navbrain")
        .join("navigation.json");

    let config = BrainConfig::new().with_graph_path(graph_path);

    let brain = BrainController::new(
        orchestrator,
        ocr_backend(),
        Arc::new(SystemCapture),
        input_backend()?,
        config,
    );

    let stats = brain.initialize().await;
    tracing::info!(node_count = stats.node_count, "navbrain initialized");

    let outcome = brain.navigate_to(&target).await;
    if outcome.success {
        println!("navigated to {target:?}: {}", outcome.message);
    } else {
        println!("navigation to {target:?} failed: {}", outcome.message);
    }

    Ok(())
}
