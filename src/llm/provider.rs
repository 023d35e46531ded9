// LlmProvider trait — spec §4.C4 "Capability matrix", §9 "LLM provider
// dispatch".
//
// Grounded on the teacher's `providers::LlmProvider` trait (`providers/mod.rs`),
// generalized to the orchestrator's stateless `send_once` contract (stateful
// history lives one level up, in `orchestrator::Orchestrator`, per spec §9
// "History as native format": each provider would own its native history
// shape, but since this crate's providers are all one-shot HTTP calls, the
// neutral `ChatRequest` plays that role directly).

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{ChatRequest, ChatResponse, Chunk};

/// A single LLM backend. Implementations are one-shot: the orchestrator is
/// responsible for assembling `messages` from stateful history when needed.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a fully-assembled request and return a unified response.
    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Spec §4.C4 "stream(tools?) → iter<Chunk>". Spawns a task that parses
    /// this provider's wire streaming format and forwards parsed chunks
    /// through the returned channel; the channel closes when the stream
    /// ends or a mid-stream error occurs. Called only when
    /// `supports_streaming()` is true — the orchestrator synthesizes a
    /// single-chunk stream from `send_once` otherwise.
    async fn stream_once(&self, request: &ChatRequest) -> Result<mpsc::Receiver<Result<Chunk>>>;

    fn name(&self) -> &str;

    fn default_model(&self) -> &str;

    /// Spec §4.C4 capability matrix: providers that return `false` here MUST
    /// have any `tools` on the request ignored with a logged warning rather
    /// than silently dropped (spec §9).
    fn supports_tools(&self) -> bool {
        true
    }

    fn supports_images(&self) -> bool {
        true
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}
