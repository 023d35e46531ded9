// LLM Orchestrator — spec §4.C4.
//
// Three modes (default/fast/vision); default is stateful with an
// in-process history in the orchestrator's neutral `ChatMessage` shape
// (spec §9 "History as native format" — since every provider here is a
// thin one-shot HTTP client, the neutral shape plays the role the teacher's
// providers play with their own native history types). Fast/vision are
// one-shot `send_once`. Unconfigured fast/vision fall back to default
// (spec §4.C4 "Fallback").

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};

use super::provider::LlmProvider;
use super::retry::with_rate_limit_retry;
use super::types::{ChatMessage, ChatRequest, ChatResponse, Chunk, Role, ToolDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Default,
    Fast,
    Vision,
}

/// Orchestrator configuration: a default provider, plus optional fast/vision
/// overrides (spec §4.C4 "structurally single-mode or multi-mode").
pub struct Orchestrator {
    default_provider: Arc<dyn LlmProvider>,
    fast_provider: Option<Arc<dyn LlmProvider>>,
    vision_provider: Option<Arc<dyn LlmProvider>>,
    history: Mutex<Vec<ChatMessage>>,
}

impl Orchestrator {
    pub fn new(
        default_provider: Arc<dyn LlmProvider>,
        fast_provider: Option<Arc<dyn LlmProvider>>,
        vision_provider: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self {
            default_provider,
            fast_provider,
            vision_provider,
            history: Mutex::new(Vec::new()),
        }
    }

    fn provider_for(&self, mode: Mode) -> &Arc<dyn LlmProvider> {
        match mode {
            Mode::Default => &self.default_provider,
            Mode::Fast => self.fast_provider.as_ref().unwrap_or(&self.default_provider),
            Mode::Vision => self.vision_provider.as_ref().unwrap_or(&self.default_provider),
        }
    }

    // --- Stateful verbs (default mode) -------------------------------

    pub async fn add_user_message(&self, content: impl Into<String>) {
        self.history.lock().await.push(ChatMessage::user(content));
    }

    pub async fn add_assistant_message(&self, content: impl Into<String>) {
        self.history.lock().await.push(ChatMessage::assistant(content));
    }

    /// Represented as a user-role message referencing `tool_use_id` (spec
    /// §4.C4 "History discipline for stateful mode").
    pub async fn add_tool_result(&self, tool_use_id: &str, text: &str) {
        self.history
            .lock()
            .await
            .push(ChatMessage::user(format!("[tool_result {tool_use_id}] {text}")));
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// Send using the current stateful history (default mode only).
    pub async fn send(&self, tools: Option<Vec<ToolDefinition>>) -> Result<ChatResponse> {
        let messages = self.history.lock().await.clone();
        let response = self.dispatch(Mode::Default, messages, tools, Vec::new()).await?;

        if !response.content.is_empty() {
            self.add_assistant_message(response.content.clone()).await;
        }
        Ok(response)
    }

    /// Spec §4.C4 stateful `stream(tools?) -> iter<Chunk>`. Uses the same
    /// history `send` would, but does not append the streamed reply back
    /// into history automatically — the caller accumulates `TextDelta`s and
    /// calls `add_assistant_message` once `Done` arrives, the same way it
    /// would record a tool result.
    pub async fn stream(&self, tools: Option<Vec<ToolDefinition>>) -> Result<mpsc::Receiver<Result<Chunk>>> {
        let messages = self.history.lock().await.clone();
        self.stream_dispatch(Mode::Default, messages, tools).await
    }

    // --- Stateless verb (fast / vision modes) ------------------------

    /// One-shot send for a given mode; does not touch the stateful history.
    pub async fn send_once(
        &self,
        mode: Mode,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<ChatResponse> {
        self.dispatch(mode, messages, tools, Vec::new()).await
    }

    /// Like `send_once`, but with base64 images attached (used by the VLM
    /// adapter in vision mode).
    pub async fn send_once_with_images(
        &self,
        mode: Mode,
        messages: Vec<ChatMessage>,
        images: Vec<String>,
    ) -> Result<ChatResponse> {
        self.dispatch(mode, messages, None, images).await
    }

    /// Matches the external interface `sendWithMode(mode, messages, tools?)`
    /// consumed by the Brain (spec §6).
    pub async fn send_with_mode(
        &self,
        mode: Mode,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<ChatResponse> {
        self.dispatch(mode, messages, tools, Vec::new()).await
    }

    async fn dispatch(
        &self,
        mode: Mode,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        images: Vec<String>,
    ) -> Result<ChatResponse> {
        let provider = self.provider_for(mode);

        let tools = match &tools {
            Some(_) if !provider.supports_tools() => {
                tracing::warn!(
                    "provider {:?} does not support tool calling; ignoring tools for this request",
                    provider.name()
                );
                None
            }
            other => other.clone(),
        };

        let mut request = ChatRequest::new(messages).with_model(provider.default_model().to_string());
        if let Some(tools) = tools {
            request = request.with_tools(tools);
        }
        if !images.is_empty() {
            request = request.with_images(images);
        }

        with_rate_limit_retry(|| provider.send_once(&request)).await
    }

    /// Builds the request the same way `dispatch` does, then either streams
    /// for real or — when `provider.supports_streaming()` is false —
    /// synthesizes a two-chunk stream (`TextDelta` then `Done`) from a
    /// single `send_once`, logging the narrowing (spec §9 "the orchestrator
    /// surfaces a warning, never silently drops ... without logging").
    async fn stream_dispatch(
        &self,
        mode: Mode,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<mpsc::Receiver<Result<Chunk>>> {
        let provider = self.provider_for(mode);

        let tools = match &tools {
            Some(_) if !provider.supports_tools() => {
                tracing::warn!(
                    "provider {:?} does not support tool calling; ignoring tools for this request",
                    provider.name()
                );
                None
            }
            other => other.clone(),
        };

        let mut request = ChatRequest::new(messages).with_model(provider.default_model().to_string());
        if let Some(tools) = tools {
            request = request.with_tools(tools);
        }

        if !provider.supports_streaming() {
            tracing::warn!(
                "provider {:?} does not support streaming; emitting its full response as a single chunk",
                provider.name()
            );
            let response = with_rate_limit_retry(|| provider.send_once(&request)).await?;
            let (tx, rx) = mpsc::channel(2);
            let _ = tx.send(Ok(Chunk::TextDelta(response.content))).await;
            let _ = tx
                .send(Ok(Chunk::Done {
                    stop_reason: response.stop_reason,
                    usage: response.usage,
                }))
                .await;
            return Ok(rx);
        }

        with_rate_limit_retry(|| provider.stream_once(&request)).await
    }
}
