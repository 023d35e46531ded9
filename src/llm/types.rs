// Unified request/response types for multi-provider LLM support — spec
// §4.C4 "Response shape".
//
// Grounded on the teacher's `providers/types.rs` (`ProviderRequest` /
// `ProviderResponse` builder pattern); generalized from Claude's content-block
// shape to the orchestrator's simpler `{content, toolCalls, stopReason,
// usage}` contract, since the spec does not require provider-native content
// blocks to leak past the orchestrator boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of conversation history, in the orchestrator's provider-neutral
/// shape. Stateful providers translate this into their own native history
/// representation (spec §9 "History as native format").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A tool definition advertised to providers that support tool calling
/// (spec §4.C4 capability matrix).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A model-requested tool invocation (spec §4.C4 response shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A request for one send — either the stateful history plus a new turn, or
/// the full message list for a stateless `sendOnce` (spec §4.C4
/// "Operations").
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u32,
    pub system: Option<String>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub temperature: Option<f32>,
    /// Base64-encoded images attached to the final user turn (vision mode).
    pub images: Vec<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: String::new(),
            max_tokens: 4096,
            system: None,
            tools: None,
            temperature: None,
            images: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// The orchestrator's unified response shape (spec §4.C4 "Response shape").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One increment of a streamed response (spec §4.C4 `stream(tools?) →
/// iter<Chunk>`). Providers parse their own wire streaming format into this
/// shape; `Done` carries the same metadata a non-streaming `ChatResponse`
/// would.
#[derive(Debug, Clone)]
pub enum Chunk {
    TextDelta(String),
    Done {
        stop_reason: StopReason,
        usage: Option<Usage>,
    },
}
