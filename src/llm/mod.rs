// LLM Orchestrator + VLM Adapter — spec §4.C3, §4.C4.

pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod types;
pub mod vlm;

pub use orchestrator::{Mode, Orchestrator};
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Role, StopReason, ToolCall, ToolDefinition, Usage};
