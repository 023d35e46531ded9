// native-Anthropic-style provider — spec §4.C4 capability matrix row 1
// (tool calling: yes, images: yes, stream: yes; "canonical").
//
// Grounded on the teacher's `claude::client::ClaudeClient` (request shape,
// headers, timeout) generalized to the neutral `ChatRequest`/`ChatResponse`;
// the streaming loop adapts the teacher's OpenAI/Gemini providers' SSE
// line-buffering idiom (`providers/openai.rs`) to Anthropic's own
// `content_block_delta`/`message_delta`/`message_stop` event shape.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatRequest, ChatResponse, Chunk, Role, StopReason, ToolCall, Usage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct AnthropicStyleProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl AnthropicStyleProvider {
    pub fn new(api_key: String, base_url: Option<String>, default_model: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: default_model.unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
        })
    }

    fn to_wire_request(&self, request: &ChatRequest) -> WireRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let mut messages: Vec<WireMessage> = request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: WireContent::Text(m.content.clone()),
            })
            .collect();

        if !request.images.is_empty() {
            if let Some(last) = messages.iter_mut().rev().find(|m| m.role == "user") {
                let text = match &last.content {
                    WireContent::Text(t) => t.clone(),
                    WireContent::Blocks(_) => String::new(),
                };
                let mut blocks = vec![WireBlock::Text { text }];
                blocks.extend(request.images.iter().map(|img| WireBlock::Image {
                    source: WireImageSource {
                        source_type: "base64".to_string(),
                        media_type: "image/png".to_string(),
                        data: img.clone(),
                    },
                }));
                last.content = WireContent::Blocks(blocks);
            }
        }

        WireRequest {
            model,
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            messages,
            stream: false,
            tools: request.tools.clone().map(|defs| {
                defs.into_iter()
                    .map(|t| {
                        serde_json::json!({
                            "name": t.name,
                            "description": t.description,
                            "input_schema": t.input_schema,
                        })
                    })
                    .collect()
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicStyleProvider {
    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let wire = self.to_wire_request(request);

        tracing::debug!("sending request to anthropic-style provider: {:?}", wire.model);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&wire)
            .send()
            .await
            .context("failed to send request to anthropic-style provider")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("anthropic-style request failed\n\nStatus: {status}\nBody: {body}");
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .context("failed to parse anthropic-style response")?;

        Ok(wire_response.into_chat_response())
    }

    async fn stream_once(&self, request: &ChatRequest) -> Result<mpsc::Receiver<Result<Chunk>>> {
        let (tx, rx) = mpsc::channel(100);

        let mut wire = self.to_wire_request(request);
        wire.stream = true;

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&wire)
            .send()
            .await
            .context("failed to send streaming request to anthropic-style provider")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("anthropic-style streaming request failed\n\nStatus: {status}\nBody: {body}");
        }

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = Vec::new();
            let mut output_tokens = 0u32;
            let mut done = false;

            while let Some(chunk) = stream.next().await {
                if done {
                    break;
                }
                match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                            let line = String::from_utf8_lossy(&line_bytes);

                            let Some(json_str) = line.strip_prefix("data: ") else { continue };
                            let json_str = json_str.trim();
                            if json_str.is_empty() {
                                continue;
                            }

                            let Ok(event) = serde_json::from_str::<WireStreamEvent>(json_str) else { continue };

                            match event.event_type.as_str() {
                                "content_block_delta" => {
                                    if let Some(text) = event.delta.as_ref().and_then(|d| d.text.clone()) {
                                        if tx.send(Ok(Chunk::TextDelta(text))).await.is_err() {
                                            done = true;
                                            break;
                                        }
                                    }
                                }
                                "message_delta" => {
                                    if let Some(tokens) = event.usage.as_ref().and_then(|u| u.output_tokens) {
                                        output_tokens = tokens;
                                    }
                                    if let Some(reason) = event.delta.as_ref().and_then(|d| d.stop_reason.clone()) {
                                        let stop_reason = match reason.as_str() {
                                            "tool_use" => StopReason::ToolUse,
                                            "max_tokens" => StopReason::MaxTokens,
                                            "stop_sequence" => StopReason::StopSequence,
                                            _ => StopReason::EndTurn,
                                        };
                                        let _ = tx
                                            .send(Ok(Chunk::Done {
                                                stop_reason,
                                                usage: Some(Usage {
                                                    input_tokens: 0,
                                                    output_tokens,
                                                }),
                                            }))
                                            .await;
                                        done = true;
                                        break;
                                    }
                                }
                                "message_stop" => {
                                    done = true;
                                    break;
                                }
                                _ => {}
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("stream error: {e}");
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "anthropic-style"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// `{"type":"image","source":{...}}` content blocks (vision requests);
/// plain string bodies otherwise (`#[serde(untagged)]`).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Blocks(Vec<WireBlock>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text { text: String },
    Image { source: WireImageSource },
}

#[derive(Debug, Clone, Serialize)]
struct WireImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: WireContent,
}

#[derive(Debug, Clone, Serialize)]
struct WireRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    input: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    content: Vec<WireContentBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

impl WireResponse {
    fn into_chat_response(self) -> ChatResponse {
        let content = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let tool_calls = self
            .content
            .into_iter()
            .filter(|b| b.block_type == "tool_use")
            .map(|b| ToolCall {
                id: b.id,
                name: b.name,
                input: b.input,
            })
            .collect();

        let stop_reason = match self.stop_reason.as_deref() {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        ChatResponse {
            content,
            tool_calls,
            stop_reason,
            usage: self.usage.map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WireStreamDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireStreamUsage {
    #[serde(default)]
    output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<WireStreamDelta>,
    #[serde(default)]
    usage: Option<WireStreamUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_creation_succeeds() {
        let p = AnthropicStyleProvider::new("test-key".to_string(), None, None);
        assert!(p.is_ok());
    }

    #[test]
    fn default_model_is_used_when_request_model_is_empty() {
        let p = AnthropicStyleProvider::new("k".to_string(), None, None).unwrap();
        let req = ChatRequest::new(vec![]);
        let wire = p.to_wire_request(&req);
        assert_eq!(wire.model, p.default_model);
    }

    #[test]
    fn images_become_a_base64_source_block_on_the_last_user_message() {
        let p = AnthropicStyleProvider::new("k".to_string(), None, None).unwrap();
        let req = ChatRequest::new(vec![crate::llm::types::ChatMessage::user("what's on screen?")])
            .with_images(vec!["cGl4ZWxz".to_string()]);
        let wire = p.to_wire_request(&req);
        match &wire.messages.last().unwrap().content {
            WireContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                match &blocks[1] {
                    WireBlock::Image { source } => {
                        assert_eq!(source.source_type, "base64");
                        assert_eq!(source.media_type, "image/png");
                        assert_eq!(source.data, "cGl4ZWxz");
                    }
                    _ => panic!("expected image block"),
                }
            }
            WireContent::Text(_) => panic!("expected blocks content after attaching an image"),
        }
    }

    #[test]
    fn non_streaming_request_sets_stream_false() {
        let p = AnthropicStyleProvider::new("k".to_string(), None, None).unwrap();
        let wire = p.to_wire_request(&ChatRequest::new(vec![]));
        assert!(!wire.stream);
    }
}
