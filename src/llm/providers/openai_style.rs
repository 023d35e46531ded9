// native-OpenAI-style provider — spec §4.C4 capability matrix row 2
// (tool calling: yes, images: yes, stream: yes; "function-call naming").
//
// Grounded on the teacher's `providers::openai::OpenAIProvider` (same
// request/response shape covers OpenAI, Grok, Mistral, Groq — all
// OpenAI-compatible chat-completions APIs); streaming loop mirrors its
// `send_message_stream_once` SSE line-buffering.

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

const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiStyleProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    provider_name: String,
}

impl OpenAiStyleProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: Option<String>,
        provider_name: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: default_model.unwrap_or_else(|| "gpt-4o".to_string()),
            provider_name: provider_name.into(),
        })
    }

    fn to_wire_request(&self, request: &ChatRequest) -> WireRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: WireContent::Text(system.clone()),
            });
        }
        for m in &request.messages {
            messages.push(WireMessage {
                role: match m.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: WireContent::Text(m.content.clone()),
            });
        }

        if !request.images.is_empty() {
            if let Some(last) = messages.iter_mut().rev().find(|m| m.role == "user") {
                let text = match &last.content {
                    WireContent::Text(t) => t.clone(),
                    WireContent::Blocks(_) => String::new(),
                };
                let mut blocks = vec![WireBlock::Text { text }];
                blocks.extend(request.images.iter().map(|img| WireBlock::ImageUrl {
                    image_url: WireImageUrl {
                        url: format!("data:image/png;base64,{img}"),
                    },
                }));
                last.content = WireContent::Blocks(blocks);
            }
        }

        let tools = request.tools.as_ref().map(|defs| {
            defs.iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect()
        });

        WireRequest {
            model,
            max_tokens: request.max_tokens,
            messages,
            tools,
            stream: false,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiStyleProvider {
    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let wire = self.to_wire_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await
            .with_context(|| format!("failed to send request to {}", self.provider_name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} request failed\n\nStatus: {status}\nBody: {body}", self.provider_name);
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .with_context(|| format!("failed to parse {} response", self.provider_name))?;

        wire_response.into_chat_response()
    }

    async fn stream_once(&self, request: &ChatRequest) -> Result<mpsc::Receiver<Result<Chunk>>> {
        let (tx, rx) = mpsc::channel(100);

        let mut wire = self.to_wire_request(request);
        wire.stream = true;

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await
            .with_context(|| format!("failed to send streaming request to {}", self.provider_name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} streaming request failed\n\nStatus: {status}\nBody: {body}", self.provider_name);
        }

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = Vec::new();
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

                            if json_str == "[DONE]" {
                                done = true;
                                break;
                            }

                            if let Ok(stream_chunk) = serde_json::from_str::<WireStreamChunk>(json_str) {
                                if let Some(choice) = stream_chunk.choices.into_iter().next() {
                                    if let Some(content) = choice.delta.content {
                                        if tx.send(Ok(Chunk::TextDelta(content))).await.is_err() {
                                            done = true;
                                            break;
                                        }
                                    }
                                    if choice.finish_reason.is_some() {
                                        let stop_reason = match choice.finish_reason.as_deref() {
                                            Some("tool_calls") => StopReason::ToolUse,
                                            Some("length") => StopReason::MaxTokens,
                                            _ => StopReason::EndTurn,
                                        };
                                        let _ = tx
                                            .send(Ok(Chunk::Done {
                                                stop_reason,
                                                usage: None,
                                            }))
                                            .await;
                                        done = true;
                                        break;
                                    }
                                }
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
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// `{"type":"text",...}` / `{"type":"image_url",...}` content parts (vision
/// requests); plain string bodies otherwise (`#[serde(untagged)]`).
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
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct WireImageUrl {
    url: String,
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
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct WireToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireToolCallFunction,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

impl WireResponse {
    fn into_chat_response(self) -> Result<ChatResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .context("provider returned no choices")?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let input = serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null);
                ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    input,
                }
            })
            .collect::<Vec<_>>();

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            Some("stop") | None => StopReason::EndTurn,
            _ => StopReason::EndTurn,
        };

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason,
            usage: self.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WireStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireStreamChoice {
    delta: WireStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireStreamChunk {
    choices: Vec<WireStreamChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_becomes_leading_system_message() {
        let p = OpenAiStyleProvider::new("k".to_string(), None, None, "openai").unwrap();
        let req = ChatRequest::new(vec![]).with_system("be terse");
        let wire = p.to_wire_request(&req);
        assert_eq!(wire.messages[0].role, "system");
        assert!(matches!(&wire.messages[0].content, WireContent::Text(t) if t == "be terse"));
    }

    #[test]
    fn images_become_content_blocks_on_the_last_user_message() {
        let p = OpenAiStyleProvider::new("k".to_string(), None, None, "openai").unwrap();
        let req = ChatRequest::new(vec![crate::llm::types::ChatMessage::user("look at this")])
            .with_images(vec!["cGl4ZWxz".to_string()]);
        let wire = p.to_wire_request(&req);
        match &wire.messages.last().unwrap().content {
            WireContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                assert!(matches!(&blocks[0], WireBlock::Text { text } if text == "look at this"));
                match &blocks[1] {
                    WireBlock::ImageUrl { image_url } => {
                        assert_eq!(image_url.url, "data:image/png;base64,cGl4ZWxz");
                    }
                    _ => panic!("expected image_url block"),
                }
            }
            WireContent::Text(_) => panic!("expected blocks content after attaching an image"),
        }
    }

    #[test]
    fn stream_flag_defaults_to_false() {
        let p = OpenAiStyleProvider::new("k".to_string(), None, None, "openai").unwrap();
        let wire = p.to_wire_request(&ChatRequest::new(vec![]));
        assert!(!wire.stream);
    }
}
