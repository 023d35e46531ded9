// Local HTTP (Ollama-style) provider — spec §4.C4 capability matrix row 4
// (tool calling: no; images: text-only in practice; stream: yes; no API
// key).
//
// Grounded on `examples/franruedaesq-MechOS/crates/mechos-runtime/src/llm_driver.rs`
// (an OpenAI-compatible `/v1/chat/completions` client targeting
// `http://localhost:11434`) and `mechos-cli/src/ollama.rs` (no-auth base URL
// convention). Wire shape matches `openai_style` minus the bearer token and
// tool-call fields.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatRequest, ChatResponse, Chunk, Role, StopReason};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct LocalHttpProvider {
    client: Client,
    base_url: String,
    default_model: String,
}

impl LocalHttpProvider {
    pub fn new(base_url: Option<String>, default_model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: default_model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
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
                content: system.clone(),
            });
        }
        for m in &request.messages {
            messages.push(WireMessage {
                role: match m.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            });
        }

        WireRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl LlmProvider for LocalHttpProvider {
    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if request.tools.is_some() {
            tracing::warn!("local HTTP provider does not support tool calling; ignoring tools on this request");
        }
        if !request.images.is_empty() {
            tracing::warn!("local HTTP provider is text-only in practice; dropping {} image(s)", request.images.len());
        }

        let wire = self.to_wire_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .json(&wire)
            .send()
            .await
            .with_context(|| format!("local model server unreachable at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("local HTTP request failed\n\nStatus: {status}\nBody: {body}");
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .context("failed to parse local HTTP response")?;

        wire_response.into_chat_response()
    }

    async fn stream_once(&self, request: &ChatRequest) -> Result<mpsc::Receiver<Result<Chunk>>> {
        if !request.images.is_empty() {
            tracing::warn!("local HTTP provider is text-only in practice; dropping {} image(s)", request.images.len());
        }

        let (tx, rx) = mpsc::channel(100);

        let mut wire = self.to_wire_request(request);
        wire.stream = true;

        let response = self
            .client
            .post(self.endpoint())
            .json(&wire)
            .send()
            .await
            .with_context(|| format!("local model server unreachable at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("local HTTP streaming request failed\n\nStatus: {status}\nBody: {body}");
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
        "local-http"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn supports_tools(&self) -> bool {
        false
    }

    fn supports_images(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
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

impl WireResponse {
    fn into_chat_response(self) -> Result<ChatResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .context("local model server returned no choices")?;

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: Vec::new(),
            stop_reason,
            usage: None,
        })
    }
}
