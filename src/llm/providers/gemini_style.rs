// Gemini-style provider — spec §4.C4 capability matrix row 3 (tool calling:
// no — ignore with warn; images: yes; stream: yes; "role mapping
// user/model").
//
// Grounded on the teacher's `providers::gemini::GeminiProvider` (role
// remapping `assistant` -> `model`, `contents`/`parts` wire shape,
// `streamGenerateContent?alt=sse` streaming endpoint). The teacher's own
// Gemini provider drops images to a `"[image content]"` text part; this one
// instead builds real `inlineData` parts, since Gemini genuinely supports
// inline image input and the capability matrix calls for it.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatRequest, ChatResponse, Chunk, Role, StopReason, Usage};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiStyleProvider {
    client: Client,
    api_key: String,
    default_model: String,
}

impl GeminiStyleProvider {
    pub fn new(api_key: String, default_model: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            default_model: default_model.unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{GEMINI_BASE_URL}/models/{model}:generateContent?key={}",
            self.api_key
        )
    }

    fn stream_endpoint(&self, model: &str) -> String {
        format!(
            "{GEMINI_BASE_URL}/models/{model}:streamGenerateContent?key={}&alt=sse",
            self.api_key
        )
    }

    fn to_wire_request(&self, request: &ChatRequest) -> WireRequest {
        let mut contents: Vec<WireContent> = request
            .messages
            .iter()
            .map(|m| WireContent {
                role: match m.role {
                    Role::Assistant => "model".to_string(),
                    Role::User => "user".to_string(),
                },
                parts: vec![WirePart::Text { text: m.content.clone() }],
            })
            .collect();

        if !request.images.is_empty() {
            if let Some(last) = contents.iter_mut().rev().find(|c| c.role == "user") {
                for img in &request.images {
                    last.parts.push(WirePart::InlineData {
                        inline_data: WireInlineData {
                            mime_type: "image/png".to_string(),
                            data: img.clone(),
                        },
                    });
                }
            }
        }

        WireRequest {
            contents,
            system_instruction: request.system.as_ref().map(|s| WireContent {
                role: "user".to_string(),
                parts: vec![WirePart::Text { text: s.clone() }],
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiStyleProvider {
    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if request.tools.is_some() {
            tracing::warn!("gemini-style provider does not support tool calling; ignoring tools on this request");
        }

        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };
        let wire = self.to_wire_request(request);

        let response = self
            .client
            .post(self.endpoint(&model))
            .json(&wire)
            .send()
            .await
            .context("failed to send request to gemini-style provider")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("gemini-style request failed\n\nStatus: {status}\nBody: {body}");
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .context("failed to parse gemini-style response")?;

        Ok(wire_response.into_chat_response())
    }

    async fn stream_once(&self, request: &ChatRequest) -> Result<mpsc::Receiver<Result<Chunk>>> {
        if request.tools.is_some() {
            tracing::warn!("gemini-style provider does not support tool calling; ignoring tools on this request");
        }

        let (tx, rx) = mpsc::channel(100);

        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };
        let wire = self.to_wire_request(request);

        let response = self
            .client
            .post(self.stream_endpoint(&model))
            .json(&wire)
            .send()
            .await
            .context("failed to send streaming request to gemini-style provider")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("gemini-style streaming request failed\n\nStatus: {status}\nBody: {body}");
        }

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = Vec::new();
            let mut usage = None;
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
                            if json_str.is_empty() || json_str == "[DONE]" {
                                continue;
                            }

                            let Ok(stream_response) = serde_json::from_str::<WireResponse>(json_str) else {
                                continue;
                            };

                            if let Some(u) = &stream_response.usage_metadata {
                                usage = Some(Usage {
                                    input_tokens: u.prompt_token_count,
                                    output_tokens: u.candidates_token_count,
                                });
                            }

                            if let Some(candidate) = stream_response.candidates.into_iter().next() {
                                for part in &candidate.content.parts {
                                    if let Some(text) = part.as_text() {
                                        if tx.send(Ok(Chunk::TextDelta(text.to_string()))).await.is_err() {
                                            done = true;
                                            break;
                                        }
                                    }
                                }
                                if candidate.finish_reason.is_some() {
                                    let stop_reason = match candidate.finish_reason.as_deref() {
                                        Some("MAX_TOKENS") => StopReason::MaxTokens,
                                        _ => StopReason::EndTurn,
                                    };
                                    let _ = tx.send(Ok(Chunk::Done { stop_reason, usage })).await;
                                    done = true;
                                    break;
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
        "gemini-style"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn supports_tools(&self) -> bool {
        false
    }
}

/// Either a text part or an inline-base64 image part
/// (`{"inlineData":{"mimeType":...,"data":...}}`); untagged so existing
/// text-only wire shapes keep deserializing unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: WireInlineData,
    },
}

impl WirePart {
    fn as_text(&self) -> Option<&str> {
        match self {
            WirePart::Text { text } => Some(text.as_str()),
            WirePart::InlineData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireContent {
    role: String,
    parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Serialize)]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct WireCandidate {
    content: WireContent,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    candidates: Vec<WireCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<WireUsageMetadata>,
}

impl WireResponse {
    fn into_chat_response(self) -> ChatResponse {
        let candidate = self.candidates.into_iter().next();

        let content = candidate
            .as_ref()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.as_text())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let stop_reason = match candidate.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        ChatResponse {
            content,
            tool_calls: Vec::new(),
            stop_reason,
            usage: self.usage_metadata.map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn assistant_role_maps_to_model() {
        let p = GeminiStyleProvider::new("k".to_string(), None).unwrap();
        let req = ChatRequest::new(vec![ChatMessage::assistant("hi")]);
        let wire = p.to_wire_request(&req);
        assert_eq!(wire.contents[0].role, "model");
    }

    #[test]
    fn supports_tools_is_false() {
        let p = GeminiStyleProvider::new("k".to_string(), None).unwrap();
        assert!(!p.supports_tools());
    }

    #[test]
    fn images_become_inline_data_parts_on_the_last_user_content() {
        let p = GeminiStyleProvider::new("k".to_string(), None).unwrap();
        let req = ChatRequest::new(vec![ChatMessage::user("what's this?")])
            .with_images(vec!["cGl4ZWxz".to_string()]);
        let wire = p.to_wire_request(&req);
        let parts = &wire.contents.last().unwrap().parts;
        assert_eq!(parts.len(), 2);
        match &parts[1] {
            WirePart::InlineData { inline_data } => {
                assert_eq!(inline_data.mime_type, "image/png");
                assert_eq!(inline_data.data, "cGl4ZWxz");
            }
            WirePart::Text { .. } => panic!("expected inline_data part"),
        }
    }
}
