// VLM Adapter — spec §4.C3.
//
// Four prompt contracts against the vision model (always sent in
// `Mode::Vision`, stateless). Each expects a JSON object embedded in the
// model's text output; `extract_json_object` tolerates surrounding prose.
// Grounded on the teacher's JSON-tool-call parsing style (`tools/types.rs`
// `ToolUse::input` as `serde_json::Value`); the VLM here returns JSON in
// plain text rather than as a tool call; there is no extraction helper.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::UiElement;
use crate::perception::{elements_from_ocr, OcrAnalysis};

use super::orchestrator::{Mode, Orchestrator};
use super::types::ChatMessage;

/// Pull the first top-level `{...}` object out of a string that may contain
/// surrounding prose (spec §4.C3: "tolerate surrounding prose").
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..=i];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

async fn send_vision(
    orchestrator: &Orchestrator,
    screenshot_b64: String,
    prompt: String,
) -> Result<String> {
    let messages = vec![ChatMessage::user(prompt)];
    let response = orchestrator
        .send_once_with_images(Mode::Vision, messages, vec![screenshot_b64])
        .await?;
    Ok(response.content)
}

/// `extractProgramName` — spec §4.C3 row 1. Fallback: `"Unknown"`.
pub async fn extract_program_name(
    orchestrator: &Orchestrator,
    screenshot_b64: String,
    ocr_texts: &[String],
) -> String {
    let sample: Vec<&String> = ocr_texts.iter().take(20).collect();
    let prompt = format!(
        "Identify the name of the foreground application shown in this screenshot. \
         Reply with a single short token only, no punctuation.\nVisible text: {:?}",
        sample
    );

    match send_vision(orchestrator, screenshot_b64, prompt).await {
        Ok(text) => {
            let cleaned = text.trim().trim_matches('"').trim();
            if cleaned.is_empty() {
                "Unknown".to_string()
            } else {
                cleaned.to_string()
            }
        }
        Err(e) => {
            tracing::warn!("extractProgramName failed: {e}");
            "Unknown".to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifyElementsResult {
    pub elements: Vec<UiElement>,
    pub description: String,
}

/// `identifyUIElements` — spec §4.C3 row 2. Fallback: synthesize from OCR
/// boxes if available, else an empty, explanatory result.
pub async fn identify_ui_elements(
    orchestrator: &Orchestrator,
    screenshot_b64: String,
    ocr: Option<&OcrAnalysis>,
) -> IdentifyElementsResult {
    let ocr_json = ocr.map(|o| {
        serde_json::json!(o
            .elements
            .iter()
            .take(50)
            .map(|e| serde_json::json!({"text": e.text, "bbox": e.bbox}))
            .collect::<Vec<_>>())
    });

    let prompt = format!(
        "List the interactive UI elements visible in this screenshot as JSON: \
         {{\"elements\": [{{\"kind\":.., \"text\":.., \"bbox\":.., \"confidence\":..}}], \"description\": \"...\"}}.\n\
         OCR hint (may be incomplete): {}",
        ocr_json.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
    );

    let fallback = || {
        if let Some(ocr) = ocr {
            IdentifyElementsResult {
                elements: elements_from_ocr(ocr),
                description: ocr.full_text.clone(),
            }
        } else {
            IdentifyElementsResult {
                elements: Vec::new(),
                description: "Could not analyze".to_string(),
            }
        }
    };

    match send_vision(orchestrator, screenshot_b64, prompt).await {
        Ok(text) => match extract_json_object(&text).and_then(|v| serde_json::from_value(v).ok()) {
            Some(result) => result,
            None => fallback(),
        },
        Err(e) => {
            tracing::warn!("identifyUIElements failed: {e}");
            fallback()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlannedAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub data: Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LearnPathResult {
    pub actions: Vec<PlannedAction>,
    pub confidence: f32,
}

/// `learnNavigationPath` — spec §4.C3 row 3. Fallback: `{actions:[],
/// confidence:0}`.
pub async fn learn_navigation_path(
    orchestrator: &Orchestrator,
    screenshot_b64: String,
    target_description: &str,
    ocr_summary: Option<&str>,
) -> LearnPathResult {
    let summary = ocr_summary
        .map(|s| s.chars().take(2000).collect::<String>())
        .unwrap_or_default();

    let prompt = format!(
        "Given this screenshot, propose a sequence of UI actions to reach: \"{target_description}\". \
         Reply as JSON: {{\"actions\": [{{\"type\":.., \"data\":.., \"description\":..}}], \"confidence\": 0..1}}.\n\
         Visible text (may be truncated): {summary}"
    );

    let fallback = LearnPathResult {
        actions: Vec::new(),
        confidence: 0.0,
    };

    match send_vision(orchestrator, screenshot_b64, prompt).await {
        Ok(text) => extract_json_object(&text)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(fallback),
        Err(e) => {
            tracing::warn!("learnNavigationPath failed: {e}");
            fallback
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyStateResult {
    #[serde(rename = "match")]
    pub matched: bool,
    pub confidence: f32,
    pub reason: String,
}

/// `verifyScreenState` — spec §4.C3 row 4. Fallback: `{match:false,
/// confidence:0, reason:"Failed to verify"}`.
pub async fn verify_screen_state(
    orchestrator: &Orchestrator,
    screenshot_b64: String,
    expected_elements: &[UiElement],
    expected_text: Option<&[String]>,
) -> VerifyStateResult {
    let elements_sample: Vec<&UiElement> = expected_elements.iter().take(10).collect();
    let prompt = format!(
        "Does this screenshot match the expected state? Expected elements: {:?}. Expected text: {:?}. \
         Reply as JSON: {{\"match\": true|false, \"confidence\": 0..1, \"reason\": \"...\"}}.",
        elements_sample, expected_text
    );

    let fallback = VerifyStateResult {
        matched: false,
        confidence: 0.0,
        reason: "Failed to verify".to_string(),
    };

    match send_vision(orchestrator, screenshot_b64, prompt).await {
        Ok(text) => extract_json_object(&text)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(fallback),
        Err(e) => {
            tracing::warn!("verifyScreenState failed: {e}");
            fallback
        }
    }
}
