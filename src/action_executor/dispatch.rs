// Action Executor dispatcher — spec §4.C7.
//
// Dispatches a single Action against an `InputBackend`. OCR-mediated text
// targeting for `Click{text}` reuses the Perception module's OCR backend
// directly (spec §4.C7 "Click with text": "capture screen, run OCR, select
// the element whose text ... contains the query and with highest
// confidence").

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use crate::model::{ActionData, ScrollDirection};
use crate::perception::{capture_screen_buffer, to_pixel_space, OcrBackend};

use super::backend::InputBackend;
use crate::perception::OcrElement;

/// Select the OCR element whose text case-insensitively contains `query`,
/// preferring the highest-confidence match (spec §4.C7 "Click with text").
fn select_best_match<'a>(elements: &'a [OcrElement], query: &str) -> Option<&'a OcrElement> {
    let query_lower = query.to_lowercase();
    elements
        .iter()
        .filter(|e| e.text.to_lowercase().contains(&query_lower))
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
}

pub struct ActionExecutor {
    backend: Arc<dyn InputBackend>,
    ocr: Arc<dyn OcrBackend>,
}

impl ActionExecutor {
    pub fn new(backend: Arc<dyn InputBackend>, ocr: Arc<dyn OcrBackend>) -> Self {
        Self { backend, ocr }
    }

    /// Dispatch one action. Any failure becomes `Ok(false)` plus a log line
    /// (spec §4.C7 "Failure policy"); the caller decides whether to retry.
    pub async fn execute(&self, action: &ActionData) -> bool {
        match self.execute_inner(action).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("action execution failed: {e}");
                false
            }
        }
    }

    async fn execute_inner(&self, action: &ActionData) -> Result<()> {
        match action {
            ActionData::Click {
                x,
                y,
                text,
                button,
                double_click,
            } => match (x, y, text) {
                (Some(x), Some(y), _) => self.backend.click(*x, *y, *button, *double_click).await,
                (_, _, Some(text)) => self.click_by_text(text, *button, *double_click).await,
                _ => anyhow::bail!("Click action has neither coordinates nor text"),
            },
            ActionData::Type {
                text,
                press_enter,
                delay_ms,
            } => {
                self.backend.type_text(text, *delay_ms).await?;
                if *press_enter {
                    sleep(Duration::from_millis(100)).await;
                    self.backend.press_key("enter", &[]).await?;
                }
                sleep(Duration::from_millis(200)).await;
                Ok(())
            }
            ActionData::Hotkey { keys, modifiers } => {
                for key in keys {
                    self.backend.press_key(key, modifiers).await?;
                }
                Ok(())
            }
            ActionData::Wait { milliseconds } => {
                sleep(Duration::from_millis(*milliseconds)).await;
                Ok(())
            }
            ActionData::Scroll { amount, direction } => {
                self.backend
                    .scroll(*amount, matches!(direction, ScrollDirection::Up))
                    .await
            }
        }
    }

    async fn click_by_text(
        &self,
        query: &str,
        button: crate::model::MouseButton,
        double_click: bool,
    ) -> Result<()> {
        let png = capture_screen_buffer()?;
        let analysis = self
            .ocr
            .analyze(&png)
            .await
            .ok_or_else(|| anyhow::anyhow!("OCR unavailable; cannot resolve text target {query:?}"))?;

        let best = select_best_match(&analysis.elements, query)
            .ok_or_else(|| anyhow::anyhow!("no OCR element matching {query:?}"))?;

        let bbox = to_pixel_space(best.bbox);
        let (cx, cy) = bbox.center();
        self.backend.click(cx, cy, button, double_click).await
    }

    /// `closeCurrentApp` helper (spec §4.C8): Hotkey command+q, settle
    /// 500 ms.
    pub async fn close_current_app(&self) -> bool {
        match self.backend.press_key("q", &[crate::model::Modifier::Command]).await {
            Ok(()) => {
                sleep(Duration::from_millis(500)).await;
                true
            }
            Err(e) => {
                tracing::warn!("closeCurrentApp failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, MouseButton};
    use crate::perception::{OcrElement, UnavailableOcr};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingBackend {
        clicks: Mutex<Vec<(f64, f64)>>,
        screen_size: (f64, f64),
    }

    #[async_trait]
    impl InputBackend for RecordingBackend {
        async fn move_mouse(&self, _x: f64, _y: f64) -> Result<()> {
            Ok(())
        }

        async fn click(&self, x: f64, y: f64, _button: MouseButton, _double_click: bool) -> Result<()> {
            self.clicks.lock().unwrap().push((x, y));
            Ok(())
        }

        async fn type_text(&self, _text: &str, _delay_ms: u64) -> Result<()> {
            Ok(())
        }

        async fn press_key(&self, _key: &str, _modifiers: &[crate::model::Modifier]) -> Result<()> {
            Ok(())
        }

        async fn scroll(&self, _amount: i32, _direction_up: bool) -> Result<()> {
            Ok(())
        }

        fn screen_size(&self) -> Result<(f64, f64)> {
            Ok(self.screen_size)
        }
    }

    fn backend() -> Arc<RecordingBackend> {
        Arc::new(RecordingBackend {
            clicks: Mutex::new(Vec::new()),
            screen_size: (1920.0, 1080.0),
        })
    }

    #[tokio::test]
    async fn coordinate_click_dispatches_to_backend() {
        let backend = backend();
        let executor = ActionExecutor::new(backend.clone(), Arc::new(UnavailableOcr));
        let action = ActionData::click_at(100.0, 200.0);
        assert!(executor.execute(&action).await);
        assert_eq!(backend.clicks.lock().unwrap().as_slice(), &[(100.0, 200.0)]);
    }

    fn sample_elements() -> Vec<OcrElement> {
        vec![
            OcrElement {
                text: "Settings".to_string(),
                confidence: 0.5,
                bbox: BBox::new(10.0, 10.0, 50.0, 20.0),
            },
            OcrElement {
                text: "Settings Pane".to_string(),
                confidence: 0.9,
                bbox: BBox::new(200.0, 300.0, 60.0, 20.0),
            },
            OcrElement {
                text: "Sound".to_string(),
                confidence: 0.95,
                bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            },
        ]
    }

    /// Spec §4.C7 "Click with text": highest-confidence match among
    /// case-insensitive substring hits, ignoring unrelated high-confidence
    /// elements that don't match the query.
    #[test]
    fn select_best_match_prefers_highest_confidence_among_substring_hits() {
        let elements = sample_elements();
        let best = select_best_match(&elements, "settings").unwrap();
        assert_eq!(best.text, "Settings Pane");
    }

    #[test]
    fn select_best_match_is_case_insensitive() {
        let elements = sample_elements();
        assert!(select_best_match(&elements, "SETTINGS").is_some());
    }

    #[test]
    fn select_best_match_returns_none_when_nothing_matches() {
        let elements = sample_elements();
        assert!(select_best_match(&elements, "display").is_none());
    }

    #[tokio::test]
    async fn click_with_neither_coords_nor_text_fails() {
        let backend = backend();
        let executor = ActionExecutor::new(backend, Arc::new(UnavailableOcr));
        let action = ActionData::Click {
            x: None,
            y: None,
            text: None,
            button: MouseButton::Left,
            double_click: false,
        };
        assert!(!executor.execute(&action).await);
    }
}
