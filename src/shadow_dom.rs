// ShadowDOM — spec §4.C5, §3 "ShadowDOM".
//
// A volatile, single-instance runtime snapshot of the current screen, tied
// to a NodeId. Never persisted; replaced wholesale on every update.
//
// Grounded on the teacher's `node::stats::WorkTracker` for the "one
// shared, replaceable piece of process state behind a lock" shape, adapted
// from atomics (a running counter) to a whole-value swap (a snapshot).

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::hash::hash_elements;
use crate::model::{NodeId, UiElement};
use crate::perception::OcrAnalysis;

#[derive(Debug, Clone)]
pub struct ShadowDom {
    pub node_id: NodeId,
    pub captured_at: DateTime<Utc>,
    pub screenshot: String,
    pub ui_elements: Vec<UiElement>,
    pub ocr_result: Option<OcrAnalysis>,
    pub vlm_description: Option<String>,
    /// Distinct from the owning Node's `stateHash`: computed on live,
    /// pre-quantization-tolerance pixel positions (spec §4.C5).
    pub instance_hash: String,
}

impl ShadowDom {
    pub fn new(
        node_id: NodeId,
        screenshot: String,
        ui_elements: Vec<UiElement>,
        ocr_result: Option<OcrAnalysis>,
        vlm_description: Option<String>,
    ) -> Self {
        let instance_hash = hash_elements(&ui_elements);
        Self {
            node_id,
            captured_at: Utc::now(),
            screenshot,
            ui_elements,
            ocr_result,
            vlm_description,
            instance_hash,
        }
    }

    /// Case-insensitive substring search across every recognized OCR text
    /// box (spec §4.C8 step 3).
    pub fn ocr_contains(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.ocr_result
            .as_ref()
            .map(|ocr| {
                ocr.elements
                    .iter()
                    .any(|e| e.text.to_lowercase().contains(&query))
            })
            .unwrap_or(false)
    }
}

/// Holds at most one ShadowDOM at a time (spec §4.C5 "At most one ShadowDOM
/// exists at a time inside the Brain"). Read-only to external callers; only
/// the Brain Controller replaces it.
#[derive(Default)]
pub struct ShadowDomSlot(RwLock<Option<ShadowDom>>);

impl ShadowDomSlot {
    pub fn new() -> Self {
        Self(RwLock::new(None))
    }

    pub async fn replace(&self, snapshot: ShadowDom) {
        *self.0.write().await = Some(snapshot);
    }

    pub async fn current(&self) -> Option<ShadowDom> {
        self.0.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;
    use crate::perception::{OcrAnalysis, OcrElement};
    use crate::model::BBox;

    fn sample_ocr(text: &str) -> OcrAnalysis {
        OcrAnalysis {
            full_text: text.to_string(),
            elements: vec![OcrElement {
                text: text.to_string(),
                confidence: 0.9,
                bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            }],
            platform: "test".to_string(),
        }
    }

    #[test]
    fn instance_hash_matches_state_hasher_on_same_elements() {
        let elements = vec![UiElement::new(ElementKind::Text).with_text("hi")];
        let dom = ShadowDom::new(NodeId::spotlight(), "b64".into(), elements.clone(), None, None);
        assert_eq!(dom.instance_hash, hash_elements(&elements));
    }

    #[test]
    fn ocr_contains_is_case_insensitive_substring() {
        let dom = ShadowDom::new(
            NodeId::spotlight(),
            "b64".into(),
            vec![],
            Some(sample_ocr("Display Settings")),
            None,
        );
        assert!(dom.ocr_contains("display"));
        assert!(!dom.ocr_contains("sound"));
    }

    #[tokio::test]
    async fn slot_replaces_previous_snapshot_wholesale() {
        let slot = ShadowDomSlot::new();
        assert!(slot.current().await.is_none());

        let first = ShadowDom::new(NodeId::spotlight(), "a".into(), vec![], None, None);
        slot.replace(first).await;
        assert_eq!(slot.current().await.unwrap().screenshot, "a");

        let second = ShadowDom::new(NodeId::spotlight(), "b".into(), vec![], None, None);
        slot.replace(second).await;
        assert_eq!(slot.current().await.unwrap().screenshot, "b");
    }
}
