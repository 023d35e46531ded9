// Node identity and the persisted Node record — spec §3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `(programName, stateHash)`. Identity is the pair (spec §3 NodeId).
///
/// `program_name` is a short human label ("Finder", "Chrome"). `state_hash`
/// is the 16-hex-char content hash produced by [`crate::hash::hash_elements`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub program_name: String,
    pub state_hash: String,
}

impl NodeId {
    pub fn new(program_name: impl Into<String>, state_hash: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            state_hash: state_hash.into(),
        }
    }

    /// The Spotlight bootstrap node (spec §3 I5).
    pub fn spotlight() -> Self {
        Self::new("Spotlight", "default")
    }

    /// The placeholder destination a freshly learned Path starts with
    /// (spec §4.C8 "Placeholder rule"). Never persisted (P6).
    pub fn pending() -> Self {
        Self::new("Unknown", "pending")
    }

    pub fn is_pending(&self) -> bool {
        self.state_hash == "pending"
    }

    /// The `"<programName>::<stateHash>"` key format used on disk (spec §6).
    pub fn disk_key(&self) -> String {
        format!("{}::{}", self.program_name, self.state_hash)
    }

    pub fn from_disk_key(key: &str) -> Option<Self> {
        let (program, hash) = key.split_once("::")?;
        Some(Self::new(program, hash))
    }
}

/// A pixel-space bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Detection rule for normalization (spec §4.C1): all four components
    /// lie in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        [self.x, self.y, self.w, self.h]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }

    /// Screen-relative conversion: `px = norm * dim`.
    pub fn to_pixels(&self, screen_w: f64, screen_h: f64) -> BBox {
        BBox::new(
            self.x * screen_w,
            self.y * screen_h,
            self.w * screen_w,
            self.h * screen_h,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Button,
    Input,
    Text,
    Image,
    Link,
    Menu,
    Other,
}

/// A single recognized on-screen element (spec §3 UIElement).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElement {
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl UiElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            text: None,
            bbox: None,
            confidence: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A persisted place: a program plus a content-hash of its visible UI
/// (spec §3 Node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub ui_elements: Vec<UiElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_visited_at: DateTime<Utc>,
    pub visit_count: u64,
    /// Retained as data only; no read path uses it (spec §9 open question d).
    #[serde(default)]
    pub children_ids: Vec<NodeId>,
}

impl Node {
    /// Create a freshly identified node. `visit_count` starts at 1 — the
    /// identification that creates the node counts as its first visit.
    pub fn new(id: NodeId, ui_elements: Vec<UiElement>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: None,
            screenshot: None,
            ui_elements,
            description: None,
            created_at: now,
            last_visited_at: now,
            visit_count: 1,
            children_ids: Vec::new(),
        }
    }

    /// The Spotlight bootstrap node (spec §3 I5), with `visit_count = 0`
    /// (scenario S1) until it is actually identified once.
    pub fn spotlight() -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::spotlight(),
            title: Some("Spotlight".to_string()),
            screenshot: None,
            ui_elements: Vec::new(),
            description: Some("OS quick-launcher".to_string()),
            created_at: now,
            last_visited_at: now,
            visit_count: 0,
            children_ids: Vec::new(),
        }
    }

    /// Re-identification: bump visit stats in place (spec §3 Lifecycles).
    pub fn touch(&mut self) {
        self.visit_count += 1;
        self.last_visited_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_key_roundtrip() {
        let id = NodeId::new("Finder", "abc123");
        let key = id.disk_key();
        assert_eq!(key, "Finder::abc123");
        assert_eq!(NodeId::from_disk_key(&key), Some(id));
    }

    #[test]
    fn bbox_normalization_detection() {
        let norm = BBox::new(0.1, 0.2, 0.3, 0.4);
        assert!(norm.is_normalized());
        let pixel = BBox::new(100.0, 200.0, 50.0, 60.0);
        assert!(!pixel.is_normalized());
    }

    #[test]
    fn bbox_to_pixels_is_screen_relative() {
        let norm = BBox::new(0.5, 0.5, 0.1, 0.1);
        let px = norm.to_pixels(1000.0, 2000.0);
        assert_eq!(px.x, 500.0);
        assert_eq!(px.y, 1000.0);
        assert_eq!(px.w, 100.0);
        assert_eq!(px.h, 200.0);
    }

    #[test]
    fn spotlight_bootstrap_has_zero_visits() {
        let node = Node::spotlight();
        assert_eq!(node.id, NodeId::spotlight());
        assert_eq!(node.visit_count, 0);
    }

    #[test]
    fn touch_increments_visit_count_and_timestamp() {
        let mut node = Node::spotlight();
        let before = node.last_visited_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        node.touch();
        assert_eq!(node.visit_count, 1);
        assert!(node.last_visited_at >= before);
    }

    #[test]
    fn pending_node_id_is_detected() {
        assert!(NodeId::pending().is_pending());
        assert!(!NodeId::spotlight().is_pending());
    }
}
