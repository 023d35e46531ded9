// Path and its verification history — spec §3 Path / PathVerification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::Action;
use super::node::{NodeId, UiElement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnedBy {
    Vlm,
    Manual,
    Recorded,
}

/// Criteria the controller checks after the final action of a Path executes
/// (spec §3 Path.validation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathValidation {
    #[serde(default)]
    pub expected_elements: Vec<UiElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_text: Option<Vec<String>>,
    pub timeout_ms: u64,
}

impl Default for PathValidation {
    fn default() -> Self {
        Self {
            expected_elements: Vec::new(),
            expected_text: None,
            timeout_ms: 30_000,
        }
    }
}

/// One appended-once-per-executed-action record (spec §3 PathVerification).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathVerification {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub action_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_result: Option<OcrVerificationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlm_result: Option<VlmVerificationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrVerificationSummary {
    pub full_text: String,
    pub elements_found: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmVerificationSummary {
    pub r#match: bool,
    pub confidence: f32,
    pub reason: String,
}

/// Running execution statistics for a Path (spec §3 Path.metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMetadata {
    pub success_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub average_duration_ms: f64,
    pub learned_by: LearnedBy,
}

impl PathMetadata {
    pub fn new(learned_by: LearnedBy) -> Self {
        Self {
            success_rate: 0.0,
            last_used: None,
            usage_count: 0,
            average_duration_ms: 0.0,
            learned_by,
        }
    }

    /// Record one execution attempt (spec §4.C8 "Metadata update on
    /// execute", I3).
    ///
    /// `usage_count` is incremented exactly once per attempt, and
    /// `success_rate` is recomputed per the corrected invariant I3:
    /// `new = (old * (usage_count - 1) + outcome) / usage_count`.
    pub fn record_execution(&mut self, success: bool, duration_ms: f64) {
        self.usage_count += 1;
        let outcome = if success { 1.0 } else { 0.0 };
        self.success_rate = (self.success_rate * (self.usage_count - 1) as f64 + outcome)
            / self.usage_count as f64;
        self.average_duration_ms = (self.average_duration_ms * (self.usage_count - 1) as f64
            + duration_ms)
            / self.usage_count as f64;
        self.last_used = Some(Utc::now());
    }
}

/// A persisted directed edge between two Nodes (spec §3 Path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub id: Uuid,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub actions: Vec<Action>,
    pub validation: PathValidation,
    #[serde(default)]
    pub verification_history: Vec<PathVerification>,
    pub metadata: PathMetadata,
}

impl Path {
    /// A freshly learned path, destination pending re-identification
    /// (spec §4.C8 Placeholder rule). Must never be persisted while
    /// `to_node_id` is still pending (P6) — enforced at the graph-store
    /// boundary, see `graph::store`.
    pub fn learned(
        from_node_id: NodeId,
        actions: Vec<Action>,
        validation: PathValidation,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_node_id,
            to_node_id: NodeId::pending(),
            actions,
            validation,
            verification_history: Vec::new(),
            metadata: PathMetadata::new(LearnedBy::Vlm),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.to_node_id.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Property P5: after N executions with outcomes o1..on, success_rate
    /// equals mean(oi).
    #[test]
    fn success_rate_converges_to_mean() {
        let mut meta = PathMetadata::new(LearnedBy::Vlm);
        let outcomes = [true, false, true, true, false];
        for &o in &outcomes {
            meta.record_execution(o, 100.0);
        }
        let expected: f64 =
            outcomes.iter().filter(|o| **o).count() as f64 / outcomes.len() as f64;
        assert!((meta.success_rate - expected).abs() < 1e-9);
        assert_eq!(meta.usage_count, outcomes.len() as u64);
    }

    #[test]
    fn usage_count_increments_exactly_once_per_attempt() {
        let mut meta = PathMetadata::new(LearnedBy::Vlm);
        meta.record_execution(true, 50.0);
        meta.record_execution(true, 150.0);
        assert_eq!(meta.usage_count, 2);
        assert_eq!(meta.average_duration_ms, 100.0);
    }

    #[test]
    fn learned_path_starts_pending() {
        let path = Path::learned(NodeId::spotlight(), vec![], PathValidation::default());
        assert!(path.is_pending());
        assert_eq!(path.to_node_id, NodeId::pending());
    }
}
