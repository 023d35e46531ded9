// Brain Controller — spec §4.C8.
//
// Top-level orchestration: identify-current-node -> find-or-learn path ->
// execute-with-verification -> update graph. Grounded on the teacher's
// `brain::BrainSession`/`run_brain_loop` (the closest thing in the teacher to
// a top-level orchestrating controller with a cancellation token and a
// bounded turn loop), adapted from "gather codebase context" semantics to
// the `navigate_to` state machine below.
//
// Concurrency (spec §5): "serialize Brain entry points with a single
// mutex". Every public entry point acquires `self.graph`'s lock for its
// entire body — composed entry points (`navigate_to`) call private
// `*_locked` helpers that take the already-held guard rather than
// re-locking, which would deadlock against `tokio::sync::Mutex`.

pub mod tools;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::BrainError;
use crate::llm::orchestrator::Orchestrator;
use crate::llm::vlm;
use crate::model::{
    Action, ActionData, Modifier, Node, NodeId, OcrVerificationSummary, Path, PathValidation,
    PathVerification, VlmVerificationSummary,
};
use crate::action_executor::{ActionExecutor, InputBackend};
use crate::config::BrainConfig;
use crate::graph::NavigationGraph;
use crate::hash::hash_elements;
use crate::perception::{CaptureBackend, OcrAnalysis, OcrBackend, PngBytes};
use crate::shadow_dom::{ShadowDom, ShadowDomSlot};

/// `{nodeCount, currentNodeId}` — the `graphStats` half of `get_current_node`.
#[derive(Debug, Clone)]
pub struct GraphStats {
    pub node_count: usize,
    pub current_node_id: Option<NodeId>,
}

/// `{success, currentNode, message}` — the result of `navigateTo` (spec §6).
#[derive(Debug, Clone)]
pub struct NavigateOutcome {
    pub success: bool,
    pub current_node: Option<NodeId>,
    pub message: String,
}

/// The result of a single `executePath` invocation.
#[derive(Debug, Clone)]
pub struct PathOutcome {
    pub success: bool,
    pub failure_reason: Option<String>,
    pub actions_completed: usize,
}

/// `{currentNode, availablePaths[], graphStats}` (spec §6 `get_current_node`).
#[derive(Debug, Clone)]
pub struct CurrentNodeInfo {
    pub current_node: Option<NodeId>,
    pub available_paths: Vec<Path>,
    pub graph_stats: GraphStats,
}

struct CaptureResult {
    screenshot_b64: String,
    ocr: Option<OcrAnalysis>,
}

fn encode_png(png: PngBytes) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(png)
}

/// Convert one VLM-proposed action into a concrete `Action`, falling back to
/// a no-op `Wait` when the model's JSON doesn't match the `ActionData`
/// vocabulary (non-fatal — spec §7 "swallowed with warnings where a
/// sensible default exists").
fn planned_action_to_action(planned: vlm::PlannedAction) -> Action {
    let mut obj = planned.data.as_object().cloned().unwrap_or_default();
    obj.insert(
        "type".to_string(),
        serde_json::Value::String(planned.action_type.clone()),
    );
    let value = serde_json::Value::Object(obj);

    let data = match serde_json::from_value::<ActionData>(value) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(
                "VLM proposed an unparseable action (type={:?}): {e}; substituting Wait(0)",
                planned.action_type
            );
            ActionData::wait(0)
        }
    };

    let mut action = Action::new(data);
    if let Some(desc) = planned.description {
        action = action.with_description(desc);
    }
    action
}

pub struct BrainController {
    orchestrator: Arc<Orchestrator>,
    ocr: Arc<dyn OcrBackend>,
    capture: Arc<dyn CaptureBackend>,
    executor: ActionExecutor,
    shadow: ShadowDomSlot,
    graph: Mutex<NavigationGraph>,
    config: BrainConfig,
    cancel: CancellationToken,
}

impl BrainController {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        ocr: Arc<dyn OcrBackend>,
        capture: Arc<dyn CaptureBackend>,
        input_backend: Arc<dyn InputBackend>,
        config: BrainConfig,
    ) -> Self {
        let graph = NavigationGraph::load(config.graph_path.clone());
        Self {
            executor: ActionExecutor::new(input_backend, ocr.clone()),
            orchestrator,
            ocr,
            capture,
            shadow: ShadowDomSlot::new(),
            graph: Mutex::new(graph),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Cooperative cancellation signal (spec §5 "Cancellation & timeouts").
    /// Checked at each action boundary inside `navigate_to`/`execute_path`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    // --- Entry point: initialize --------------------------------------

    /// Public entry point `initialize` (spec §4.C8). The graph is already
    /// bootstrapped with the Spotlight node by construction (I5); this
    /// exposes that state under the lock like every other entry point.
    pub async fn initialize(&self) -> GraphStats {
        let graph = self.graph.lock().await;
        GraphStats {
            node_count: graph.node_count(),
            current_node_id: graph.current_node_id().cloned(),
        }
    }

    // --- Entry point: identifyCurrentNode ------------------------------

    pub async fn identify_current_node(&self) -> Option<NodeId> {
        let mut graph = self.graph.lock().await;
        self.identify_current_node_locked(&mut graph).await
    }

    async fn capture_and_analyze(&self) -> Result<CaptureResult, BrainError> {
        let png = self
            .capture
            .capture()
            .await
            .map_err(|e| BrainError::IdentificationFailed(e.to_string()))?;
        let ocr = self.ocr.analyze(&png).await;
        Ok(CaptureResult {
            screenshot_b64: encode_png(png),
            ocr,
        })
    }

    /// Identify the current screen: capture, run both VLM prompts needed to
    /// derive a `NodeId` (program name + elements), hash the elements,
    /// upsert the Node, replace the ShadowDOM, and persist.
    async fn identify_current_node_locked(&self, graph: &mut NavigationGraph) -> Option<NodeId> {
        let capture = match self.capture_and_analyze().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("identifyCurrentNode: capture failed: {e}");
                return None;
            }
        };

        let ocr_texts: Vec<String> = capture
            .ocr
            .as_ref()
            .map(|o| o.elements.iter().map(|e| e.text.clone()).collect())
            .unwrap_or_default();

        let program_name = vlm::extract_program_name(
            &self.orchestrator,
            capture.screenshot_b64.clone(),
            &ocr_texts,
        )
        .await;

        let identify_result = vlm::identify_ui_elements(
            &self.orchestrator,
            capture.screenshot_b64.clone(),
            capture.ocr.as_ref(),
        )
        .await;

        let state_hash = hash_elements(&identify_result.elements);
        let node_id = NodeId::new(program_name, state_hash);

        match graph.get_node(&node_id) {
            Some(existing) => {
                let mut node = existing.clone();
                node.touch();
                graph.update_node(node);
            }
            None => {
                graph.add_node(Node::new(node_id.clone(), identify_result.elements.clone()));
            }
        }
        graph.set_current_node_id(node_id.clone());

        let dom = ShadowDom::new(
            node_id.clone(),
            capture.screenshot_b64,
            identify_result.elements,
            capture.ocr,
            Some(identify_result.description),
        );
        self.shadow.replace(dom).await;

        if let Err(e) = graph.save() {
            tracing::warn!("identifyCurrentNode: failed to persist graph: {e}");
        }

        Some(node_id)
    }

    /// Rebuild the ShadowDOM mid-path (spec §4.C5 construction list: capture
    /// -> OCR -> `identifyUIElements` -> hash). Tied to whatever NodeId is
    /// currently in play; no re-identification happens here.
    async fn rebuild_shadow_dom_for(&self, node_id: NodeId) -> Result<ShadowDom, BrainError> {
        let capture = self.capture_and_analyze().await?;
        let identify_result = vlm::identify_ui_elements(
            &self.orchestrator,
            capture.screenshot_b64.clone(),
            capture.ocr.as_ref(),
        )
        .await;
        Ok(ShadowDom::new(
            node_id,
            capture.screenshot_b64,
            identify_result.elements,
            capture.ocr,
            Some(identify_result.description),
        ))
    }

    // --- Entry point: addNode ------------------------------------------

    pub async fn add_node(&self, node: Node) {
        let mut graph = self.graph.lock().await;
        graph.add_node(node);
        if let Err(e) = graph.save() {
            tracing::warn!("addNode: failed to persist graph: {e}");
        }
    }

    // --- Entry point: learnPath -----------------------------------------

    pub async fn learn_path(&self, target: &str) -> Result<Path, BrainError> {
        let graph = self.graph.lock().await;
        let from = graph
            .current_node_id()
            .cloned()
            .ok_or_else(|| BrainError::IdentificationFailed("no current node".to_string()))?;
        self.learn_path_locked(&from, target).await
    }

    async fn learn_path_locked(&self, from: &NodeId, target: &str) -> Result<Path, BrainError> {
        let shadow = self
            .shadow
            .current()
            .await
            .ok_or_else(|| BrainError::IdentificationFailed("no current screen snapshot".to_string()))?;

        let ocr_summary = shadow.ocr_result.as_ref().map(|o| o.full_text.clone());
        let result = vlm::learn_navigation_path(
            &self.orchestrator,
            shadow.screenshot.clone(),
            target,
            ocr_summary.as_deref(),
        )
        .await;

        if result.actions.is_empty() || result.confidence < 0.3 {
            return Err(BrainError::LearningRejected(format!(
                "actions={}, confidence={}",
                result.actions.len(),
                result.confidence
            )));
        }

        let actions: Vec<Action> = result
            .actions
            .into_iter()
            .map(planned_action_to_action)
            .collect();
        let validation = PathValidation {
            expected_elements: Vec::new(),
            expected_text: None,
            timeout_ms: self.config.default_timeout.as_millis() as u64,
        };

        Ok(Path::learned(from.clone(), actions, validation))
    }

    // --- Entry point: executePath --------------------------------------

    pub async fn execute_path(&self, path: &mut Path) -> PathOutcome {
        let mut graph = self.graph.lock().await;
        self.execute_path_locked(&mut graph, path).await
    }

    /// Per-action verification loop (spec §4.C8 "Per-action verification"),
    /// with retry-once-on-failure (S3), wall-clock timeout, and cooperative
    /// cancellation. `graph` is unused directly (verification reads only the
    /// Path and the ShadowDOM) but is threaded through to keep this a
    /// `*_locked` helper callable from `navigate_to_locked` without
    /// re-acquiring the mutex.
    async fn execute_path_locked(&self, _graph: &mut NavigationGraph, path: &mut Path) -> PathOutcome {
        let start = Instant::now();
        let timeout = Duration::from_millis(path.validation.timeout_ms.max(1));
        let context_node_id = path.from_node_id.clone();

        let mut failure_reason: Option<String> = None;
        let mut completed = 0usize;
        let actions = path.actions.clone();

        for (index, action) in actions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                failure_reason = Some("cancelled".to_string());
                break;
            }
            if start.elapsed() > timeout {
                failure_reason = Some("timeout".to_string());
                break;
            }

            let mut ok = self.executor.execute(&action.data).await;
            if !ok && action.retry_on_failure {
                tokio::time::sleep(Duration::from_secs(1)).await;
                ok = self.executor.execute(&action.data).await;
            }
            if !ok {
                let reason = format!("action {index} failed");
                path.verification_history.push(PathVerification {
                    timestamp: Utc::now(),
                    success: false,
                    action_index: index,
                    ocr_result: None,
                    vlm_result: None,
                    failure_reason: Some(reason.clone()),
                });
                failure_reason = Some(reason);
                break;
            }

            tokio::time::sleep(Duration::from_millis(500)).await;

            let shadow = match self.rebuild_shadow_dom_for(context_node_id.clone()).await {
                Ok(s) => s,
                Err(e) => {
                    let reason = format!("verification unavailable: {e}");
                    path.verification_history.push(PathVerification {
                        timestamp: Utc::now(),
                        success: false,
                        action_index: index,
                        ocr_result: None,
                        vlm_result: None,
                        failure_reason: Some(reason.clone()),
                    });
                    failure_reason = Some(reason);
                    break;
                }
            };

            let ocr_summary = Some(OcrVerificationSummary {
                full_text: shadow
                    .ocr_result
                    .as_ref()
                    .map(|o| o.full_text.clone())
                    .unwrap_or_default(),
                elements_found: shadow.ui_elements.len(),
            });

            if let Some(expected_text) = &path.validation.expected_text {
                if let Some(missing) = expected_text.iter().find(|q| !shadow.ocr_contains(q)) {
                    let reason = format!("Expected text not found: {missing}");
                    path.verification_history.push(PathVerification {
                        timestamp: Utc::now(),
                        success: false,
                        action_index: index,
                        ocr_result: ocr_summary.clone(),
                        vlm_result: None,
                        failure_reason: Some(reason.clone()),
                    });
                    self.shadow.replace(shadow).await;
                    failure_reason = Some(reason);
                    break;
                }
            }

            let mut vlm_summary = None;
            if !path.validation.expected_elements.is_empty() {
                let verify = vlm::verify_screen_state(
                    &self.orchestrator,
                    shadow.screenshot.clone(),
                    &path.validation.expected_elements,
                    path.validation.expected_text.as_deref(),
                )
                .await;
                vlm_summary = Some(VlmVerificationSummary {
                    r#match: verify.matched,
                    confidence: verify.confidence,
                    reason: verify.reason.clone(),
                });
                if !(verify.matched && verify.confidence >= 0.5) {
                    path.verification_history.push(PathVerification {
                        timestamp: Utc::now(),
                        success: false,
                        action_index: index,
                        ocr_result: ocr_summary.clone(),
                        vlm_result: vlm_summary.clone(),
                        failure_reason: Some(verify.reason.clone()),
                    });
                    self.shadow.replace(shadow).await;
                    failure_reason = Some(verify.reason);
                    break;
                }
            }

            path.verification_history.push(PathVerification {
                timestamp: Utc::now(),
                success: true,
                action_index: index,
                ocr_result: ocr_summary,
                vlm_result: vlm_summary,
                failure_reason: None,
            });
            self.shadow.replace(shadow).await;
            completed += 1;
        }

        let success = failure_reason.is_none();
        let duration_ms = start.elapsed().as_millis() as f64;
        path.metadata.record_execution(success, duration_ms);

        PathOutcome {
            success,
            failure_reason,
            actions_completed: completed,
        }
    }

    // --- Entry point: navigateTo ----------------------------------------

    pub async fn navigate_to(&self, target: &str) -> NavigateOutcome {
        let mut graph = self.graph.lock().await;
        self.navigate_to_locked(&mut graph, target).await
    }

    /// `navigateTo` state machine (spec §4.C8): S0 INIT -> S1 LEARNED -> S2
    /// VERIFY (folded into `execute_path_locked`) -> S4 DONE_OK / S5
    /// DONE_FAIL.
    async fn navigate_to_locked(&self, graph: &mut NavigationGraph, target: &str) -> NavigateOutcome {
        // S0 INIT
        let current = match graph.current_node_id().cloned() {
            Some(id) => id,
            None => match self.identify_current_node_locked(graph).await {
                Some(id) => id,
                None => {
                    return NavigateOutcome {
                        success: false,
                        current_node: None,
                        message: "failed to identify current screen".to_string(),
                    }
                }
            },
        };

        // Find an existing outgoing path whose destination's program name
        // matches the target, else learn one fresh (scenario S3).
        let existing = graph
            .get_paths_from(&current)
            .iter()
            .find(|p| {
                p.to_node_id
                    .program_name
                    .to_lowercase()
                    .contains(&target.to_lowercase())
            })
            .cloned();

        let mut path = match existing {
            Some(p) => p,
            None => match self.learn_path_locked(&current, target).await {
                Ok(p) => p,
                Err(e) => {
                    return NavigateOutcome {
                        success: false,
                        current_node: Some(current),
                        message: format!("learning failed: {e}"),
                    }
                }
            },
        };

        // S1 LEARNED -> S2 VERIFY (per-action, inside execute_path_locked)
        let outcome = self.execute_path_locked(graph, &mut path).await;

        if outcome.success {
            // S4 DONE_OK: re-identify, patch the placeholder destination, commit.
            match self.identify_current_node_locked(graph).await {
                Some(new_id) => {
                    path.to_node_id = new_id.clone();
                    if let Err(e) = graph.add_path(path) {
                        tracing::warn!("navigateTo: failed to persist learned path: {e}");
                    }
                    if let Err(e) = graph.save() {
                        tracing::warn!("navigateTo: failed to save graph: {e}");
                    }
                    NavigateOutcome {
                        success: true,
                        current_node: Some(new_id),
                        message: "navigation succeeded".to_string(),
                    }
                }
                None => NavigateOutcome {
                    success: false,
                    current_node: None,
                    message: "action sequence succeeded but destination could not be re-identified"
                        .to_string(),
                },
            }
        } else {
            // S5 DONE_FAIL: do not commit the target; metadata was already
            // updated by `execute_path_locked`.
            NavigateOutcome {
                success: false,
                current_node: Some(current),
                message: outcome
                    .failure_reason
                    .unwrap_or_else(|| "navigation failed".to_string()),
            }
        }
    }

    // --- Getters ---------------------------------------------------------

    pub async fn get_current_node(&self) -> CurrentNodeInfo {
        let graph = self.graph.lock().await;
        let current_node = graph.current_node_id().cloned();
        let available_paths = current_node
            .as_ref()
            .map(|id| graph.get_paths_from(id).to_vec())
            .unwrap_or_default();
        CurrentNodeInfo {
            current_node: current_node.clone(),
            available_paths,
            graph_stats: GraphStats {
                node_count: graph.node_count(),
                current_node_id: current_node,
            },
        }
    }

    // --- `launch_app` tool op (spec §6) -----------------------------------

    /// Hotkey(command+space) -> Type(appName) -> Enter, settle, re-identify
    /// (spec §6 `launch_app`).
    pub async fn launch_app(&self, app_name: &str) -> bool {
        let mut graph = self.graph.lock().await;

        if !self
            .executor
            .execute(&ActionData::hotkey(vec![Modifier::Command], vec!["space"]))
            .await
        {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        let type_action = ActionData::Type {
            text: app_name.to_string(),
            press_enter: true,
            delay_ms: 20,
        };
        if !self.executor.execute(&type_action).await {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        self.identify_current_node_locked(&mut graph).await.is_some()
    }

    /// `closeCurrentApp` helper (spec §4.C8): not part of navigation, exposed
    /// for external callers.
    pub async fn close_current_app(&self) -> bool {
        self.executor.close_current_app().await
    }
}
