// Tool-invocable surface — spec §6.
//
// Grounded on `tools/types.rs`'s `ToolDefinition`/`ToolUse` shapes (the
// teacher's agent-facing tool vocabulary), repurposed here into the three
// operations an outer agent loop drives the Brain through: `navigate_to`,
// `get_current_node`, `launch_app`. Each method reshapes `BrainController`'s
// richer internal return types into the flat response shape spec §6
// describes for that operation.

use std::sync::Arc;

use serde::Serialize;

use super::BrainController;
use crate::model::{NodeId, Path};

/// `{success, currentNode, message}` (spec §6 `navigate_to`).
#[derive(Debug, Clone, Serialize)]
pub struct NavigateToResponse {
    pub success: bool,
    pub current_node: Option<NodeId>,
    pub message: String,
}

/// `{currentNode, availablePaths[], graphStats}` (spec §6 `get_current_node`).
#[derive(Debug, Clone, Serialize)]
pub struct GetCurrentNodeResponse {
    pub current_node: Option<NodeId>,
    pub available_paths: Vec<Path>,
    pub graph_stats: GraphStatsResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphStatsResponse {
    pub node_count: usize,
    pub current_node_id: Option<NodeId>,
}

/// `{success}` (spec §6 `launch_app`).
#[derive(Debug, Clone, Serialize)]
pub struct LaunchAppResponse {
    pub success: bool,
}

/// Thin tool-call-shaped wrapper around a `BrainController`. Holding an
/// `Arc` rather than a reference lets this surface be registered directly
/// as a tool-dispatch target in an outer agent loop (spec §6 "these three
/// operations are the entire tool-facing surface of the Brain").
#[derive(Clone)]
pub struct ToolSurface {
    brain: Arc<BrainController>,
}

impl ToolSurface {
    pub fn new(brain: Arc<BrainController>) -> Self {
        Self { brain }
    }

    /// `navigate_to({ target })` (spec §6).
    pub async fn navigate_to(&self, target: &str) -> NavigateToResponse {
        let outcome = self.brain.navigate_to(target).await;
        NavigateToResponse {
            success: outcome.success,
            current_node: outcome.current_node,
            message: outcome.message,
        }
    }

    /// `get_current_node({})` (spec §6).
    pub async fn get_current_node(&self) -> GetCurrentNodeResponse {
        let info = self.brain.get_current_node().await;
        GetCurrentNodeResponse {
            current_node: info.current_node,
            available_paths: info.available_paths,
            graph_stats: GraphStatsResponse {
                node_count: info.graph_stats.node_count,
                current_node_id: info.graph_stats.current_node_id,
            },
        }
    }

    /// `launch_app({ appName })` (spec §6).
    pub async fn launch_app(&self, app_name: &str) -> LaunchAppResponse {
        LaunchAppResponse {
            success: self.brain.launch_app(app_name).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_executor::InputBackend;
    use crate::config::BrainConfig;
    use crate::llm::orchestrator::Orchestrator;
    use crate::llm::providers::LocalHttpProvider;
    use crate::model::Modifier;
    use crate::perception::{SystemCapture, UnavailableOcr};

    struct NoopBackend;

    #[async_trait::async_trait]
    impl InputBackend for NoopBackend {
        async fn move_mouse(&self, _x: f64, _y: f64) -> anyhow::Result<()> {
            Ok(())
        }
        async fn click(
            &self,
            _x: f64,
            _y: f64,
            _button: crate::model::MouseButton,
            _double_click: bool,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn type_text(&self, _text: &str, _delay_ms: u64) -> anyhow::Result<()> {
            Ok(())
        }
        async fn press_key(&self, _key: &str, _modifiers: &[Modifier]) -> anyhow::Result<()> {
            Ok(())
        }
        async fn scroll(&self, _amount: i32, _direction_up: bool) -> anyhow::Result<()> {
            Ok(())
        }
        fn screen_size(&self) -> anyhow::Result<(f64, f64)> {
            Ok((1920.0, 1080.0))
        }
    }

    fn surface() -> ToolSurface {
        let mut path = std::env::temp_dir();
        path.push(format!("navbrain-tools-test-{}.json", uuid::Uuid::new_v4()));
        let config = BrainConfig::new().with_graph_path(path);

        let provider = Arc::new(LocalHttpProvider::new(None, "test-model").unwrap());
        let orchestrator = Arc::new(Orchestrator::new(provider, None, None));
        let brain = Arc::new(BrainController::new(
            orchestrator,
            Arc::new(UnavailableOcr),
            Arc::new(SystemCapture),
            Arc::new(NoopBackend),
            config,
        ));
        ToolSurface::new(brain)
    }

    #[tokio::test]
    async fn get_current_node_reports_graph_stats_on_fresh_graph() {
        let surface = surface();
        let resp = surface.get_current_node().await;
        assert_eq!(resp.graph_stats.node_count, 1);
        assert!(resp.current_node.is_none());
        assert!(resp.available_paths.is_empty());
    }

    #[tokio::test]
    async fn navigate_to_fails_gracefully_without_a_real_display() {
        let surface = surface();
        let resp = surface.navigate_to("Settings").await;
        assert!(!resp.success);
        assert!(!resp.message.is_empty());
    }
}
