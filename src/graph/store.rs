// Navigation Graph — spec §4.C6, §3 "NavigationGraph", §3 Invariants I1-I5.
//
// Grounded on `tools::patterns::PersistentPatternStore` (`load`/`save` pair,
// write-to-temp-then-rename atomicity, `version` field) for persistence;
// the upsert/lookup operations are new, since the teacher has no graph
// structure to generalize from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path as FsPath, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::model::{Node, NodeId, Path};

use super::codec::{decode, encode, GraphDocument};

/// Persisted directed multigraph of Nodes and outgoing Paths, keyed by
/// source NodeId (spec §3 NavigationGraph).
pub struct NavigationGraph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<NodeId, Vec<Path>>,
    current_node_id: Option<NodeId>,
    created_at: DateTime<Utc>,
    path: PathBuf,
}

impl NavigationGraph {
    /// Load from `path`, or bootstrap a fresh graph if the file is absent
    /// or unreadable (spec §4.C6 "Bootstrap", §7 #6 GraphCorruption).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<GraphDocument>(&contents) {
                Ok(doc) => {
                    let decoded = decode(doc);
                    return Self {
                        nodes: decoded.nodes,
                        edges: decoded.edges,
                        current_node_id: decoded.current_node_id,
                        created_at: decoded.created_at,
                        path,
                    };
                }
                Err(e) => {
                    tracing::warn!("graph file at {} is corrupt, starting empty: {e}", path.display());
                }
            },
            Err(_) => {
                tracing::info!("no graph file at {}, bootstrapping", path.display());
            }
        }

        Self::bootstrap(path)
    }

    fn bootstrap(path: PathBuf) -> Self {
        let mut graph = Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            current_node_id: None,
            created_at: Utc::now(),
            path,
        };
        graph.nodes.insert(NodeId::spotlight(), Node::spotlight());
        graph
    }

    /// Atomic write-to-temp-then-rename (spec §4.C6 "Write discipline").
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let doc = encode(&self.nodes, &self.edges, self.current_node_id.clone(), self.created_at);
        let json = serde_json::to_string_pretty(&doc).context("failed to serialize navigation graph")?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json)
            .with_context(|| format!("failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!("failed to rename {} to {}", temp_path.display(), self.path.display())
        })?;

        Ok(())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.current_node_id = None;
        self.nodes.insert(NodeId::spotlight(), Node::spotlight());
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Re-identification path: bump `visit_count`/`last_visited_at` on an
    /// existing node, or insert it fresh.
    pub fn update_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Path upsert rule (spec §4.C6, invariant I2, property P4): replaces
    /// any existing entry with the same `id` or the same `to_node_id`,
    /// else appends. Refuses to store a path whose destination is still
    /// the `"pending"` placeholder (open question (c), property P6).
    pub fn add_path(&mut self, path: Path) -> Result<()> {
        anyhow::ensure!(
            !path.is_pending(),
            "refusing to persist a path with a pending destination"
        );

        let outgoing = self.edges.entry(path.from_node_id.clone()).or_default();
        if let Some(existing) = outgoing
            .iter_mut()
            .find(|p| p.id == path.id || p.to_node_id == path.to_node_id)
        {
            *existing = path;
        } else {
            outgoing.push(path);
        }
        Ok(())
    }

    pub fn get_paths_from(&self, from: &NodeId) -> &[Path] {
        self.edges.get(from).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_path(&self, from: &NodeId, to: &NodeId) -> Option<&Path> {
        self.edges
            .get(from)
            .and_then(|paths| paths.iter().find(|p| &p.to_node_id == to))
    }

    pub fn update_path(&mut self, path: Path) -> Result<()> {
        self.add_path(path)
    }

    pub fn delete_path(&mut self, from: &NodeId, path_id: uuid::Uuid) -> bool {
        if let Some(outgoing) = self.edges.get_mut(from) {
            let before = outgoing.len();
            outgoing.retain(|p| p.id != path_id);
            return outgoing.len() != before;
        }
        false
    }

    pub fn current_node_id(&self) -> Option<&NodeId> {
        self.current_node_id.as_ref()
    }

    pub fn set_current_node_id(&mut self, id: NodeId) {
        self.current_node_id = Some(id);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LearnedBy, PathMetadata, PathValidation};

    fn temp_graph_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("navbrain-test-{}.json", uuid::Uuid::new_v4()));
        p
    }

    fn committed_path(from: NodeId, to: NodeId) -> Path {
        Path {
            id: uuid::Uuid::new_v4(),
            from_node_id: from,
            to_node_id: to,
            actions: Vec::new(),
            validation: PathValidation::default(),
            verification_history: Vec::new(),
            metadata: PathMetadata::new(LearnedBy::Vlm),
        }
    }

    /// Scenario S1: fresh filesystem bootstraps exactly the Spotlight node.
    #[test]
    fn fresh_graph_bootstraps_spotlight_with_zero_visits() {
        let graph = NavigationGraph::load(temp_graph_path());
        assert_eq!(graph.node_count(), 1);
        let spotlight = graph.get_node(&NodeId::spotlight()).unwrap();
        assert_eq!(spotlight.visit_count, 0);
        assert!(graph.get_paths_from(&NodeId::spotlight()).is_empty());
    }

    /// Property P3, at the store layer: save then load preserves content.
    #[test]
    fn save_then_load_round_trips() {
        let path = temp_graph_path();
        let mut graph = NavigationGraph::load(&path);

        let a = NodeId::new("Finder", "aaaa000000000000");
        let b = NodeId::new("Finder", "bbbb000000000000");
        graph.add_node(Node::new(a.clone(), Vec::new()));
        graph.add_node(Node::new(b.clone(), Vec::new()));
        graph.add_path(committed_path(a.clone(), b.clone())).unwrap();
        graph.save().unwrap();

        let reloaded = NavigationGraph::load(&path);
        assert_eq!(reloaded.node_count(), 3); // Spotlight + a + b
        assert_eq!(reloaded.get_paths_from(&a).len(), 1);
        assert_eq!(reloaded.get_path(&a, &b).unwrap().from_node_id, a);

        let _ = fs::remove_file(&path);
    }

    /// Property P4 / invariant I2: upsert by same id replaces, not appends.
    #[test]
    fn add_path_replaces_existing_entry_by_id() {
        let mut graph = NavigationGraph::load(temp_graph_path());
        let a = NodeId::new("Finder", "aaaa000000000000");
        let b = NodeId::new("Finder", "bbbb000000000000");

        let mut p = committed_path(a.clone(), b.clone());
        graph.add_path(p.clone()).unwrap();
        p.metadata.usage_count = 5;
        graph.add_path(p.clone()).unwrap();

        let outgoing = graph.get_paths_from(&a);
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].metadata.usage_count, 5);
    }

    /// Property P4 / invariant I2: upsert by same destination replaces too.
    #[test]
    fn add_path_replaces_existing_entry_by_destination() {
        let mut graph = NavigationGraph::load(temp_graph_path());
        let a = NodeId::new("Finder", "aaaa000000000000");
        let b = NodeId::new("Finder", "bbbb000000000000");

        graph.add_path(committed_path(a.clone(), b.clone())).unwrap();
        graph.add_path(committed_path(a.clone(), b.clone())).unwrap();

        assert_eq!(graph.get_paths_from(&a).len(), 1);
    }

    /// Property P6: a path with a pending destination is never persisted.
    #[test]
    fn add_path_rejects_pending_destination() {
        let mut graph = NavigationGraph::load(temp_graph_path());
        let learned = Path::learned(NodeId::spotlight(), Vec::new(), PathValidation::default());
        assert!(graph.add_path(learned).is_err());
    }

    /// Scenario S6: a truncated graph file loads as an empty (bootstrapped)
    /// graph rather than propagating a parse error.
    #[test]
    fn truncated_file_falls_back_to_bootstrap() {
        let path = temp_graph_path();
        fs::write(&path, b"{\"nodes\": [ not json").unwrap();

        let graph = NavigationGraph::load(&path);
        assert_eq!(graph.node_count(), 1);

        let _ = fs::remove_file(&path);
    }
}
