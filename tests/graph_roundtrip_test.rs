// Black-box coverage for the Navigation Graph (spec §4.C6), properties
// P3/P6 and scenarios S1/S6.

use std::fs;

use navbrain::graph::NavigationGraph;
use navbrain::model::{Action, ActionData, LearnedBy, Node, NodeId, Path, PathMetadata, PathValidation, UiElement};
use navbrain::model::ElementKind;

fn temp_path() -> std::path::PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("navbrain-it-{}.json", uuid::Uuid::new_v4()));
    p
}

fn committed_path(from: NodeId, to: NodeId) -> Path {
    Path {
        id: uuid::Uuid::new_v4(),
        from_node_id: from,
        to_node_id: to,
        actions: vec![Action::new(ActionData::wait(0))],
        validation: PathValidation::default(),
        verification_history: Vec::new(),
        metadata: PathMetadata::new(LearnedBy::Vlm),
    }
}

/// Scenario S1: a fresh filesystem bootstraps a graph with exactly the
/// Spotlight node, zero visits, no edges.
#[test]
fn fresh_filesystem_bootstraps_spotlight_only() {
    let path = temp_path();
    let graph = NavigationGraph::load(&path);

    assert_eq!(graph.node_count(), 1);
    let spotlight = graph.get_node(&NodeId::spotlight()).expect("spotlight node");
    assert_eq!(spotlight.visit_count, 0);
    assert!(graph.get_paths_from(&NodeId::spotlight()).is_empty());
    assert!(graph.current_node_id().is_none());
}

/// Property P3: save then reload preserves node and edge content.
#[test]
fn save_then_load_round_trips_nodes_and_edges() {
    let path = temp_path();
    let mut graph = NavigationGraph::load(&path);

    let finder = NodeId::new("Finder", "abc123");
    let settings = NodeId::new("Settings", "def456");
    graph.add_node(Node::new(
        finder.clone(),
        vec![UiElement::new(ElementKind::Text).with_text("Finder")],
    ));
    graph.add_node(Node::new(
        settings.clone(),
        vec![UiElement::new(ElementKind::Text).with_text("Settings")],
    ));
    graph
        .add_path(committed_path(finder.clone(), settings.clone()))
        .expect("add_path should succeed for a committed destination");
    graph.set_current_node_id(finder.clone());
    graph.save().expect("save should succeed");

    let reloaded = NavigationGraph::load(&path);
    assert_eq!(reloaded.node_count(), graph.node_count());
    assert_eq!(reloaded.current_node_id(), Some(&finder));
    assert_eq!(reloaded.get_paths_from(&finder).len(), 1);
    assert_eq!(
        reloaded.get_paths_from(&finder)[0].to_node_id,
        settings
    );

    let _ = fs::remove_file(&path);
}

/// Property P6: the store refuses to persist a Path whose destination is
/// still the pending placeholder.
#[test]
fn add_path_refuses_pending_destination() {
    let path = temp_path();
    let mut graph = NavigationGraph::load(&path);
    let from = NodeId::new("Finder", "abc123");

    let pending = Path::learned(from.clone(), Vec::new(), PathValidation::default());
    assert!(graph.add_path(pending).is_err());
    assert!(graph.get_paths_from(&from).is_empty());
}

/// Property P4: re-adding a path with the same destination replaces the
/// existing entry rather than appending a duplicate.
#[test]
fn add_path_upserts_by_destination() {
    let path = temp_path();
    let mut graph = NavigationGraph::load(&path);
    let from = NodeId::new("Finder", "abc123");
    let to = NodeId::new("Settings", "def456");

    graph.add_path(committed_path(from.clone(), to.clone())).unwrap();
    graph.add_path(committed_path(from.clone(), to.clone())).unwrap();

    assert_eq!(graph.get_paths_from(&from).len(), 1);
}

/// Scenario S6: a truncated graph file loads as an empty (bootstrapped)
/// graph rather than panicking, and a subsequent save repairs it.
#[test]
fn truncated_graph_file_recovers_to_bootstrap_state() {
    let path = temp_path();
    fs::write(&path, b"{\"nodes\": [(\"Finder::abc\", {\"id\"").unwrap();

    let mut graph = NavigationGraph::load(&path);
    assert_eq!(graph.node_count(), 1);
    assert!(graph.get_node(&NodeId::spotlight()).is_some());

    graph.save().expect("save after recovery should succeed");
    let reloaded_contents = fs::read_to_string(&path).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&reloaded_contents).is_ok());

    let _ = fs::remove_file(&path);
}
