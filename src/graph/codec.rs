// On-disk schema — spec §6 "Graph file".
//
// `nodes`/`edges` are list-of-pair encodings keyed by `"<program>::<hash>"`;
// timestamps are ISO-8601 strings on disk. Grounded on the teacher's
// `tools::patterns::PersistentPatternStore` (flat serde struct, `version`
// field, tolerant of unknown future fields via serde's default behavior).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeId, Path};

pub const GRAPH_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<(String, Node)>,
    pub edges: Vec<(String, Vec<Path>)>,
    #[serde(rename = "currentNodeId")]
    pub current_node_id: Option<NodeId>,
    pub version: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// In-memory encode of the graph's current state. Edge-list order per
/// source node is preserved verbatim (spec §4.C6 "MUST be preserved in
/// write order").
pub fn encode(
    nodes: &HashMap<NodeId, Node>,
    edges: &HashMap<NodeId, Vec<Path>>,
    current_node_id: Option<NodeId>,
    created_at: DateTime<Utc>,
) -> GraphDocument {
    GraphDocument {
        nodes: nodes
            .iter()
            .map(|(id, node)| (id.disk_key(), node.clone()))
            .collect(),
        edges: edges
            .iter()
            .map(|(id, paths)| (id.disk_key(), paths.clone()))
            .collect(),
        current_node_id,
        version: GRAPH_VERSION.to_string(),
        created_at,
        updated_at: Utc::now(),
    }
}

pub struct DecodedGraph {
    pub nodes: HashMap<NodeId, Node>,
    pub edges: HashMap<NodeId, Vec<Path>>,
    pub current_node_id: Option<NodeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inverse of [`encode`]. Unknown fields in the document are tolerated by
/// serde's default deny-nothing behavior (spec §6 "MUST tolerate future
/// reader-compatible additions").
pub fn decode(doc: GraphDocument) -> DecodedGraph {
    let nodes = doc
        .nodes
        .into_iter()
        .filter_map(|(key, node)| Some((NodeId::from_disk_key(&key)?, node)))
        .collect();
    let edges = doc
        .edges
        .into_iter()
        .filter_map(|(key, paths)| Some((NodeId::from_disk_key(&key)?, paths)))
        .collect();

    DecodedGraph {
        nodes,
        edges,
        current_node_id: doc.current_node_id,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    }
}
