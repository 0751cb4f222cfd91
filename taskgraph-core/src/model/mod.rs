//! Graph Model
//!
//! This module turns live entities into the node/edge snapshot that the rest
//! of the pipeline lays out and renders.
//!
//! # Overview
//!
//! - Nodes represent agents and tasks. Their payload is a tagged union so a
//!   task node can never carry agent data.
//! - Edges represent assignment (agent → task), dependency (task → task,
//!   including parent/child) and inferred subagent (agent → agent) relations.
//!
//! A [`GraphSnapshot`] is rebuilt from scratch on every data change. It is
//! never persisted; the reconciliation layer diffs it against what is on
//! screen.

mod builder;
mod edge;
mod node;

use indexmap::IndexSet;

pub use builder::{GraphInputs, GraphModelBuilder};
pub use edge::{Edge, EdgeKind};
pub use node::{AgentNodeData, Node, NodeId, NodeKind, NodePayload, Position, TaskNodeData};

/// The full set of nodes and edges derived from source data at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// True when there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in snapshot order.
    pub fn node_ids(&self) -> IndexSet<NodeId> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Edges of one kind, in snapshot order.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }
}

/// Keep only the edges whose endpoints are both in `nodes`.
pub fn edges_among<'a>(edges: &'a [Edge], nodes: &[Node]) -> Vec<&'a Edge> {
    let ids: IndexSet<&NodeId> = nodes.iter().map(|node| &node.id).collect();
    edges
        .iter()
        .filter(|edge| ids.contains(&edge.source) && ids.contains(&edge.target))
        .collect()
}
