//! Graph Edges

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use crate::entity::DependencyType;

const DEPENDENCY_PREFIX: &str = "dep-";

/// The relation an edge draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "dependency_type", rename_all = "snake_case")]
pub enum EdgeKind {
    /// Agent to the task it is assigned to.
    Assignment,
    /// Task to task, tagged with the relation type. Parent/child links use
    /// [`DependencyType::SubtaskOf`].
    Dependency(DependencyType),
    /// Agent to a subagent inferred through a shared task.
    Subagent,
}

/// A directed edge between two nodes of the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    /// Agent → task edge, id `assign-{agent}-{task}`.
    pub fn assignment(agent_id: &str, task_id: &str) -> Self {
        Self {
            id: format!("assign-{agent_id}-{task_id}"),
            source: NodeId::agent(agent_id),
            target: NodeId::task(task_id),
            kind: EdgeKind::Assignment,
        }
    }

    /// Edge for a stored dependency, id `dep-{dependency}`.
    pub fn dependency(
        dependency_id: &str,
        source_task_id: &str,
        target_task_id: &str,
        dependency_type: DependencyType,
    ) -> Self {
        Self {
            id: format!("{DEPENDENCY_PREFIX}{dependency_id}"),
            source: NodeId::task(source_task_id),
            target: NodeId::task(target_task_id),
            kind: EdgeKind::Dependency(dependency_type),
        }
    }

    /// Parent → child task edge, id `subtask-{parent}-{child}`.
    pub fn subtask(parent_task_id: &str, child_task_id: &str) -> Self {
        Self {
            id: format!("subtask-{parent_task_id}-{child_task_id}"),
            source: NodeId::task(parent_task_id),
            target: NodeId::task(child_task_id),
            kind: EdgeKind::Dependency(DependencyType::SubtaskOf),
        }
    }

    /// Parent → subagent edge, id `subagent-{parent}-{agent}`.
    pub fn subagent(parent_agent_id: &str, agent_id: &str) -> Self {
        Self {
            id: format!("subagent-{parent_agent_id}-{agent_id}"),
            source: NodeId::agent(parent_agent_id),
            target: NodeId::agent(agent_id),
            kind: EdgeKind::Subagent,
        }
    }

    /// Relation type of a dependency edge.
    pub fn dependency_type(&self) -> Option<DependencyType> {
        match self.kind {
            EdgeKind::Dependency(kind) => Some(kind),
            EdgeKind::Assignment | EdgeKind::Subagent => None,
        }
    }

    /// Id of the stored dependency record behind this edge, if there is one.
    ///
    /// Parent/child edges are derived from the task itself and have no record.
    pub fn dependency_record_id(&self) -> Option<&str> {
        match self.kind {
            EdgeKind::Dependency(_) => self.id.strip_prefix(DEPENDENCY_PREFIX),
            EdgeKind::Assignment | EdgeKind::Subagent => None,
        }
    }
}
