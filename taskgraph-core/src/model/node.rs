//! Graph Nodes
//!
//! This module defines the visual units of the graph: one node per agent and
//! one node per task.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{Agent, AgentStatus, Task, TaskStatus};

/// Unique identifier for a node in one workspace's graph.
///
/// Ids are namespaced by kind (`agent-<id>`, `task-<id>`) so an agent and a
/// task sharing a raw entity id never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id of the node representing the given agent.
    pub fn agent(entity_id: &str) -> Self {
        Self(format!("{}{}", NodeKind::Agent.prefix(), entity_id))
    }

    /// Id of the node representing the given task.
    pub fn task(entity_id: &str) -> Self {
        Self(format!("{}{}", NodeKind::Task.prefix(), entity_id))
    }

    /// Get the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the id back into its kind and entity id.
    ///
    /// Returns `None` for ids that were not produced by [`NodeId::agent`] or
    /// [`NodeId::task`].
    pub fn parse(&self) -> Option<(NodeKind, &str)> {
        [NodeKind::Agent, NodeKind::Task].into_iter().find_map(|kind| {
            self.0
                .strip_prefix(kind.prefix())
                .filter(|rest| !rest.is_empty())
                .map(|rest| (kind, rest))
        })
    }

    /// The entity id without the kind prefix.
    pub fn entity_id(&self) -> Option<&str> {
        self.parse().map(|(_, id)| id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// The kind of entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Agent,
    Task,
}

impl NodeKind {
    fn prefix(self) -> &'static str {
        match self {
            NodeKind::Agent => "agent-",
            NodeKind::Task => "task-",
        }
    }
}

/// A point in graph space. Positions are node top-left corners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Agent payload plus the attributes derived while building the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNodeData {
    pub agent: Agent,
    /// Tasks assigned to this agent that are not done.
    pub task_count: usize,
    /// Subagent sessions keyed by this agent.
    pub subagent_count: usize,
}

/// Task payload. Deliverable counts are reserved and currently always zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNodeData {
    pub task: Task,
    pub deliverable_count: usize,
    pub total_deliverables: usize,
}

/// What a node carries, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum NodePayload {
    Agent(AgentNodeData),
    Task(TaskNodeData),
}

impl NodePayload {
    /// Kind of node this payload belongs to.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Agent(_) => NodeKind::Agent,
            NodePayload::Task(_) => NodeKind::Task,
        }
    }
}

/// A node in the rendered graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    /// Set once a user drag placed this node; layout passes keep its position.
    pub pinned: bool,
    pub payload: NodePayload,
}

impl Node {
    /// Create an unpositioned agent node.
    pub fn agent(data: AgentNodeData) -> Self {
        Self {
            id: NodeId::agent(&data.agent.id),
            position: Position::default(),
            pinned: false,
            payload: NodePayload::Agent(data),
        }
    }

    /// Create an unpositioned task node.
    pub fn task(data: TaskNodeData) -> Self {
        Self {
            id: NodeId::task(&data.task.id),
            position: Position::default(),
            pinned: false,
            payload: NodePayload::Task(data),
        }
    }

    /// Agent or task.
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// The agent behind an agent node.
    pub fn as_agent(&self) -> Option<&Agent> {
        match &self.payload {
            NodePayload::Agent(data) => Some(&data.agent),
            NodePayload::Task(_) => None,
        }
    }

    /// The task behind a task node.
    pub fn as_task(&self) -> Option<&Task> {
        match &self.payload {
            NodePayload::Task(data) => Some(&data.task),
            NodePayload::Agent(_) => None,
        }
    }

    /// Whether this node represents live work: a working agent or a task
    /// in progress or in planning.
    pub fn is_active(&self) -> bool {
        match &self.payload {
            NodePayload::Agent(data) => data.agent.status == AgentStatus::Working,
            NodePayload::Task(data) => matches!(
                data.task.status,
                TaskStatus::InProgress | TaskStatus::Planning
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::fixtures;

    #[test]
    fn node_ids_are_namespaced() {
        let agent = NodeId::agent("42");
        let task = NodeId::task("42");
        assert_ne!(agent, task);
        assert_eq!(agent.as_str(), "agent-42");
        assert_eq!(task.to_string(), "task-42");
    }

    #[test]
    fn node_ids_parse_back() {
        assert_eq!(NodeId::agent("a1").parse(), Some((NodeKind::Agent, "a1")));
        assert_eq!(NodeId::task("t-7").parse(), Some((NodeKind::Task, "t-7")));
        assert_eq!(NodeId::from("group-x").parse(), None);
        assert_eq!(NodeId::from("task-").parse(), None);
    }

    #[test]
    fn kind_follows_payload() {
        let node = Node::agent(AgentNodeData {
            agent: fixtures::agent("a1", AgentStatus::Standby),
            task_count: 0,
            subagent_count: 0,
        });
        assert_eq!(node.kind(), NodeKind::Agent);
        assert!(node.as_agent().is_some());
        assert!(node.as_task().is_none());
        assert!(!node.pinned);
    }

    #[test]
    fn activity_depends_on_status() {
        let working = Node::agent(AgentNodeData {
            agent: fixtures::agent("a1", AgentStatus::Working),
            task_count: 0,
            subagent_count: 0,
        });
        assert!(working.is_active());

        for (status, active) in [
            (TaskStatus::InProgress, true),
            (TaskStatus::Planning, true),
            (TaskStatus::Inbox, false),
            (TaskStatus::Done, false),
        ] {
            let node = Node::task(TaskNodeData {
                task: fixtures::task("t1", status, None, 0),
                deliverable_count: 0,
                total_deliverables: 0,
            });
            assert_eq!(node.is_active(), active, "{status:?}");
        }
    }
}
