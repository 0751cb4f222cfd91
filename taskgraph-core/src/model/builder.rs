//! Graph Model Builder
//!
//! Pure transform from live entities to a [`GraphSnapshot`].
//!
//! # Rules
//!
//! 1. One node per agent and one per task of the workspace.
//! 2. One assignment edge per task with an assigned agent.
//! 3. One dependency edge per stored dependency record, tagged with its type.
//! 4. One subagent edge per subagent session whose task is assigned to a
//!    different agent: the task's assignee is taken to have spawned the
//!    session's agent. This is inferred through the shared task only and can
//!    link agents that merely work on the same task.
//! 5. One `subtask_of` dependency edge per task with a parent task.
//!
//! No cycle validation happens here. Any edge with an endpoint outside the
//! node set is dropped without error.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::edge::Edge;
use super::node::{AgentNodeData, Node, NodeId, TaskNodeData};
use super::GraphSnapshot;
use crate::entity::{Agent, Dependency, Session, SessionType, Task};

/// Everything the builder reads. Sessions are keyed by agent id.
#[derive(Debug, Clone, Copy)]
pub struct GraphInputs<'a> {
    pub agents: &'a [Agent],
    pub tasks: &'a [Task],
    pub dependencies: &'a [Dependency],
    pub sessions: &'a IndexMap<String, Session>,
}

/// Builds snapshots for one workspace.
#[derive(Debug, Clone)]
pub struct GraphModelBuilder {
    workspace_id: String,
}

impl GraphModelBuilder {
    /// Create a builder for one workspace.
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
        }
    }

    /// Workspace whose entities are kept.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Build a snapshot. Entities of other workspaces are ignored.
    pub fn build(&self, inputs: GraphInputs<'_>) -> GraphSnapshot {
        let agents: Vec<&Agent> = inputs
            .agents
            .iter()
            .filter(|agent| agent.workspace_id == self.workspace_id)
            .collect();
        let tasks: Vec<&Task> = inputs
            .tasks
            .iter()
            .filter(|task| task.workspace_id == self.workspace_id)
            .collect();

        let mut open_tasks: HashMap<&str, usize> = HashMap::new();
        for task in tasks.iter().filter(|task| task.is_open()) {
            if let Some(agent_id) = task.assigned_agent_id.as_deref() {
                *open_tasks.entry(agent_id).or_default() += 1;
            }
        }

        let mut subagents: HashMap<&str, usize> = HashMap::new();
        for (agent_id, session) in inputs.sessions {
            if session.session_type == SessionType::Subagent {
                *subagents.entry(agent_id.as_str()).or_default() += 1;
            }
        }

        let mut nodes = Vec::with_capacity(agents.len() + tasks.len());
        for agent in &agents {
            nodes.push(Node::agent(AgentNodeData {
                agent: (*agent).clone(),
                task_count: open_tasks.get(agent.id.as_str()).copied().unwrap_or(0),
                subagent_count: subagents.get(agent.id.as_str()).copied().unwrap_or(0),
            }));
        }
        for task in &tasks {
            nodes.push(Node::task(TaskNodeData {
                task: (*task).clone(),
                deliverable_count: 0,
                total_deliverables: 0,
            }));
        }

        let mut edges = EdgeCollector::new(&nodes);

        for task in &tasks {
            if let Some(agent_id) = task.assigned_agent_id.as_deref() {
                edges.push(Edge::assignment(agent_id, &task.id));
            }
        }

        for dep in inputs.dependencies {
            edges.push(Edge::dependency(
                &dep.id,
                &dep.source_task_id,
                &dep.target_task_id,
                dep.dependency_type,
            ));
        }

        let tasks_by_id: HashMap<&str, &Task> =
            tasks.iter().map(|task| (task.id.as_str(), *task)).collect();
        for (agent_id, session) in inputs.sessions {
            if session.session_type != SessionType::Subagent {
                continue;
            }
            let Some(task_id) = session.task_id.as_deref() else {
                continue;
            };
            let parent = tasks_by_id
                .get(task_id)
                .and_then(|task| task.assigned_agent_id.as_deref());
            if let Some(parent_id) = parent.filter(|parent_id| *parent_id != agent_id.as_str()) {
                edges.push(Edge::subagent(parent_id, agent_id));
            }
        }

        for task in &tasks {
            if let Some(parent_id) = task.parent_task_id.as_deref() {
                edges.push(Edge::subtask(parent_id, &task.id));
            }
        }

        let (edges, dropped) = edges.finish();
        debug!(
            workspace_id = %self.workspace_id,
            nodes = nodes.len(),
            edges = edges.len(),
            dropped,
            "built graph snapshot"
        );

        GraphSnapshot { nodes, edges }
    }
}

/// Accepts edges whose endpoints are known and counts the rest.
struct EdgeCollector {
    known: IndexSet<NodeId>,
    edges: Vec<Edge>,
    dropped: usize,
}

impl EdgeCollector {
    fn new(nodes: &[Node]) -> Self {
        Self {
            known: nodes.iter().map(|node| node.id.clone()).collect(),
            edges: Vec::new(),
            dropped: 0,
        }
    }

    fn push(&mut self, edge: Edge) {
        if self.known.contains(&edge.source) && self.known.contains(&edge.target) {
            self.edges.push(edge);
        } else {
            self.dropped += 1;
        }
    }

    fn finish(self) -> (Vec<Edge>, usize) {
        (self.edges, self.dropped)
    }
}
