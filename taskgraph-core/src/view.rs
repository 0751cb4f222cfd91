//! View Modes
//!
//! Position-only overrides applied after layout.
//!
//! - Timeline puts agents on one row in insertion order and tasks on a second
//!   row ordered by creation time.
//! - Grouping shifts whole buckets of nodes sideways by a fixed spacing,
//!   keeping their y and relative x.
//!
//! Both are pure functions of their input and the view state, so applying
//! them to the same layout output always gives the same positions. Edges are
//! never touched.

use serde::{Deserialize, Serialize};

use crate::config::TimelineOptions;
use crate::model::{Node, NodePayload, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Default,
    Timeline,
}

impl ViewMode {
    /// The other mode, for the toggle shortcut.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Default => ViewMode::Timeline,
            ViewMode::Timeline => ViewMode::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    None,
    Workspace,
    Role,
}

/// Ephemeral presentation state. Any change forces a full relayout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub mode: ViewMode,
    pub group_by: GroupBy,
}

/// Bucket a node falls into when grouping.
///
/// Variant order is the sort order: labelled buckets first, alphabetically,
/// then everything without a label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum BucketKey {
    Label(String),
    Unlabelled,
}

/// Applies the view-mode overrides.
#[derive(Debug, Clone)]
pub struct ViewModeTransformer {
    timeline: TimelineOptions,
    group_spacing: f64,
}

impl ViewModeTransformer {
    /// Create a transformer with timeline row options and group spacing.
    pub fn new(timeline: TimelineOptions, group_spacing: f64) -> Self {
        Self {
            timeline,
            group_spacing,
        }
    }

    /// Apply every override selected by `view` to freshly laid out nodes.
    pub fn apply(&self, nodes: &mut [Node], view: &ViewState, workspace_id: &str) {
        if view.mode == ViewMode::Timeline {
            self.timeline(nodes);
        }
        match view.group_by {
            GroupBy::None => {}
            GroupBy::Workspace => self.group(nodes, |_| BucketKey::Label(workspace_id.to_owned())),
            GroupBy::Role => self.group(nodes, |node| match &node.payload {
                NodePayload::Agent(data) => BucketKey::Label(data.agent.role.clone()),
                NodePayload::Task(_) => BucketKey::Unlabelled,
            }),
        }
    }

    /// Two fixed rows: agents in insertion order, tasks by creation time.
    pub fn timeline(&self, nodes: &mut [Node]) {
        let opts = &self.timeline;

        let mut column = 0usize;
        let mut tasks = Vec::new();
        for (index, node) in nodes.iter_mut().enumerate() {
            match &node.payload {
                NodePayload::Agent(_) => {
                    node.position = Position::new(column as f64 * opts.column_width, opts.agent_row_y);
                    column += 1;
                }
                NodePayload::Task(data) => tasks.push((data.task.created_at, index)),
            }
        }

        // Stable: equal timestamps keep their original order.
        tasks.sort_by_key(|&(created_at, _)| created_at);
        for (column, (_, index)) in tasks.into_iter().enumerate() {
            nodes[index].position = Position::new(column as f64 * opts.column_width, opts.task_row_y);
        }
    }

    fn group<F>(&self, nodes: &mut [Node], key_of: F)
    where
        F: Fn(&Node) -> BucketKey,
    {
        let keys: Vec<BucketKey> = nodes.iter().map(key_of).collect();
        let mut buckets = keys.clone();
        buckets.sort();
        buckets.dedup();

        let offsets: Vec<f64> = keys
            .iter()
            .map(|key| {
                let bucket = buckets.binary_search(key).unwrap_or(0);
                bucket as f64 * self.group_spacing
            })
            .collect();
        for (node, offset) in nodes.iter_mut().zip(offsets) {
            node.position.x += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::fixtures;
    use crate::entity::{AgentStatus, TaskStatus};
    use crate::model::{AgentNodeData, TaskNodeData};

    fn transformer() -> ViewModeTransformer {
        ViewModeTransformer::new(TimelineOptions::default(), 800.0)
    }

    fn agent_node(id: &str, role: &str, x: f64) -> Node {
        let mut agent = fixtures::agent(id, AgentStatus::Standby);
        agent.role = role.into();
        let mut node = Node::agent(AgentNodeData {
            agent,
            task_count: 0,
            subagent_count: 0,
        });
        node.position = Position::new(x, 10.0);
        node
    }

    fn task_node(id: &str, created_secs: i64, x: f64) -> Node {
        let mut node = Node::task(TaskNodeData {
            task: fixtures::task(id, TaskStatus::Inbox, None, created_secs),
            deliverable_count: 0,
            total_deliverables: 0,
        });
        node.position = Position::new(x, 50.0);
        node
    }

    #[test]
    fn timeline_orders_tasks_by_creation() {
        let mut nodes = vec![
            task_node("late", 30, 0.0),
            agent_node("a1", "dev", 0.0),
            task_node("early", 10, 0.0),
            task_node("tie", 30, 0.0),
            agent_node("a2", "dev", 0.0),
        ];

        transformer().timeline(&mut nodes);

        let at = |i: usize| nodes[i].position;
        assert_eq!(at(1), Position::new(0.0, 0.0));
        assert_eq!(at(4), Position::new(260.0, 0.0));
        assert_eq!(at(2), Position::new(0.0, 300.0));
        assert_eq!(at(0), Position::new(260.0, 300.0));
        assert_eq!(at(3), Position::new(520.0, 300.0));
    }

    #[test]
    fn timeline_is_idempotent() {
        let mut nodes = vec![task_node("t1", 5, 3.0), agent_node("a1", "dev", 7.0)];
        let view = ViewState {
            mode: ViewMode::Timeline,
            group_by: GroupBy::None,
        };

        transformer().apply(&mut nodes, &view, "ws");
        let once = nodes.clone();
        transformer().apply(&mut nodes, &view, "ws");
        assert_eq!(nodes, once);
    }

    #[test]
    fn role_groups_sort_by_key() {
        let mut nodes = vec![
            agent_node("a1", "writer", 0.0),
            agent_node("a2", "analyst", 100.0),
            task_node("t1", 0, 200.0),
            agent_node("a3", "writer", 300.0),
        ];
        let view = ViewState {
            mode: ViewMode::Default,
            group_by: GroupBy::Role,
        };

        transformer().apply(&mut nodes, &view, "ws");

        // analyst = 0, writer = 1, tasks = 2
        let xs: Vec<f64> = nodes.iter().map(|node| node.position.x).collect();
        assert_eq!(xs, vec![800.0, 100.0, 1800.0, 1100.0]);
        assert!(nodes.iter().filter(|n| n.as_agent().is_some()).all(|n| n.position.y == 10.0));
    }

    #[test]
    fn role_grouping_is_pure() {
        let base = vec![agent_node("a1", "writer", 0.0), agent_node("a2", "analyst", 0.0)];
        let view = ViewState {
            mode: ViewMode::Default,
            group_by: GroupBy::Role,
        };

        let mut first = base.clone();
        transformer().apply(&mut first, &view, "ws");
        let mut second = base.clone();
        transformer().apply(&mut second, &view, "ws");
        assert_eq!(first, second);
    }

    #[test]
    fn workspace_grouping_is_a_single_bucket() {
        let mut nodes = vec![agent_node("a1", "dev", 5.0), task_node("t1", 0, 9.0)];
        let before = nodes.clone();
        let view = ViewState {
            mode: ViewMode::Default,
            group_by: GroupBy::Workspace,
        };

        transformer().apply(&mut nodes, &view, "ws");
        assert_eq!(nodes, before);
    }

    #[test]
    fn mode_toggles() {
        assert_eq!(ViewMode::Default.toggled(), ViewMode::Timeline);
        assert_eq!(ViewMode::Timeline.toggled(), ViewMode::Default);
    }
}
