//! Reconciliation
//!
//! The reconciliation controller owns what is currently on screen and merges
//! every new snapshot into it with as little movement as possible.
//!
//! # Decision
//!
//! For each incoming [`GraphSnapshot`]:
//!
//! - **Full relayout** (layout → view overrides → pins → replace) when this is
//!   the first snapshot since the last reset, when the set of node ids differs
//!   from the last rendered set, or when the view state changed.
//! - **Data-only merge** otherwise: surviving nodes take the new payload but
//!   keep their position and pinned flag, vanished nodes are dropped, and the
//!   edge set is replaced wholesale (edges carry no visual state).
//!
//! Routine status updates therefore never move anything, while a node being
//! added or removed relays the graph out.
//!
//! # Pins
//!
//! A pinned node keeps its user-chosen coordinate through every full
//! relayout in the default view. The timeline view is a fixed arrangement and
//! ignores pins. Pins are seeded from the position store on workspace entry
//! and extended by drags made in the default view; they are cleared only by
//! a reset. A drag in the timeline view moves the node until the next
//! relayout but pins nothing, since row coordinates mean nothing outside it.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::debug;

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::layout::LayoutEngine;
use crate::model::{Edge, GraphSnapshot, Node, NodeId, Position};
use crate::view::{ViewMode, ViewModeTransformer, ViewState};

/// Lifecycle of the rendered state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// Nothing has been laid out since the last reset.
    Initial,
    /// A layout has been applied; later snapshots may merge.
    LaidOut,
}

/// Why a full relayout happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayoutReason {
    FirstSnapshot,
    TopologyChanged,
    ViewChanged,
    Requested,
}

/// What [`ReconciliationController::reconcile`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Relayout(RelayoutReason),
    Merged,
    /// The snapshot was empty; the rendered graph was cleared.
    Cleared,
}

/// Single source of truth for the rendered graph of one view instance.
#[derive(Debug)]
pub struct ReconciliationController {
    workspace_id: String,
    engine: LayoutEngine,
    transformer: ViewModeTransformer,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    phase: RenderPhase,
    last_node_ids: IndexSet<NodeId>,
    last_view: ViewState,
    pins: HashMap<NodeId, Position>,
}

impl ReconciliationController {
    /// Create an empty controller in the initial phase.
    pub fn new(
        workspace_id: impl Into<String>,
        engine: LayoutEngine,
        transformer: ViewModeTransformer,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            engine,
            transformer,
            nodes: Vec::new(),
            edges: Vec::new(),
            phase: RenderPhase::Initial,
            last_node_ids: IndexSet::new(),
            last_view: ViewState::default(),
            pins: HashMap::new(),
        }
    }

    /// Create a controller with the layout and view options of `config`.
    pub fn from_config(workspace_id: impl Into<String>, config: &GraphConfig) -> Self {
        Self::new(
            workspace_id,
            LayoutEngine::new(config.layout.clone()),
            ViewModeTransformer::new(config.timeline.clone(), config.group_spacing),
        )
    }

    /// Workspace the rendered graph belongs to.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Whether a layout has been applied since the last reset.
    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Rendered nodes with their current positions.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Rendered edges.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a rendered node.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// True when nothing is rendered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The view state of the last render.
    pub fn view(&self) -> &ViewState {
        &self.last_view
    }

    /// Forget everything and start over for another workspace.
    pub fn reset(&mut self, workspace_id: impl Into<String>) {
        self.workspace_id = workspace_id.into();
        self.nodes.clear();
        self.edges.clear();
        self.phase = RenderPhase::Initial;
        self.last_node_ids.clear();
        self.last_view = ViewState::default();
        self.pins.clear();
    }

    /// Merge a new snapshot into the rendered state.
    pub fn reconcile(&mut self, snapshot: GraphSnapshot, view: ViewState) -> ReconcileOutcome {
        if snapshot.is_empty() {
            self.nodes.clear();
            self.edges.clear();
            self.last_node_ids.clear();
            self.last_view = view;
            debug!(workspace_id = %self.workspace_id, "snapshot empty, cleared graph");
            return ReconcileOutcome::Cleared;
        }

        let ids = snapshot.node_ids();
        let reason = if self.phase == RenderPhase::Initial {
            Some(RelayoutReason::FirstSnapshot)
        } else if !same_ids(&ids, &self.last_node_ids) {
            Some(RelayoutReason::TopologyChanged)
        } else if view != self.last_view {
            Some(RelayoutReason::ViewChanged)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                self.relayout_with(snapshot, ids, view, reason);
                ReconcileOutcome::Relayout(reason)
            }
            None => {
                self.merge(snapshot);
                ReconcileOutcome::Merged
            }
        }
    }

    /// Lay the currently rendered graph out again on request.
    pub fn relayout(&mut self) -> ReconcileOutcome {
        if self.nodes.is_empty() {
            return ReconcileOutcome::Cleared;
        }
        let snapshot = GraphSnapshot {
            nodes: std::mem::take(&mut self.nodes),
            edges: std::mem::take(&mut self.edges),
        };
        let ids = snapshot.node_ids();
        let view = self.last_view;
        self.relayout_with(snapshot, ids, view, RelayoutReason::Requested);
        ReconcileOutcome::Relayout(RelayoutReason::Requested)
    }

    /// Record a user drag: move the node and, in the default view, pin it
    /// there. The returned node's `pinned` flag tells whether it was pinned.
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> Result<&Node> {
        let pin = self.last_view.mode == ViewMode::Default;
        let node = self
            .nodes
            .iter_mut()
            .find(|node| &node.id == id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        node.position = position;
        if pin {
            node.pinned = true;
            self.pins.insert(id.clone(), position);
        }
        Ok(node)
    }

    /// Add stored pins. Rendered nodes in the default view move at once.
    pub fn seed_pins<I>(&mut self, pins: I)
    where
        I: IntoIterator<Item = (NodeId, Position)>,
    {
        self.pins.extend(pins);
        if self.last_view.mode == ViewMode::Default {
            self.apply_pins();
        }
    }

    /// Pinned coordinate of a node, if any.
    pub fn pin(&self, id: &NodeId) -> Option<Position> {
        self.pins.get(id).copied()
    }

    fn relayout_with(
        &mut self,
        snapshot: GraphSnapshot,
        ids: IndexSet<NodeId>,
        view: ViewState,
        reason: RelayoutReason,
    ) {
        let mut nodes = self.engine.layout(&snapshot.nodes, &snapshot.edges);
        self.transformer.apply(&mut nodes, &view, &self.workspace_id);
        for node in &mut nodes {
            node.pinned = false;
        }

        self.nodes = nodes;
        self.edges = snapshot.edges;
        if view.mode == ViewMode::Default {
            self.apply_pins();
        }
        self.last_node_ids = ids;
        self.last_view = view;
        self.phase = RenderPhase::LaidOut;

        debug!(
            workspace_id = %self.workspace_id,
            ?reason,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "full relayout"
        );
    }

    fn merge(&mut self, snapshot: GraphSnapshot) {
        let mut incoming: HashMap<NodeId, Node> = snapshot
            .nodes
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect();

        self.nodes.retain_mut(|node| match incoming.remove(&node.id) {
            Some(fresh) => {
                node.payload = fresh.payload;
                true
            }
            None => false,
        });
        self.edges = snapshot.edges;

        debug!(
            workspace_id = %self.workspace_id,
            nodes = self.nodes.len(),
            "merged snapshot data"
        );
    }

    fn apply_pins(&mut self) {
        for node in &mut self.nodes {
            if let Some(position) = self.pins.get(&node.id) {
                node.position = *position;
                node.pinned = true;
            }
        }
    }
}

fn same_ids(a: &IndexSet<NodeId>, b: &IndexSet<NodeId>) -> bool {
    a.len() == b.len() && a.iter().all(|id| b.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::fixtures::{self, WORKSPACE};
    use crate::entity::{AgentStatus, TaskStatus};
    use crate::model::{AgentNodeData, NodePayload, TaskNodeData};
    use crate::view::GroupBy;

    fn controller() -> ReconciliationController {
        ReconciliationController::from_config(WORKSPACE, &GraphConfig::default())
    }

    fn task_node(id: &str, status: TaskStatus) -> Node {
        Node::task(TaskNodeData {
            task: fixtures::task(id, status, Some("a1"), 0),
            deliverable_count: 0,
            total_deliverables: 0,
        })
    }

    fn snapshot(tasks: &[(&str, TaskStatus)]) -> GraphSnapshot {
        let mut nodes = vec![Node::agent(AgentNodeData {
            agent: fixtures::agent("a1", AgentStatus::Working),
            task_count: tasks.len(),
            subagent_count: 0,
        })];
        let mut edges = Vec::new();
        for (id, status) in tasks {
            nodes.push(task_node(id, *status));
            edges.push(Edge::assignment("a1", id));
        }
        GraphSnapshot { nodes, edges }
    }

    fn positions(controller: &ReconciliationController) -> Vec<(NodeId, Position)> {
        controller
            .nodes()
            .iter()
            .map(|node| (node.id.clone(), node.position))
            .collect()
    }

    #[test]
    fn first_snapshot_lays_out() {
        let mut c = controller();
        assert_eq!(c.phase(), RenderPhase::Initial);

        let outcome = c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());

        assert_eq!(outcome, ReconcileOutcome::Relayout(RelayoutReason::FirstSnapshot));
        assert_eq!(c.phase(), RenderPhase::LaidOut);
        assert_eq!(c.nodes().len(), 2);
        assert_eq!(c.edges().len(), 1);
    }

    #[test]
    fn identical_snapshot_changes_nothing() {
        let mut c = controller();
        let a = snapshot(&[("t1", TaskStatus::Inbox), ("t2", TaskStatus::Inbox)]);
        c.reconcile(a.clone(), ViewState::default());
        let before = positions(&c);

        let outcome = c.reconcile(a, ViewState::default());

        assert_eq!(outcome, ReconcileOutcome::Merged);
        assert_eq!(positions(&c), before);
    }

    #[test]
    fn payload_change_keeps_positions() {
        let mut c = controller();
        c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());
        c.move_node(&NodeId::task("t1"), Position::new(999.0, 5.0)).unwrap();
        let before = positions(&c);

        let outcome = c.reconcile(snapshot(&[("t1", TaskStatus::Review)]), ViewState::default());

        assert_eq!(outcome, ReconcileOutcome::Merged);
        assert_eq!(positions(&c), before);
        let task = c.node(&NodeId::task("t1")).unwrap();
        assert!(task.pinned);
        match &task.payload {
            NodePayload::Task(data) => assert_eq!(data.task.status, TaskStatus::Review),
            other => panic!("expected task payload, got {other:?}"),
        }
    }

    #[test]
    fn new_node_triggers_relayout() {
        let mut c = controller();
        c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());

        let outcome = c.reconcile(
            snapshot(&[("t1", TaskStatus::Inbox), ("t2", TaskStatus::Inbox)]),
            ViewState::default(),
        );

        assert_eq!(outcome, ReconcileOutcome::Relayout(RelayoutReason::TopologyChanged));
        assert_eq!(c.nodes().len(), 3);
    }

    #[test]
    fn removed_node_triggers_relayout() {
        let mut c = controller();
        c.reconcile(
            snapshot(&[("t1", TaskStatus::Inbox), ("t2", TaskStatus::Inbox)]),
            ViewState::default(),
        );

        let outcome = c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());

        assert_eq!(outcome, ReconcileOutcome::Relayout(RelayoutReason::TopologyChanged));
        assert!(c.node(&NodeId::task("t2")).is_none());
    }

    #[test]
    fn view_change_triggers_relayout() {
        let mut c = controller();
        let a = snapshot(&[("t1", TaskStatus::Inbox)]);
        c.reconcile(a.clone(), ViewState::default());

        let grouped = ViewState {
            mode: ViewMode::Default,
            group_by: GroupBy::Role,
        };
        let outcome = c.reconcile(a.clone(), grouped);
        assert_eq!(outcome, ReconcileOutcome::Relayout(RelayoutReason::ViewChanged));

        // Same view again merges.
        assert_eq!(c.reconcile(a, grouped), ReconcileOutcome::Merged);
    }

    #[test]
    fn pins_survive_relayout_in_default_view() {
        let mut c = controller();
        c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());
        let dragged = Position::new(-400.0, 1234.0);
        c.move_node(&NodeId::task("t1"), dragged).unwrap();

        c.reconcile(
            snapshot(&[("t1", TaskStatus::Inbox), ("t2", TaskStatus::Inbox)]),
            ViewState::default(),
        );

        let node = c.node(&NodeId::task("t1")).unwrap();
        assert_eq!(node.position, dragged);
        assert!(node.pinned);
        assert!(!c.node(&NodeId::task("t2")).unwrap().pinned);
    }

    #[test]
    fn timeline_ignores_pins() {
        let mut c = controller();
        let a = snapshot(&[("t1", TaskStatus::Inbox)]);
        c.reconcile(a.clone(), ViewState::default());
        c.move_node(&NodeId::task("t1"), Position::new(-400.0, 1234.0)).unwrap();

        let timeline = ViewState {
            mode: ViewMode::Timeline,
            group_by: GroupBy::None,
        };
        c.reconcile(a, timeline);

        let node = c.node(&NodeId::task("t1")).unwrap();
        assert_eq!(node.position, Position::new(0.0, 300.0));
        assert!(!node.pinned);
    }

    #[test]
    fn timeline_drag_does_not_pin() {
        let mut c = controller();
        let a = snapshot(&[("t1", TaskStatus::Inbox)]);
        c.reconcile(a.clone(), ViewState::default());
        let laid_out = c.node(&NodeId::task("t1")).unwrap().position;

        let timeline = ViewState {
            mode: ViewMode::Timeline,
            group_by: GroupBy::None,
        };
        c.reconcile(a.clone(), timeline);
        let moved = c.move_node(&NodeId::task("t1"), Position::new(5.0, 5.0)).unwrap();
        assert_eq!(moved.position, Position::new(5.0, 5.0));
        assert!(!moved.pinned);
        assert!(c.pin(&NodeId::task("t1")).is_none());

        c.reconcile(a, ViewState::default());
        let node = c.node(&NodeId::task("t1")).unwrap();
        assert_eq!(node.position, laid_out);
        assert!(!node.pinned);
    }

    #[test]
    fn seeded_pins_apply_to_rendered_nodes() {
        let mut c = controller();
        c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());

        c.seed_pins([(NodeId::task("t1"), Position::new(7.0, 8.0))]);

        let node = c.node(&NodeId::task("t1")).unwrap();
        assert_eq!(node.position, Position::new(7.0, 8.0));
        assert!(node.pinned);
    }

    #[test]
    fn moving_an_unknown_node_fails() {
        let mut c = controller();
        let err = c.move_node(&NodeId::task("ghost"), Position::default()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(_)));
    }

    #[test]
    fn empty_snapshot_clears_and_next_one_relays_out() {
        let mut c = controller();
        c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());

        assert_eq!(
            c.reconcile(GraphSnapshot::default(), ViewState::default()),
            ReconcileOutcome::Cleared
        );
        assert!(c.is_empty());

        let outcome = c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());
        assert_eq!(outcome, ReconcileOutcome::Relayout(RelayoutReason::TopologyChanged));
    }

    #[test]
    fn reset_returns_to_initial() {
        let mut c = controller();
        c.reconcile(snapshot(&[("t1", TaskStatus::Inbox)]), ViewState::default());
        c.move_node(&NodeId::task("t1"), Position::new(1.0, 1.0)).unwrap();

        c.reset("ws-2");

        assert_eq!(c.phase(), RenderPhase::Initial);
        assert_eq!(c.workspace_id(), "ws-2");
        assert!(c.is_empty());
        assert!(c.pin(&NodeId::task("t1")).is_none());
    }

    #[test]
    fn requested_relayout_keeps_pins() {
        let mut c = controller();
        c.reconcile(
            snapshot(&[("t1", TaskStatus::Inbox), ("t2", TaskStatus::Inbox)]),
            ViewState::default(),
        );
        let dragged = Position::new(50.0, 60.0);
        c.move_node(&NodeId::task("t2"), dragged).unwrap();

        let outcome = c.relayout();

        assert_eq!(outcome, ReconcileOutcome::Relayout(RelayoutReason::Requested));
        assert_eq!(c.node(&NodeId::task("t2")).unwrap().position, dragged);
        assert_eq!(c.nodes().len(), 3);
    }
}
