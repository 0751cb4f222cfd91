//! Graph View
//!
//! [`GraphView`] runs the whole pipeline for one view instance:
//!
//! ```text
//! entities ─▶ GraphModelBuilder ─▶ ReconciliationController ─▶ VirtualizationSelector ─▶ RenderFrame
//!                                        ▲           │
//!                        pins (store) ───┘           └── drag-stop ─▶ FlushDriver ─▶ PositionStore
//! ```
//!
//! Everything here is synchronous except the two fetches made on workspace
//! entry (dependencies and stored positions) and the position flush. Fetch
//! results come back through [`GraphView::apply_dependencies`] and
//! [`GraphView::apply_positions`] together with the [`FetchTicket`] handed
//! out by [`GraphView::enter_workspace`]. A result whose ticket belongs to an
//! earlier workspace entry is ignored.

use std::borrow::Cow;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::GraphConfig;
use crate::entity::{Agent, Dependency, Session, Task};
use crate::error::Result;
use crate::interaction::InteractionController;
use crate::model::{edges_among, Edge, GraphInputs, GraphModelBuilder, GraphSnapshot, Node, NodeId, Position};
use crate::persist::{DependencySource, DragStop, FlushDriver, PositionPersistence, PositionRecord, PositionStore};
use crate::reconcile::{ReconcileOutcome, ReconciliationController};
use crate::virtualize::VirtualizationSelector;

/// Identifies one workspace entry. Fetch results carry it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    workspace_id: String,
    generation: u64,
}

impl FetchTicket {
    /// Workspace the fetch was issued for.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Workspace entry counter at the time of the fetch.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What the rendering collaborator draws after one pipeline run.
#[derive(Debug)]
pub struct RenderFrame<'a> {
    pub outcome: ReconcileOutcome,
    /// Full rendered state.
    pub nodes: &'a [Node],
    pub edges: &'a [Edge],
    /// Virtualized subset and the edges among it.
    pub visible_nodes: Cow<'a, [Node]>,
    pub visible_edges: Vec<&'a Edge>,
}

impl RenderFrame<'_> {
    /// No agents or tasks: the host shows its placeholder.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when only a subset of the nodes is visible.
    pub fn is_virtualized(&self) -> bool {
        self.visible_nodes.len() < self.nodes.len()
    }
}

/// Orchestrates one graph view over one workspace at a time.
#[derive(Debug)]
pub struct GraphView {
    config: GraphConfig,
    generation: u64,
    dependencies: Vec<Dependency>,
    builder: GraphModelBuilder,
    reconciler: ReconciliationController,
    selector: VirtualizationSelector,
    interaction: InteractionController,
    flusher: FlushDriver,
    last_snapshot: GraphSnapshot,
}

impl GraphView {
    /// Create a view over `workspace_id`. Fails on an invalid config.
    pub fn new(
        workspace_id: impl Into<String>,
        config: GraphConfig,
        store: Arc<dyn PositionStore>,
    ) -> Result<Self> {
        config.validate()?;
        let workspace_id = workspace_id.into();
        Ok(Self {
            generation: 0,
            dependencies: Vec::new(),
            builder: GraphModelBuilder::new(workspace_id.clone()),
            reconciler: ReconciliationController::from_config(workspace_id.clone(), &config),
            selector: VirtualizationSelector::new(config.virtualization_threshold),
            interaction: InteractionController::new(),
            flusher: FlushDriver::new(PositionPersistence::from_config(workspace_id, &config), store),
            last_snapshot: GraphSnapshot::default(),
            config,
        })
    }

    /// Options the view was created with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Workspace currently shown.
    pub fn workspace_id(&self) -> &str {
        self.builder.workspace_id()
    }

    /// Rendered state.
    pub fn reconciler(&self) -> &ReconciliationController {
        &self.reconciler
    }

    /// Gesture state.
    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    /// Gesture state, for reporting gestures.
    pub fn interaction_mut(&mut self) -> &mut InteractionController {
        &mut self.interaction
    }

    /// Last known dependencies of the workspace.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Drag-stops staged but not yet written.
    pub fn pending_positions(&self) -> usize {
        self.flusher.pending_len()
    }

    /// True when nothing is rendered.
    pub fn is_empty(&self) -> bool {
        self.reconciler.is_empty()
    }

    /// Ticket of the current workspace entry.
    pub fn ticket(&self) -> FetchTicket {
        FetchTicket {
            workspace_id: self.workspace_id().to_owned(),
            generation: self.generation,
        }
    }

    /// Switch to `workspace_id` and start over. The returned ticket must
    /// accompany the dependency and position fetches for this entry.
    ///
    /// Drags still waiting out the debounce are written to the previous
    /// workspace first.
    pub fn enter_workspace(&mut self, workspace_id: impl Into<String>) -> FetchTicket {
        let workspace_id = workspace_id.into();
        self.generation += 1;
        self.builder = GraphModelBuilder::new(workspace_id.clone());
        self.reconciler.reset(workspace_id.clone());
        self.flusher.flush_now();
        self.flusher.reset(&workspace_id);
        self.interaction.reset();
        self.dependencies.clear();
        self.last_snapshot = GraphSnapshot::default();

        debug!(workspace_id = %workspace_id, generation = self.generation, "entered workspace");
        self.ticket()
    }

    fn is_current(&self, ticket: &FetchTicket, what: &str) -> bool {
        let current = ticket.generation == self.generation && ticket.workspace_id == self.workspace_id();
        if !current {
            debug!(
                workspace_id = %ticket.workspace_id,
                generation = ticket.generation,
                current_generation = self.generation,
                what,
                "ignoring stale fetch result"
            );
        }
        current
    }

    /// Take the result of a dependency fetch. Returns whether it was applied.
    ///
    /// Failures keep the last known dependencies.
    pub fn apply_dependencies(&mut self, ticket: &FetchTicket, result: Result<Vec<Dependency>>) -> bool {
        if !self.is_current(ticket, "dependencies") {
            return false;
        }
        match result {
            Ok(dependencies) => {
                debug!(workspace_id = %ticket.workspace_id, count = dependencies.len(), "dependencies loaded");
                self.dependencies = dependencies;
                true
            }
            Err(err) => {
                warn!(workspace_id = %ticket.workspace_id, error = %err, "dependency fetch failed");
                false
            }
        }
    }

    /// Take the result of a position fetch and seed pins from it.
    pub fn apply_positions(&mut self, ticket: &FetchTicket, result: Result<Vec<PositionRecord>>) -> bool {
        if !self.is_current(ticket, "positions") {
            return false;
        }
        match result {
            Ok(records) => {
                let pins: Vec<(NodeId, Position)> = records
                    .iter()
                    .filter(|record| record.pinned && record.workspace_id == ticket.workspace_id)
                    .filter_map(|record| Some((record.graph_node_id()?, record.position())))
                    .collect();
                debug!(workspace_id = %ticket.workspace_id, pins = pins.len(), "positions loaded");
                self.reconciler.seed_pins(pins);
                true
            }
            Err(err) => {
                warn!(workspace_id = %ticket.workspace_id, error = %err, "position fetch failed");
                false
            }
        }
    }

    /// Record a dependency the host just created.
    pub fn insert_dependency(&mut self, dependency: Dependency) {
        self.dependencies.retain(|existing| existing.id != dependency.id);
        self.dependencies.push(dependency);
    }

    /// Forget a dependency the host just deleted.
    pub fn remove_dependency(&mut self, dependency_id: &str) {
        self.dependencies.retain(|existing| existing.id != dependency_id);
    }

    /// Stored dependency id behind a rendered edge, if it is a dependency
    /// edge. Parent/child edges are derived from tasks and have none.
    pub fn dependency_for_edge(&self, edge_id: &str) -> Option<&str> {
        self.reconciler
            .edges()
            .iter()
            .find(|edge| edge.id == edge_id)
            .and_then(Edge::dependency_record_id)
    }

    /// Rebuild from fresh entities and reconcile.
    pub fn refresh(
        &mut self,
        agents: &[Agent],
        tasks: &[Task],
        sessions: &IndexMap<String, Session>,
    ) -> RenderFrame<'_> {
        let snapshot = self.builder.build(GraphInputs {
            agents,
            tasks,
            dependencies: &self.dependencies,
            sessions,
        });
        self.last_snapshot = snapshot.clone();
        let outcome = self.reconciler.reconcile(snapshot, self.interaction.view());
        self.frame(outcome)
    }

    /// Reconcile the last snapshot again, e.g. after a view-state change.
    pub fn rerender(&mut self) -> RenderFrame<'_> {
        let outcome = self
            .reconciler
            .reconcile(self.last_snapshot.clone(), self.interaction.view());
        self.frame(outcome)
    }

    /// Lay the rendered graph out again. Pins are kept.
    pub fn relayout(&mut self) -> RenderFrame<'_> {
        let outcome = self.reconciler.relayout();
        self.frame(outcome)
    }

    /// A node was dropped at `position`: move and pin it, then stage the
    /// coordinate for persistence. Timeline drags only move the node.
    pub fn on_drag_stop(&mut self, node_id: &NodeId, position: Position) -> Result<()> {
        if self.reconciler.move_node(node_id, position)?.pinned {
            self.flusher.stage(DragStop::new(node_id.clone(), position));
        }
        Ok(())
    }

    /// Write staged positions now instead of waiting for the debounce.
    pub fn flush_positions(&self) {
        self.flusher.flush_now();
    }

    fn frame(&self, outcome: ReconcileOutcome) -> RenderFrame<'_> {
        let nodes = self.reconciler.nodes();
        let edges = self.reconciler.edges();
        let visible_nodes = self.selector.select(nodes);
        let visible_edges = match &visible_nodes {
            Cow::Borrowed(_) => edges.iter().collect(),
            Cow::Owned(subset) => edges_among(edges, subset),
        };
        RenderFrame {
            outcome,
            nodes,
            edges,
            visible_nodes,
            visible_edges,
        }
    }
}

/// Fetch the dependencies of a workspace entry, for
/// [`GraphView::apply_dependencies`].
pub async fn fetch_dependencies(
    source: Arc<dyn DependencySource>,
    ticket: FetchTicket,
) -> (FetchTicket, Result<Vec<Dependency>>) {
    let result = source.fetch(&ticket.workspace_id).await;
    (ticket, result)
}

/// Fetch the stored positions of a workspace entry, for
/// [`GraphView::apply_positions`].
pub async fn fetch_positions(
    store: Arc<dyn PositionStore>,
    ticket: FetchTicket,
) -> (FetchTicket, Result<Vec<PositionRecord>>) {
    let result = store.load(&ticket.workspace_id).await;
    (ticket, result)
}
