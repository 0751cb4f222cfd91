//! Taskgraph Core
//!
//! This crate provides the synchronization and layout engine behind the
//! agent/task graph view. It implements:
//!
//! - Snapshot building from agents, tasks, dependencies and sessions
//! - Deterministic layered layout with timeline and grouping overrides
//! - Reconciliation that only relays out when topology or view changes
//! - Debounced persistence of user-dragged positions
//! - Virtualization of large graphs and gesture-to-command translation
//!
//! Rendering (pan, zoom, export) belongs to the host. This crate ends at
//! positions and commands.
//!
//! # Architecture
//!
//! - `entity`: records consumed from the CRUD layer and session tracker
//! - `model`: nodes, edges and the snapshot builder
//! - `layout`: the layered layout engine
//! - `view`: view state and position overrides
//! - `reconcile`: full relayout vs data-only merge
//! - `persist`: position staging, flushing and store contracts
//! - `virtualize`: bounded node subsets for large graphs
//! - `interaction`: context menus, connections and shortcuts
//! - `workspace`: the per-view orchestrator
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskgraph_core::{GraphConfig, GraphView, MemoryPositionStore};
//!
//! let store = Arc::new(MemoryPositionStore::new());
//! let mut view = GraphView::new("ws-1", GraphConfig::default(), store)?;
//!
//! let frame = view.refresh(&agents, &tasks, &sessions);
//! for node in frame.visible_nodes.iter() {
//!     draw(node.id.as_str(), node.position);
//! }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod persist;
pub mod reconcile;
pub mod view;
pub mod virtualize;
pub mod workspace;

pub use config::{Direction, GraphConfig, LayoutOptions, TimelineOptions};
pub use error::{GraphError, Result};
pub use interaction::{Command, InteractionController, MenuTarget, ViewportCommand};
pub use layout::LayoutEngine;
pub use model::{Edge, EdgeKind, GraphModelBuilder, GraphSnapshot, Node, NodeId, NodeKind, Position};
pub use persist::{
    DependencySource, FlushDriver, MemoryDependencySource, MemoryPositionStore, PositionPersistence,
    PositionRecord, PositionStore,
};
pub use reconcile::{ReconcileOutcome, ReconciliationController};
pub use view::{GroupBy, ViewMode, ViewModeTransformer, ViewState};
pub use virtualize::VirtualizationSelector;
pub use workspace::{fetch_dependencies, fetch_positions, FetchTicket, GraphView, RenderFrame};
