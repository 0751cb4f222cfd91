//! Layout Engine
//!
//! This module computes positions for every node of a snapshot with a
//! layered (hierarchical) placement.
//!
//! # Phases
//!
//! 1. Rank: longest path from the roots, after reversing back-edges so that
//!    cyclic dependency sets still rank (see [`rank`]).
//! 2. Order: barycenter sweeps reduce crossings between adjacent ranks (see
//!    [`order`]).
//! 3. Place: (rank, order) maps to (x, y). Rank thickness follows the
//!    tallest node in the rank, since agent cards are taller than task cards,
//!    and every rank is centered against the widest one.
//!
//! # Determinism
//!
//! The engine never consults hash iteration order or ids; every tie is broken
//! by input position. Identical ordered input yields identical positions,
//! which keeps reconciliation idempotent and output snapshot-testable.

mod order;
mod rank;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::config::{Direction, LayoutOptions};
use crate::model::{Edge, Node, NodeId, NodeKind, Position};

/// Adjacency list of one node. Most nodes have a handful of neighbours.
type Neighbours = SmallVec<[usize; 4]>;

/// Index-based working copy of the graph.
///
/// Self-loops and duplicate edges are dropped on insertion.
#[derive(Debug, Clone, Default)]
struct LayoutGraph {
    succ: Vec<Neighbours>,
    pred: Vec<Neighbours>,
}

impl LayoutGraph {
    fn with_len(n: usize) -> Self {
        Self {
            succ: vec![Neighbours::new(); n],
            pred: vec![Neighbours::new(); n],
        }
    }

    fn len(&self) -> usize {
        self.succ.len()
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if from == to || self.succ[from].contains(&to) {
            return;
        }
        self.succ[from].push(to);
        self.pred[to].push(from);
    }
}

/// Layered layout with fixed options.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    options: LayoutOptions,
}

impl LayoutEngine {
    /// Create an engine with the given spacing and direction.
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    /// Spacing and direction in use.
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Rendered height of a node of the given kind.
    pub fn node_height(&self, kind: NodeKind) -> f64 {
        match kind {
            NodeKind::Agent => self.options.node_height + self.options.agent_extra_height,
            NodeKind::Task => self.options.node_height,
        }
    }

    /// Return `nodes` in the same order with a position assigned to each.
    ///
    /// Edges with an endpoint outside `nodes` are ignored. Never fails: cyclic
    /// edge sets are ranked best-effort and every node is placed.
    pub fn layout(&self, nodes: &[Node], edges: &[Edge]) -> Vec<Node> {
        if nodes.is_empty() {
            return Vec::new();
        }

        let index: IndexMap<&NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (&node.id, i))
            .collect();

        let mut graph = LayoutGraph::with_len(nodes.len());
        for edge in edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target)) {
                graph.add_edge(from, to);
            }
        }

        let acyclic = rank::make_acyclic(&graph);
        let ranks = rank::assign_ranks(&acyclic);
        let mut buckets = order::rank_buckets(&ranks);
        order::minimize_crossings(&mut buckets, &ranks, &acyclic, self.options.max_crossing_passes);

        let heights: Vec<f64> = nodes.iter().map(|node| self.node_height(node.kind())).collect();
        let positions = self.place(&buckets, &heights);

        trace!(nodes = nodes.len(), ranks = buckets.len(), "layout complete");

        nodes
            .iter()
            .zip(positions)
            .map(|(node, position)| Node {
                position,
                ..node.clone()
            })
            .collect()
    }

    /// Map (rank, order) to top-left coordinates.
    fn place(&self, buckets: &[Vec<usize>], heights: &[f64]) -> Vec<Position> {
        let opts = &self.options;
        let width = opts.node_width;
        let mut positions = vec![Position::default(); heights.len()];

        match opts.direction {
            Direction::TopBottom => {
                // Ranks are rows. Each row is as tall as its tallest node and
                // shorter nodes are centered in it.
                let spans: Vec<f64> = buckets
                    .iter()
                    .map(|bucket| row_span(bucket.len(), width, opts.node_separation))
                    .collect();
                let widest = spans.iter().copied().fold(0.0, f64::max);

                let mut y = 0.0;
                for (bucket, span) in buckets.iter().zip(&spans) {
                    let thickness = bucket.iter().map(|&n| heights[n]).fold(0.0, f64::max);
                    let shift = (widest - span) / 2.0;
                    for (slot, &node) in bucket.iter().enumerate() {
                        positions[node] = Position::new(
                            shift + slot as f64 * (width + opts.node_separation),
                            y + (thickness - heights[node]) / 2.0,
                        );
                    }
                    y += thickness + opts.rank_separation;
                }
            }
            Direction::LeftRight => {
                // Ranks are columns of fixed width; nodes stack by height.
                let spans: Vec<f64> = buckets
                    .iter()
                    .map(|bucket| column_span(bucket, heights, opts.node_separation))
                    .collect();
                let widest = spans.iter().copied().fold(0.0, f64::max);

                for (rank, (bucket, span)) in buckets.iter().zip(&spans).enumerate() {
                    let x = rank as f64 * (width + opts.rank_separation);
                    let mut y = (widest - span) / 2.0;
                    for &node in bucket {
                        positions[node] = Position::new(x, y);
                        y += heights[node] + opts.node_separation;
                    }
                }
            }
        }

        positions
    }
}

fn row_span(count: usize, width: f64, gap: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    count as f64 * width + (count - 1) as f64 * gap
}

fn column_span(bucket: &[usize], heights: &[f64], gap: f64) -> f64 {
    if bucket.is_empty() {
        return 0.0;
    }
    let total: f64 = bucket.iter().map(|&n| heights[n]).sum();
    total + (bucket.len() - 1) as f64 * gap
}
