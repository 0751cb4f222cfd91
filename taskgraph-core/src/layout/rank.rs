//! Rank Assignment
//!
//! Ranks are longest-path distances from the roots of the graph.
//!
//! # Algorithm
//!
//! 1. Break cycles: a depth-first walk in input order reverses every edge
//!    that points back to a node still on the walk stack. The result is
//!    acyclic, so every node is reached by the next step.
//! 2. Topologically sort with Kahn's algorithm, seeding the queue with
//!    in-degree-zero nodes in input order.
//! 3. Each node's rank is one more than the largest rank of its
//!    predecessors. Roots and isolated nodes get rank 0.
//!
//! Only the working copy of the edges is reversed; callers' edges are
//! untouched.

use std::collections::{HashSet, VecDeque};

use super::LayoutGraph;

/// Visit state for the cycle-breaking walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

/// Return an acyclic copy of `graph` by reversing back-edges.
pub(super) fn make_acyclic(graph: &LayoutGraph) -> LayoutGraph {
    let n = graph.len();
    let mut state = vec![Visit::New; n];
    let mut reversed = HashSet::new();

    for root in 0..n {
        if state[root] != Visit::New {
            continue;
        }
        // (node, index of the next successor to visit)
        let mut stack = vec![(root, 0usize)];
        state[root] = Visit::OnStack;

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(&succ) = graph.succ[node].get(next) {
                top.1 += 1;
                match state[succ] {
                    Visit::New => {
                        state[succ] = Visit::OnStack;
                        stack.push((succ, 0));
                    }
                    Visit::OnStack => {
                        reversed.insert((node, succ));
                    }
                    Visit::Done => {}
                }
            } else {
                state[node] = Visit::Done;
                stack.pop();
            }
        }
    }

    let mut acyclic = LayoutGraph::with_len(n);
    for (u, succs) in graph.succ.iter().enumerate() {
        for &v in succs {
            if reversed.contains(&(u, v)) {
                acyclic.add_edge(v, u);
            } else {
                acyclic.add_edge(u, v);
            }
        }
    }
    acyclic
}

/// Assign a longest-path rank to every node of an acyclic graph.
pub(super) fn assign_ranks(graph: &LayoutGraph) -> Vec<usize> {
    let n = graph.len();
    let mut in_degree: Vec<usize> = graph.pred.iter().map(|preds| preds.len()).collect();
    let mut ranks = vec![0usize; n];
    let mut visited = vec![false; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();

    // Kahn's algorithm
    while let Some(node) = queue.pop_front() {
        visited[node] = true;
        for &succ in &graph.succ[node] {
            ranks[succ] = ranks[succ].max(ranks[node] + 1);
            in_degree[succ] = in_degree[succ].saturating_sub(1);
            if in_degree[succ] == 0 {
                queue.push_back(succ);
            }
        }
    }

    // Unreachable for acyclic input; keeps every node placed regardless.
    if visited.iter().any(|seen| !seen) {
        let below = ranks.iter().copied().max().unwrap_or(0) + 1;
        for (node, seen) in visited.iter().enumerate() {
            if !seen {
                ranks[node] = below;
            }
        }
    }

    ranks
}
