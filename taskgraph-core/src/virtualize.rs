//! Node virtualization for large graphs.
//!
//! Above the threshold only a bounded subset is rendered: every active node
//! (working agent, task in progress or in planning), then other nodes in
//! their existing order until the budget is used up. Edge filtering is left
//! to the caller, see [`crate::model::edges_among`].

use std::borrow::Cow;

use tracing::debug;

use crate::model::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualizationSelector {
    threshold: usize,
}

impl VirtualizationSelector {
    /// Create a selector rendering at most `threshold` nodes.
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Node budget above which the graph is trimmed.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Pick the nodes to render. At or below the threshold this borrows the
    /// input unchanged.
    pub fn select<'a>(&self, nodes: &'a [Node]) -> Cow<'a, [Node]> {
        if nodes.len() <= self.threshold {
            return Cow::Borrowed(nodes);
        }

        let (priority, others): (Vec<&Node>, Vec<&Node>) =
            nodes.iter().partition(|node| node.is_active());
        let budget = self.threshold.saturating_sub(priority.len());

        let selected: Vec<Node> = priority
            .iter()
            .chain(others.iter().take(budget))
            .map(|&node| node.clone())
            .collect();

        debug!(
            total = nodes.len(),
            priority = priority.len(),
            rendered = selected.len(),
            "virtualized node set"
        );
        Cow::Owned(selected)
    }
}

impl Default for VirtualizationSelector {
    fn default() -> Self {
        Self::new(100)
    }
}
