//! Debounced staging of drag-stop events.
//!
//! [`PositionPersistence`] is plain state driven by an explicit clock: the
//! caller passes `now` in, and asks for due batches when the deadline has
//! passed. The tokio driver in [`super::driver`] is one such caller.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::debug;

use super::store::PositionRecord;
use crate::config::{GraphConfig, MAX_STORE_BATCH};
use crate::model::{NodeId, Position};

/// A node was dropped at a new coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct DragStop {
    pub node_id: NodeId,
    pub position: Position,
}

impl DragStop {
    /// Create a drag-stop event.
    pub fn new(node_id: NodeId, position: Position) -> Self {
        Self { node_id, position }
    }
}

/// Pending position updates of one view instance.
#[derive(Debug)]
pub struct PositionPersistence {
    workspace_id: String,
    delay: Duration,
    max_batch_size: usize,
    /// Last write wins; insertion order is the flush order.
    pending: IndexMap<NodeId, Position>,
    deadline: Option<Instant>,
}

impl PositionPersistence {
    /// Create an empty stage. `max_batch_size` is clamped to the store limit.
    pub fn new(workspace_id: impl Into<String>, delay: Duration, max_batch_size: usize) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            delay,
            max_batch_size: max_batch_size.clamp(1, MAX_STORE_BATCH),
            pending: IndexMap::new(),
            deadline: None,
        }
    }

    /// Create a stage with the debounce and batch options of `config`.
    pub fn from_config(workspace_id: impl Into<String>, config: &GraphConfig) -> Self {
        Self::new(
            workspace_id,
            Duration::from_millis(config.debounce_ms),
            config.max_batch_size,
        )
    }

    /// Workspace the staged records are written to.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Debounce window.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Stage a drag-stop and re-arm the deadline. Returns the new deadline.
    pub fn record(&mut self, stop: DragStop, now: Instant) -> Instant {
        self.pending.insert(stop.node_id, stop.position);
        let deadline = now + self.delay;
        self.deadline = Some(deadline);
        deadline
    }

    /// When the staged updates fall due, if any are staged.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of distinct nodes staged.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take the staged updates if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Vec<Vec<PositionRecord>>> {
        match self.deadline {
            Some(deadline) if now >= deadline => Some(self.take_all()),
            _ => None,
        }
    }

    /// Take everything staged regardless of the deadline.
    pub fn take_all(&mut self) -> Vec<Vec<PositionRecord>> {
        self.deadline = None;
        let records: Vec<PositionRecord> = self
            .pending
            .drain(..)
            .filter_map(|(node_id, position)| {
                let record = PositionRecord::pinned(&self.workspace_id, &node_id, position);
                if record.is_none() {
                    debug!(node_id = %node_id, "skipping position for unparseable node id");
                }
                record
            })
            .collect();

        let batches: Vec<Vec<PositionRecord>> = records
            .chunks(self.max_batch_size)
            .map(<[PositionRecord]>::to_vec)
            .collect();
        debug!(
            workspace_id = %self.workspace_id,
            records = records.len(),
            batches = batches.len(),
            "positions due for flush"
        );
        batches
    }

    /// Drop everything staged.
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.deadline = None;
    }

    /// Cancel and retarget at another workspace.
    pub fn reset(&mut self, workspace_id: impl Into<String>) {
        self.cancel();
        self.workspace_id = workspace_id.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::NodeType;

    fn persistence() -> PositionPersistence {
        PositionPersistence::new("ws-1", Duration::from_millis(300), MAX_STORE_BATCH)
    }

    fn stop(id: &str, x: f64) -> DragStop {
        DragStop::new(NodeId::task(id), Position::new(x, 0.0))
    }

    #[test]
    fn nothing_due_before_the_deadline() {
        let mut p = persistence();
        let start = Instant::now();
        p.record(stop("t1", 1.0), start);

        assert!(p.take_due(start + Duration::from_millis(299)).is_none());
        assert_eq!(p.pending_len(), 1);
    }

    #[test]
    fn repeated_drags_flush_once_with_final_coordinates() {
        let mut p = persistence();
        let start = Instant::now();
        for step in 0..5 {
            p.record(stop("t1", step as f64), start + Duration::from_millis(step * 100));
        }

        // Each drag re-armed the deadline.
        assert!(p.take_due(start + Duration::from_millis(500)).is_none());

        let batches = p.take_due(start + Duration::from_millis(700)).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        let record = &batches[0][0];
        assert_eq!(record.node_id, "t1");
        assert_eq!(record.node_type, NodeType::Task);
        assert_eq!(record.x, 4.0);
        assert!(record.pinned);

        assert_eq!(p.pending_len(), 0);
        assert!(p.deadline().is_none());
        assert!(p.take_due(start + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn large_flushes_are_split_into_store_batches() {
        let mut p = PositionPersistence::new("ws-1", Duration::from_millis(300), 2);
        let now = Instant::now();
        for id in ["t1", "t2", "t3", "t4", "t5"] {
            p.record(stop(id, 0.0), now);
        }

        let batches = p.take_all();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn batch_size_is_capped_by_the_store_limit() {
        let mut p = PositionPersistence::new("ws-1", Duration::ZERO, 10_000);
        let now = Instant::now();
        for i in 0..(MAX_STORE_BATCH + 1) {
            p.record(stop(&format!("t{i}"), 0.0), now);
        }
        let sizes: Vec<usize> = p.take_all().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![MAX_STORE_BATCH, 1]);
    }

    #[test]
    fn cancel_discards_pending() {
        let mut p = persistence();
        let now = Instant::now();
        p.record(stop("t1", 1.0), now);

        p.reset("ws-2");

        assert_eq!(p.workspace_id(), "ws-2");
        assert!(p.take_due(now + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn unparseable_ids_are_skipped() {
        let mut p = persistence();
        let now = Instant::now();
        p.record(DragStop::new(NodeId::from("group-x"), Position::default()), now);
        p.record(stop("t1", 1.0), now);

        let batches = p.take_all();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }
}
