//! Store contracts and in-memory backends.
//!
//! The position store upserts by `(workspace_id, node_type, node_id)`, so
//! repeating a write is harmless. The dependency source is the CRUD layer
//! that owns task relations.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::MAX_STORE_BATCH;
use crate::entity::{Dependency, NewDependency};
use crate::error::{GraphError, Result};
use crate::model::{NodeId, NodeKind, Position};

/// Node type column of a stored position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Agent,
    Task,
    Group,
}

impl From<NodeKind> for NodeType {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Agent => NodeType::Agent,
            NodeKind::Task => NodeType::Task,
        }
    }
}

/// One stored node coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub workspace_id: String,
    pub node_type: NodeType,
    /// Entity id, without the `agent-`/`task-` prefix.
    pub node_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub pinned: bool,
    /// Stamped by the store on write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PositionRecord {
    /// Build a pinned record for a rendered node.
    pub fn pinned(workspace_id: &str, node: &NodeId, position: Position) -> Option<Self> {
        let (kind, entity_id) = node.parse()?;
        Some(Self {
            workspace_id: workspace_id.to_owned(),
            node_type: kind.into(),
            node_id: entity_id.to_owned(),
            x: position.x,
            y: position.y,
            pinned: true,
            updated_at: None,
        })
    }

    /// Rendered node id for this record. Group records have none.
    pub fn graph_node_id(&self) -> Option<NodeId> {
        match self.node_type {
            NodeType::Agent => Some(NodeId::agent(&self.node_id)),
            NodeType::Task => Some(NodeId::task(&self.node_id)),
            NodeType::Group => None,
        }
    }

    /// Stored coordinate.
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    fn key(&self) -> StoreKey {
        (self.workspace_id.clone(), self.node_type, self.node_id.clone())
    }
}

/// Persistent storage for node positions.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn load(&self, workspace_id: &str) -> Result<Vec<PositionRecord>>;

    /// Upsert one batch of 1..=500 records.
    async fn upsert(&self, batch: &[PositionRecord]) -> Result<()>;
}

/// Source of persisted task dependencies.
#[async_trait]
pub trait DependencySource: Send + Sync {
    async fn fetch(&self, workspace_id: &str) -> Result<Vec<Dependency>>;

    /// Create a dependency between two tasks of `workspace_id`.
    async fn create(&self, workspace_id: &str, request: &NewDependency) -> Result<Dependency>;

    async fn delete(&self, dependency_id: &str) -> Result<()>;
}

/// Reject batches the store contract does not accept.
pub fn check_batch(batch: &[PositionRecord]) -> Result<()> {
    if batch.is_empty() || batch.len() > MAX_STORE_BATCH {
        return Err(GraphError::Store(format!(
            "batch of {} records outside 1..={MAX_STORE_BATCH}",
            batch.len()
        )));
    }
    Ok(())
}

type StoreKey = (String, NodeType, String);

/// In-memory [`PositionStore`] for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    records: DashMap<StoreKey, PositionRecord>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryPositionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with a store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `upsert` calls received, including failed ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up one record by its upsert key.
    pub fn get(&self, workspace_id: &str, node_type: NodeType, node_id: &str) -> Option<PositionRecord> {
        let key = (workspace_id.to_owned(), node_type, node_id.to_owned());
        self.records.get(&key).map(|entry| entry.value().clone())
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GraphError::Store("position store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn load(&self, workspace_id: &str) -> Result<Vec<PositionRecord>> {
        self.check_available()?;
        let mut records: Vec<PositionRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == workspace_id)
            .map(|entry| entry.value().clone())
            .collect();
        // DashMap iteration order is arbitrary.
        records.sort_by(|a, b| (a.node_type, &a.node_id).cmp(&(b.node_type, &b.node_id)));
        Ok(records)
    }

    async fn upsert(&self, batch: &[PositionRecord]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        check_batch(batch)?;

        let now = Utc::now();
        for record in batch {
            let mut stored = record.clone();
            stored.updated_at = Some(now);
            self.records.insert(record.key(), stored);
        }
        Ok(())
    }
}

/// In-memory [`DependencySource`] keyed by workspace.
#[derive(Debug, Default)]
pub struct MemoryDependencySource {
    workspaces: DashMap<String, Vec<Dependency>>,
    next_id: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryDependencySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the dependencies of one workspace.
    pub fn insert(&self, workspace_id: &str, dependency: Dependency) {
        self.workspaces
            .entry(workspace_id.to_owned())
            .or_default()
            .push(dependency);
    }

    /// Make every following call fail with a store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GraphError::Store("dependency source unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DependencySource for MemoryDependencySource {
    async fn fetch(&self, workspace_id: &str) -> Result<Vec<Dependency>> {
        self.check_available()?;
        Ok(self
            .workspaces
            .get(workspace_id)
            .map(|deps| deps.value().clone())
            .unwrap_or_default())
    }

    async fn create(&self, workspace_id: &str, request: &NewDependency) -> Result<Dependency> {
        self.check_available()?;
        if request.source_task_id == request.target_task_id {
            return Err(GraphError::Store("a task cannot depend on itself".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let dependency = Dependency {
            id: format!("d{id}"),
            source_task_id: request.source_task_id.clone(),
            target_task_id: request.target_task_id.clone(),
            dependency_type: request.dependency_type,
        };
        self.insert(workspace_id, dependency.clone());
        Ok(dependency)
    }

    async fn delete(&self, dependency_id: &str) -> Result<()> {
        self.check_available()?;
        for mut entry in self.workspaces.iter_mut() {
            entry.value_mut().retain(|dep| dep.id != dependency_id);
        }
        Ok(())
    }
}
