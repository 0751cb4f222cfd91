//! Consumed Entities
//!
//! Shapes of the records the graph is built from. They are owned by external
//! collaborators (the CRUD layer and the session tracker); this crate only
//! reads them. Field names serialize in `snake_case` to match the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Standby,
    Working,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Planning,
    #[default]
    Inbox,
    Assigned,
    InProgress,
    Testing,
    Review,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    #[default]
    Persistent,
    Subagent,
}

/// Type of a task-to-task relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    #[default]
    Blocks,
    RelatesTo,
    SubtaskOf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub avatar_emoji: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A persisted directed relation between two tasks. Cycles are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub source_task_id: String,
    pub target_task_id: String,
    #[serde(default)]
    pub dependency_type: DependencyType,
}

/// Body of a dependency creation request. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewDependency {
    pub source_task_id: String,
    pub target_task_id: String,
    #[serde(default)]
    pub dependency_type: DependencyType,
}

/// The live session currently attached to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub agent_id: String,
    pub session_type: SessionType,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl Task {
    /// Whether the task still counts toward its agent's workload.
    pub fn is_open(&self) -> bool {
        self.status != TaskStatus::Done
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub const WORKSPACE: &str = "ws-1";

    pub fn agent(id: &str, status: AgentStatus) -> Agent {
        Agent {
            id: id.into(),
            workspace_id: WORKSPACE.into(),
            name: format!("Agent {id}"),
            role: "developer".into(),
            status,
            avatar_emoji: String::new(),
            model: None,
        }
    }

    pub fn task(id: &str, status: TaskStatus, assigned: Option<&str>, created_secs: i64) -> Task {
        Task {
            id: id.into(),
            workspace_id: WORKSPACE.into(),
            title: format!("Task {id}"),
            status,
            priority: TaskPriority::Normal,
            assigned_agent_id: assigned.map(Into::into),
            parent_task_id: None,
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
        }
    }

    pub fn dependency(id: &str, source: &str, target: &str, kind: DependencyType) -> Dependency {
        Dependency {
            id: id.into(),
            source_task_id: source.into(),
            target_task_id: target.into(),
            dependency_type: kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_use_store_spelling() {
        let status: TaskStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);

        let kind = serde_json::to_string(&DependencyType::RelatesTo).unwrap();
        assert_eq!(kind, "\"relates_to\"");
    }

    #[test]
    fn dependency_type_defaults_to_blocks() {
        let dep: Dependency = serde_json::from_str(
            r#"{ "id": "d1", "source_task_id": "t1", "target_task_id": "t2" }"#,
        )
        .unwrap();
        assert_eq!(dep.dependency_type, DependencyType::Blocks);
    }

    #[test]
    fn done_tasks_are_not_open() {
        let mut task = fixtures::task("t1", TaskStatus::Review, None, 0);
        assert!(task.is_open());
        task.status = TaskStatus::Done;
        assert!(!task.is_open());
    }
}
