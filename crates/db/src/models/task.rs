use serde::Serialize;
use sqlx::FromRow;
use vox_core::status::{StatusId, TaskStatus};
use vox_core::types::{DbId, Timestamp, UserId};

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub user_id: UserId,
    pub status_id: Option<StatusId>,
    /// Remote handles, depth-first.
    pub handles: Vec<String>,
    /// Role map as stored; decoded by the caller.
    pub results: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub fn status(&self) -> Option<TaskStatus> {
        self.status_id.map(TaskStatus::from_id)
    }
}

/// DTO for inserting a task row.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_id: UserId,
    pub status: Option<TaskStatus>,
    pub handles: Vec<String>,
    pub results: serde_json::Value,
}

impl CreateTask {
    /// A training task: no handles, no results, starts PENDING.
    pub fn training(user_id: UserId) -> Self {
        Self {
            user_id,
            status: Some(TaskStatus::Pending),
            handles: Vec::new(),
            results: serde_json::json!({}),
        }
    }
}
