use serde::Serialize;
use sqlx::FromRow;
use vox_core::types::{DbId, Timestamp, UserId};

/// A row from the `files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredFile {
    pub id: DbId,
    pub name: String,
    pub key: String,
    pub user_id: UserId,
    pub created_at: Timestamp,
}

/// DTO for inserting a file row.
#[derive(Debug, Clone)]
pub struct CreateFile {
    pub name: String,
    pub key: String,
    pub user_id: UserId,
}
