//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope.

use serde::Serialize;
use vox_core::types::DbId;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Returned by every endpoint that starts asynchronous work.
#[derive(Debug, Serialize)]
pub struct TaskCreated {
    pub task_id: DbId,
}
