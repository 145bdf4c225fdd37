//! Out-of-band status callbacks from the training services.
//!
//! These routes are unauthenticated: the talking-head trainer calls back
//! with the URL it was given when training started.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use vox_core::error::CoreError;
use vox_core::status::TaskStatus;
use vox_core::types::DbId;
use vox_db::repositories::TaskRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Callback body. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct StatusCallback {
    /// `2` pending, `3` succeeded, `4` failed.
    pub status: i32,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdated {
    pub id: DbId,
    pub status: TaskStatus,
}

// ---------------------------------------------------------------------------
// PUT /internal/tasks/{id}
// ---------------------------------------------------------------------------

/// Record the coarse status reported by a trainer.
pub async fn update_task_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<StatusCallback>,
) -> AppResult<Json<DataResponse<StatusUpdated>>> {
    let status = TaskStatus::from_callback_code(body.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status code: {}", body.status)))?;

    if !TaskRepo::update_status(&state.pool, id, status).await? {
        return Err(AppError::Core(CoreError::not_found("Task", id)));
    }

    tracing::info!(task_id = id, code = body.status, ?status, "Task status updated by callback");
    Ok(Json(DataResponse {
        data: StatusUpdated { id, status },
    }))
}
