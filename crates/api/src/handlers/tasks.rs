//! Handler for task status queries.

use axum::extract::{Path, State};
use axum::Json;
use vox_core::error::CoreError;
use vox_core::pipeline::Handle;
use vox_core::types::DbId;
use vox_db::repositories::TaskRepo;
use vox_pipeline::{reconcile, RoleMap, TaskReport, TaskSnapshot};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /tasks/{id}
// ---------------------------------------------------------------------------

/// Poll every handle of the task and report the aggregated status, the
/// files of finished roles, and each handle's raw remote state.
pub async fn get_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaskReport>>> {
    let task = TaskRepo::find_by_id_and_user(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Task", id)))?;

    let roles: RoleMap = serde_json::from_value(task.results.clone()).map_err(|e| {
        AppError::InternalError(format!("task {id} has a malformed role map: {e}"))
    })?;

    let status = task.status();
    let snapshot = TaskSnapshot {
        id: task.id,
        handles: task.handles.into_iter().map(Handle).collect(),
        roles,
        status,
    };

    let report = reconcile(state.substrate.as_ref(), &snapshot).await;
    tracing::debug!(task_id = id, status = ?report.status, handles = snapshot.handles.len(), "Task reconciled");

    Ok(Json(DataResponse { data: report }))
}
