//! Request handlers.
//!
//! Each submodule provides the async handler functions for one route group.
//! Handlers delegate persistence to the repositories in `vox_db`, pipeline
//! work to `vox_pipeline`, and map errors via [`AppError`](crate::error::AppError).

pub mod files;
pub mod infer;
pub mod internal;
pub mod models;
pub mod tasks;
pub mod train;

use vox_core::error::CoreError;
use vox_core::types::{DbId, UserId};
use vox_db::models::file::StoredFile;
use vox_db::repositories::FileRepo;

use crate::error::{AppError, AppResult};

/// Fetch a file owned by `user_id`; other users' files read as absent.
pub(crate) async fn ensure_file_owned(
    pool: &sqlx::PgPool,
    id: DbId,
    user_id: UserId,
) -> AppResult<StoredFile> {
    FileRepo::find_by_id_and_user(pool, id, user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("File", id)))
}

/// Reject names that would escape the directory they are joined onto.
pub(crate) fn validate_path_segment(field: &str, value: &str) -> AppResult<()> {
    let value = value.trim();
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "{field} must be a non-empty name without path separators"
        ))))
    }
}
