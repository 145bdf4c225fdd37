//! Handlers for file upload and download.
//!
//! Uploads are written to the blob store under `upload/<user>/<uid>/` and
//! recorded as file rows; downloads stream the blob back to its owner.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use vox_core::naming;
use vox_core::types::DbId;
use vox_db::models::file::{CreateFile, StoredFile};
use vox_db::repositories::FileRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::ensure_file_owned;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// `Content-Disposition` value with characters unsafe in a quoted string
/// replaced.
fn attachment_disposition(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

// ---------------------------------------------------------------------------
// POST /files
// ---------------------------------------------------------------------------

/// Store every file part of a multipart body. Parts without a file name
/// are ignored.
pub async fn upload_files(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<StoredFile>>>)> {
    let uid = naming::new_output_uid();
    let mut stored = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let key = naming::upload_key(auth.user_id, &uid, &file_name);
        let path = state.blobs.put(&key).await?;

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to create {key}: {e}")))?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to write {key}: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to write {key}: {e}")))?;
        state.blobs.finalize(&key).await?;

        let name = key.rsplit('/').next().unwrap_or(&key).to_string();
        let row = FileRepo::create(
            &state.pool,
            &CreateFile {
                name,
                key,
                user_id: auth.user_id,
            },
        )
        .await?;
        tracing::info!(file_id = row.id, user_id = auth.user_id, key = %row.key, "File uploaded");
        stored.push(row);
    }

    if stored.is_empty() {
        return Err(AppError::BadRequest(
            "multipart body contained no file parts".into(),
        ));
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: stored })))
}

// ---------------------------------------------------------------------------
// GET /files/{id}/download
// ---------------------------------------------------------------------------

/// Stream a file the caller owns.
pub async fn download_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let row = ensure_file_owned(&state.pool, id, auth.user_id).await?;
    let path = state.blobs.get(&row.key).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&row.name))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
