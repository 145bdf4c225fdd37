//! Route definitions for file upload and download.
//!
//! ```text
//! POST   /                upload_files (multipart)
//! GET    /{id}/download   download_file
//! ```

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Upper bound on one multipart upload body.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// File routes, mounted at `/files`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(files::upload_files).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/{id}/download", get(files::download_file))
}
