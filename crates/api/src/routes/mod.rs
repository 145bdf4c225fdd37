pub mod files;
pub mod health;
pub mod infer;
pub mod internal;
pub mod models;
pub mod tasks;
pub mod train;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /infer/text2audio                 synthesize audio (POST)
/// /infer/text2video                 synthesize audio + talking-head video (POST)
/// /infer/video                      talking-head video from an audio file (POST)
///
/// /tasks/{id}                       aggregated task status (GET)
///
/// /train/audio_model                queue voice-conversion training (POST)
/// /train/video_model                queue talking-head training (POST)
///
/// /models                           list, create
/// /models/{id}                      get, update, delete
///
/// /files                            multipart upload (POST)
/// /files/{id}/download              stream file (GET)
///
/// /internal/tasks/{id}              trainer status callback (PUT, no auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/infer", infer::router())
        .nest("/tasks", tasks::router())
        .nest("/train", train::router())
        .nest("/models", models::router())
        .nest("/files", files::router())
        .nest("/internal", internal::router())
}
