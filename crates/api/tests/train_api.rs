//! Integration tests for the training endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_json_auth, token_for};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: empty file list is rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn train_audio_without_files_returns_400() {
    let app = common::build_test_app(common::unreachable_pool()).await;
    let response = post_json_auth(
        app,
        "/api/v1/train/audio_model",
        &token_for(1),
        json!({ "model_name": "anna", "file_ids": [] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "file_ids must not be empty");
}

// ---------------------------------------------------------------------------
// Test: speaker ids that are not a single path segment are rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn train_video_with_path_speaker_returns_400() {
    let app = common::build_test_app(common::unreachable_pool()).await;
    let response = post_json_auth(
        app,
        "/api/v1/train/video_model",
        &token_for(1),
        json!({ "model_name": "anna", "speaker": "a/b", "file_ids": [1] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: referencing a file that does not exist returns 404 and creates no task
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore]
async fn train_audio_with_missing_file_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool.clone()).await;
    let response = post_json_auth(
        app,
        "/api/v1/train/audio_model",
        &token_for(1),
        json!({ "model_name": "anna", "file_ids": [31337] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let tasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tasks, 0);
}
