//! Integration tests for voice model management.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, post_json_auth, put_json_auth, token_for};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: create, read, update, delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore]
async fn model_crud_round_trip(pool: PgPool) {
    let token = token_for(1);
    let app = common::build_test_app(pool).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/models",
        &token,
        json!({ "name": "anna", "audio_config": { "pitch": -2 } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["name"], "anna");
    assert!(created["data"]["video_model"].is_null());

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/models/{id}"),
        &token,
        json!({ "video_model": "speaker01" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["data"]["video_model"], "speaker01");
    assert_eq!(updated["data"]["audio_config"]["pitch"], -2);

    let response = get_auth(app.clone(), "/api/v1/models?name=anna", &token).await;
    let listed = body_json(response).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let response = delete_auth(app.clone(), &format!("/api/v1/models/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app, &format!("/api/v1/models/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: duplicate names conflict
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore]
async fn duplicate_model_name_returns_409(pool: PgPool) {
    let token = token_for(1);
    let app = common::build_test_app(pool).await;

    let first = post_json_auth(app.clone(), "/api/v1/models", &token, json!({ "name": "anna" })).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json_auth(app, "/api/v1/models", &token, json!({ "name": "anna" })).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Test: names that would escape a directory are rejected
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore]
async fn path_like_model_name_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let response = post_json_auth(
        app,
        "/api/v1/models",
        &token_for(1),
        json!({ "name": "../etc" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}
