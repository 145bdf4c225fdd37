//! Integration tests for multipart upload and download.

mod common;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get_auth, token_for};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

const BOUNDARY: &str = "vox-test-boundary";

fn multipart_body(file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/files")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Test: upload then download returns the same bytes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore]
async fn uploaded_file_downloads_intact(pool: PgPool) {
    let token = token_for(1);
    let app = common::build_test_app(pool).await;

    let response = app
        .clone()
        .oneshot(upload_request(&token, multipart_body("ref.wav", b"RIFF-data")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let file = &json["data"][0];
    assert_eq!(file["name"], "ref.wav");
    assert!(file["key"].as_str().unwrap().starts_with("upload/1/"));
    let id = file["id"].as_i64().unwrap();

    let response = get_auth(app.clone(), &format!("/api/v1/files/{id}/download"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"ref.wav\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"RIFF-data");

    // Another user cannot see it.
    let response = get_auth(app, &format!("/api/v1/files/{id}/download"), &token_for(2)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: a body without file parts is rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_without_file_parts_returns_400() {
    let app = common::build_test_app(common::unreachable_pool()).await;
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );

    let response = app
        .oneshot(upload_request(&token_for(1), body.into_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
