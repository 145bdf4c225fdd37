//! Wire-level tests for the HTTP clients against a mocked server.

use assert_matches::assert_matches;
use mockito::Matcher;
use serde_json::json;

use vox_core::pipeline::{Handle, Pipeline, Stage, StageKind};
use vox_core::status::RemoteState;
use vox_core::substrate::{ExecutionSubstrate, SubstrateError};
use vox_remote::{HttpSubstrate, TrainingEndpoints, TrainingError, TrainingServices};

fn audio_then_fanout() -> Pipeline {
    Pipeline::sequence(vec![
        Pipeline::Stage(Stage::new(
            StageKind::SynthesizeCosy,
            vec![json!("hello")],
            "infer/u.wav",
        )),
        Pipeline::fanout(vec![
            Pipeline::Stage(Stage::new(StageKind::RenderTalkingHead, vec![json!("anna")], "infer/u.mp4")),
            Pipeline::Stage(Stage::new(StageKind::AlignSubtitle, vec![json!("hello")], "infer/u.srt")),
        ]),
    ])
}

// ---------------------------------------------------------------------------
// Substrate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_posts_tree_and_accepts_mirroring_record() {
    let mut server = mockito::Server::new_async().await;
    let pipeline = audio_then_fanout();

    let mock = server
        .mock("POST", "/pipelines")
        .match_body(Matcher::Json(serde_json::to_value(&pipeline).unwrap()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "type": "sequence",
                "steps": [
                    { "type": "leaf", "handle": "h-audio" },
                    { "type": "fanout", "branches": [
                        { "type": "leaf", "handle": "h-video" },
                        { "type": "leaf", "handle": "h-srt" }
                    ]}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let substrate = HttpSubstrate::new(format!("{}/", server.url()));
    let record = substrate.submit(&pipeline).await.unwrap();

    mock.assert_async().await;
    assert!(record.mirrors(&pipeline));
}

#[tokio::test]
async fn submit_rejects_record_of_wrong_shape() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/pipelines")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "type": "leaf", "handle": "h" }).to_string())
        .create_async()
        .await;

    let substrate = HttpSubstrate::new(server.url());
    let err = substrate.submit(&audio_then_fanout()).await.unwrap_err();
    assert_matches!(err, SubstrateError::ShapeMismatch);
}

#[tokio::test]
async fn submit_surfaces_rejection() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/pipelines")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let substrate = HttpSubstrate::new(server.url());
    let err = substrate.submit(&audio_then_fanout()).await.unwrap_err();
    assert_matches!(err, SubstrateError::Rejected { status: 503, ref body } if body == "overloaded");
}

#[tokio::test]
async fn poll_normalises_reported_state() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/results/h-audio")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "state": "SUCCESS", "result": "infer/u.wav" }).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/results/h-video")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "state": "RETRY", "result": null }).to_string())
        .create_async()
        .await;

    let substrate = HttpSubstrate::new(server.url());

    let audio = substrate.poll(&Handle::from("h-audio")).await.unwrap();
    assert_eq!(audio.state, RemoteState::Succeeded);
    assert_eq!(audio.output_key(), Some("infer/u.wav"));

    let video = substrate.poll(&Handle::from("h-video")).await.unwrap();
    assert_eq!(video.state, RemoteState::Unknown);
    assert_eq!(video.raw_state, "RETRY");
}

#[tokio::test]
async fn poll_unknown_handle() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/results/gone")
        .with_status(404)
        .create_async()
        .await;

    let substrate = HttpSubstrate::new(server.url());
    let err = substrate.poll(&Handle::from("gone")).await.unwrap_err();
    assert_matches!(err, SubstrateError::UnknownHandle(h) if h.as_str() == "gone");
}

#[tokio::test]
async fn poll_encodes_handle_as_one_segment() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/results/a%2Fb%3Fc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "state": "PENDING" }).to_string())
        .create_async()
        .await;

    let substrate = HttpSubstrate::new(format!("{}/", server.url()));
    let result = substrate.poll(&Handle::from("a/b?c")).await.unwrap();
    assert_eq!(result.state, RemoteState::Pending);
    mock.assert_async().await;
}

#[tokio::test]
async fn poll_with_unparseable_base_url_is_a_transport_error() {
    let substrate = HttpSubstrate::new("not a url");
    let err = substrate.poll(&Handle::from("h")).await.unwrap_err();
    assert_matches!(err, SubstrateError::Transport(_));
}

// ---------------------------------------------------------------------------
// Training services
// ---------------------------------------------------------------------------

fn services(url: &str) -> TrainingServices {
    TrainingServices::new(TrainingEndpoints {
        talking_head_url: url.to_string(),
        slicer_url: url.to_string(),
        conversion_url: url.to_string(),
    })
}

#[tokio::test]
async fn talking_head_training_checks_readiness_first() {
    let mut server = mockito::Server::new_async().await;
    let ready = server
        .mock("GET", "/talking-head/train-ready")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "ready": true }).to_string())
        .create_async()
        .await;
    let train = server
        .mock("POST", "/talking-head/train")
        .match_body(Matcher::Json(json!({
            "speaker": "anna",
            "callback_url": "http://api/api/v1/internal/tasks/7",
            "callback_method": "put"
        })))
        .with_status(200)
        .create_async()
        .await;

    services(&server.url())
        .start_talking_head("anna", "http://api/api/v1/internal/tasks/7")
        .await
        .unwrap();

    ready.assert_async().await;
    train.assert_async().await;
}

#[tokio::test]
async fn busy_talking_head_trainer_is_not_ready() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/talking-head/train-ready")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "ready": false }).to_string())
        .create_async()
        .await;
    let train = server
        .mock("POST", "/talking-head/train")
        .expect(0)
        .create_async()
        .await;

    let err = services(&server.url())
        .start_talking_head("anna", "http://cb")
        .await
        .unwrap_err();
    assert_matches!(err, TrainingError::NotReady);
    train.assert_async().await;
}

#[tokio::test]
async fn conversion_training_passes_query_parameters() {
    let mut server = mockito::Server::new_async().await;
    let train = server
        .mock("POST", "/train")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "anna".into()),
            Matcher::UrlEncoded("ref_dir_name".into(), "/ref/anna".into()),
            Matcher::UrlEncoded("epoch".into(), "200".into()),
        ]))
        .with_status(200)
        .create_async()
        .await;

    services(&server.url())
        .train_conversion("anna", "/ref/anna", 200)
        .await
        .unwrap();
    train.assert_async().await;
}

#[tokio::test]
async fn slicer_failure_is_reported_with_service_name() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/audio/slice_audio")
        .match_body(Matcher::PartialJson(json!({
            "audio_file": "/ref/anna",
            "min_length": 8,
            "max_length": 12,
            "sliding_slice": false
        })))
        .with_status(500)
        .with_body("disk full")
        .create_async()
        .await;

    let err = services(&server.url())
        .slice_audio("/ref/anna", "/out/anna")
        .await
        .unwrap_err();
    assert_matches!(
        err,
        TrainingError::Api { service: "audio slicer", status: 500, ref body } if body == "disk full"
    );
}
