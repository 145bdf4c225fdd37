//! Route definitions for inference requests.
//!
//! ```text
//! POST   /text2audio      text_to_audio
//! POST   /text2video      text_to_video
//! POST   /video           audio_to_video
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::infer;
use crate::state::AppState;

/// Inference routes, mounted at `/infer`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/text2audio", post(infer::text_to_audio))
        .route("/text2video", post(infer::text_to_video))
        .route("/video", post(infer::audio_to_video))
}
