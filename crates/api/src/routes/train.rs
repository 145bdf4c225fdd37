//! Route definitions for model training.
//!
//! ```text
//! POST   /audio_model     train_audio_model
//! POST   /video_model     train_video_model
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::train;
use crate::state::AppState;

/// Training routes, mounted at `/train`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/audio_model", post(train::train_audio_model))
        .route("/video_model", post(train::train_video_model))
}
