use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vox_core::registry::ModelProfile;
use vox_core::types::{DbId, Timestamp};

/// A row from the `voice_models` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VoiceModel {
    pub id: DbId,
    pub name: String,
    pub audio_model: Option<String>,
    pub audio_config: serde_json::Value,
    pub video_model: Option<String>,
    pub video_config: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VoiceModel {
    /// `audio_config.pitch`, or 0 when absent or not an integer.
    pub fn pitch(&self) -> i32 {
        self.audio_config
            .get("pitch")
            .and_then(serde_json::Value::as_i64)
            .and_then(|p| i32::try_from(p).ok())
            .unwrap_or(0)
    }

    pub fn profile(&self) -> ModelProfile {
        ModelProfile {
            name: self.name.clone(),
            speaker: self
                .video_model
                .clone()
                .filter(|s| !s.trim().is_empty()),
            pitch: self.pitch(),
        }
    }
}

/// DTO for `POST /api/v1/models`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVoiceModel {
    pub name: String,
    pub audio_model: Option<String>,
    pub audio_config: Option<serde_json::Value>,
    pub video_model: Option<String>,
    pub video_config: Option<serde_json::Value>,
}

impl CreateVoiceModel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audio_model: None,
            audio_config: None,
            video_model: None,
            video_config: None,
        }
    }
}

/// DTO for `PUT /api/v1/models/{id}`. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVoiceModel {
    pub name: Option<String>,
    pub audio_model: Option<String>,
    pub audio_config: Option<serde_json::Value>,
    pub video_model: Option<String>,
    pub video_config: Option<serde_json::Value>,
}
