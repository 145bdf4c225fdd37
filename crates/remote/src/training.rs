//! Clients for the model-training services.
//!
//! Three independent HTTP services are involved: the talking-head trainer
//! (reports readiness and calls back when done), the audio slicer that cuts
//! reference clips for direct synthesis, and the voice-conversion trainer.

use serde::{Deserialize, Serialize};

/// Slice length bounds, in seconds, requested from the audio slicer.
const SLICE_MIN_LENGTH: u32 = 8;
const SLICE_MAX_LENGTH: u32 = 12;
const SLICE_KEEP_SILENT: f32 = 0.5;

/// Errors from the training-service clients.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The talking-head trainer is busy with another job.
    #[error("talking-head trainer is not ready")]
    NotReady,
}

/// Base URLs of the training services.
#[derive(Debug, Clone)]
pub struct TrainingEndpoints {
    pub talking_head_url: String,
    pub slicer_url: String,
    pub conversion_url: String,
}

#[derive(Debug, Deserialize)]
struct ReadyResponse {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct TalkingHeadTrainRequest<'a> {
    speaker: &'a str,
    callback_url: &'a str,
    callback_method: &'a str,
}

#[derive(Debug, Serialize)]
struct SliceRequest<'a> {
    audio_file: &'a str,
    output_dir: &'a str,
    min_length: u32,
    max_length: u32,
    keep_silent: f32,
    sliding_slice: bool,
}

pub struct TrainingServices {
    client: reqwest::Client,
    endpoints: TrainingEndpoints,
}

impl TrainingServices {
    pub fn new(endpoints: TrainingEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &TrainingEndpoints {
        &self.endpoints
    }

    /// `GET /talking-head/train-ready`; `true` when no training job is running.
    pub async fn talking_head_ready(&self) -> Result<bool, TrainingError> {
        let response = self
            .client
            .get(format!(
                "{}/talking-head/train-ready",
                self.endpoints.talking_head_url
            ))
            .send()
            .await?;
        let body: ReadyResponse = ensure_success("talking-head", response).await?.json().await?;
        Ok(body.ready)
    }

    /// Start talking-head training for `speaker`. The trainer reports
    /// progress by sending `PUT callback_url` with `{"status": <code>}`.
    pub async fn train_talking_head(
        &self,
        speaker: &str,
        callback_url: &str,
    ) -> Result<(), TrainingError> {
        let response = self
            .client
            .post(format!("{}/talking-head/train", self.endpoints.talking_head_url))
            .json(&TalkingHeadTrainRequest {
                speaker,
                callback_url,
                callback_method: "put",
            })
            .send()
            .await?;
        ensure_success("talking-head", response).await?;
        Ok(())
    }

    /// Check readiness, then start training; [`TrainingError::NotReady`]
    /// when the trainer is busy.
    pub async fn start_talking_head(
        &self,
        speaker: &str,
        callback_url: &str,
    ) -> Result<(), TrainingError> {
        if !self.talking_head_ready().await? {
            return Err(TrainingError::NotReady);
        }
        self.train_talking_head(speaker, callback_url).await
    }

    /// Cut the reference audio in `audio_dir` into clips under `output_dir`.
    pub async fn slice_audio(&self, audio_dir: &str, output_dir: &str) -> Result<(), TrainingError> {
        let response = self
            .client
            .post(format!("{}/audio/slice_audio", self.endpoints.slicer_url))
            .json(&SliceRequest {
                audio_file: audio_dir,
                output_dir,
                min_length: SLICE_MIN_LENGTH,
                max_length: SLICE_MAX_LENGTH,
                keep_silent: SLICE_KEEP_SILENT,
                sliding_slice: false,
            })
            .send()
            .await?;
        ensure_success("audio slicer", response).await?;
        Ok(())
    }

    /// Train the voice-conversion model `name` from the clips in `ref_dir`.
    pub async fn train_conversion(
        &self,
        name: &str,
        ref_dir: &str,
        epoch: u32,
    ) -> Result<(), TrainingError> {
        let epoch = epoch.to_string();
        let response = self
            .client
            .post(format!("{}/train", self.endpoints.conversion_url))
            .query(&[
                ("name", name),
                ("ref_dir_name", ref_dir),
                ("epoch", epoch.as_str()),
            ])
            .send()
            .await?;
        ensure_success("conversion trainer", response).await?;
        Ok(())
    }
}

async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, TrainingError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(TrainingError::Api {
            service,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
