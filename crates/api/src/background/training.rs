//! Model-training jobs driven by durable retry queues.
//!
//! Two queues, one per training flow:
//!
//! - `TRAIN_AUDIO`: slice the reference audio for direct synthesis, train the
//!   voice-conversion weights, record the weight file on the model, and mark
//!   the task SUCCEEDED.
//! - `TRAIN_VIDEO`: start talking-head training with a callback URL. The task
//!   stays PENDING; the trainer reports completion through
//!   `PUT /api/v1/internal/tasks/{id}`.
//!
//! Both handlers own their failure policy: an attempt that fails before the
//! third try is retried, the third failure marks the task FAILED and the job
//! is dropped.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use vox_core::status::TaskStatus;
use vox_core::types::DbId;
use vox_db::models::voice_model::UpdateVoiceModel;
use vox_db::repositories::{ModelRepo, TaskRepo};
use vox_queue::{HandlerError, QueueError, QueueHandler, QueueManager, RetryQueue};
use vox_remote::TrainingServices;

use crate::config::ServerConfig;

pub const TRAIN_AUDIO_QUEUE: &str = "TRAIN_AUDIO";
pub const TRAIN_VIDEO_QUEUE: &str = "TRAIN_VIDEO";

/// Attempt number at which a failing training job is given up.
pub const MAX_TRAINING_ATTEMPTS: u32 = 3;

/// Suffix of the conversion weight file the trainer produces.
const WEIGHT_FILE_SUFFIX: &str = ".pth";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrainingJob {
    pub task_id: DbId,
    pub model_name: String,
    /// Directory holding the reference clips.
    pub ref_dir: String,
    pub epoch: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTrainingJob {
    pub task_id: DbId,
    pub speaker: String,
}

/// Whether a failure on attempt `retry_count` is final.
pub fn attempts_exhausted(retry_count: u32) -> bool {
    retry_count >= MAX_TRAINING_ATTEMPTS
}

/// Turn the outcome of one attempt into the queue's verdict.
///
/// Early failures propagate so the job is retried. A final failure marks
/// the task FAILED and reports success so the queue drops the job.
async fn settle(
    pool: &PgPool,
    task_id: DbId,
    retry_count: u32,
    outcome: Result<(), HandlerError>,
) -> Result<(), HandlerError> {
    let Err(e) = outcome else {
        return Ok(());
    };

    if !attempts_exhausted(retry_count) {
        tracing::warn!(task_id, retry_count, error = %e, "Training attempt failed, will retry");
        return Err(e);
    }

    tracing::error!(task_id, retry_count, error = %e, "Training failed, giving up");
    TaskRepo::update_status(pool, task_id, TaskStatus::Failed).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

pub struct AudioTrainingHandler {
    pool: PgPool,
    services: Arc<TrainingServices>,
    cosy_workspace_root: PathBuf,
}

impl AudioTrainingHandler {
    async fn train(&self, job: &AudioTrainingJob) -> Result<(), HandlerError> {
        let model = ModelRepo::find_or_create(&self.pool, &job.model_name).await?;

        let output_dir = self.cosy_workspace_root.join(&job.model_name);
        tokio::fs::create_dir_all(&output_dir).await?;
        self.services
            .slice_audio(&job.ref_dir, &output_dir.to_string_lossy())
            .await?;

        self.services
            .train_conversion(&job.model_name, &job.ref_dir, job.epoch)
            .await?;

        let update = UpdateVoiceModel {
            audio_model: Some(format!("{}{WEIGHT_FILE_SUFFIX}", job.model_name)),
            ..UpdateVoiceModel::default()
        };
        ModelRepo::update(&self.pool, model.id, &update).await?;
        TaskRepo::update_status(&self.pool, job.task_id, TaskStatus::Succeeded).await?;

        tracing::info!(
            task_id = job.task_id,
            model = %job.model_name,
            epoch = job.epoch,
            "Audio model trained"
        );
        Ok(())
    }
}

#[async_trait]
impl QueueHandler for AudioTrainingHandler {
    type Params = AudioTrainingJob;

    async fn handle(&self, job: &AudioTrainingJob, retry_count: u32) -> Result<(), HandlerError> {
        tracing::debug!(task_id = job.task_id, retry_count, model = %job.model_name, "Training audio model");
        let outcome = self.train(job).await;
        settle(&self.pool, job.task_id, retry_count, outcome).await
    }
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

pub struct VideoTrainingHandler {
    pool: PgPool,
    services: Arc<TrainingServices>,
    config: Arc<ServerConfig>,
}

#[async_trait]
impl QueueHandler for VideoTrainingHandler {
    type Params = VideoTrainingJob;

    async fn handle(&self, job: &VideoTrainingJob, retry_count: u32) -> Result<(), HandlerError> {
        tracing::debug!(task_id = job.task_id, retry_count, speaker = %job.speaker, "Training video model");
        let callback_url = self.config.task_callback_url(job.task_id);
        let outcome = self
            .services
            .start_talking_head(&job.speaker, &callback_url)
            .await
            .map_err(HandlerError::from);

        if outcome.is_ok() {
            tracing::info!(
                task_id = job.task_id,
                speaker = %job.speaker,
                %callback_url,
                "Talking-head training started"
            );
        }
        settle(&self.pool, job.task_id, retry_count, outcome).await
    }
}

// ---------------------------------------------------------------------------
// Queues
// ---------------------------------------------------------------------------

/// Producer ends of both training queues.
#[derive(Debug, Clone)]
pub struct TrainingQueues {
    pub audio: RetryQueue<AudioTrainingJob>,
    pub video: RetryQueue<VideoTrainingJob>,
}

impl TrainingQueues {
    /// Create both queues on `manager`, reloading any persisted jobs.
    pub async fn start(
        manager: &QueueManager,
        pool: PgPool,
        services: Arc<TrainingServices>,
        config: Arc<ServerConfig>,
    ) -> Result<Self, QueueError> {
        let audio = manager
            .create(
                TRAIN_AUDIO_QUEUE,
                AudioTrainingHandler {
                    pool: pool.clone(),
                    services: Arc::clone(&services),
                    cosy_workspace_root: config.training.cosy_workspace_root.clone(),
                },
                config.training.audio_queue.clone(),
            )
            .await?;

        let video = manager
            .create(
                TRAIN_VIDEO_QUEUE,
                VideoTrainingHandler {
                    pool,
                    services,
                    config: Arc::clone(&config),
                },
                config.training.video_queue.clone(),
            )
            .await?;

        Ok(Self { audio, video })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn third_failure_is_final() {
        assert!(!attempts_exhausted(1));
        assert!(!attempts_exhausted(2));
        assert!(attempts_exhausted(3));
        assert!(attempts_exhausted(4));
    }

    #[test]
    fn jobs_persist_as_plain_json() {
        let job = AudioTrainingJob {
            task_id: 9,
            model_name: "anna".into(),
            ref_dir: "/ref/anna".into(),
            epoch: 200,
        };
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            json!({ "task_id": 9, "model_name": "anna", "ref_dir": "/ref/anna", "epoch": 200 })
        );

        let video: VideoTrainingJob =
            serde_json::from_value(json!({ "task_id": 4, "speaker": "spk" })).unwrap();
        assert_eq!(video.speaker, "spk");
    }

    async fn stored_status(pool: &PgPool, task_id: DbId) -> Option<TaskStatus> {
        TaskRepo::find_by_id(pool, task_id)
            .await
            .unwrap()
            .unwrap()
            .status()
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    #[ignore]
    async fn third_failed_attempt_marks_task_failed(pool: PgPool) {
        use vox_db::models::task::CreateTask;

        let task = TaskRepo::create(&pool, &CreateTask::training(1)).await.unwrap();

        for retry_count in 1..MAX_TRAINING_ATTEMPTS {
            let verdict = settle(&pool, task.id, retry_count, Err("trainer down".into())).await;
            assert!(verdict.is_err(), "attempt {retry_count} should be retried");
            assert_eq!(stored_status(&pool, task.id).await, Some(TaskStatus::Pending));
        }

        let verdict = settle(&pool, task.id, MAX_TRAINING_ATTEMPTS, Err("trainer down".into())).await;
        assert!(verdict.is_ok());
        assert_eq!(stored_status(&pool, task.id).await, Some(TaskStatus::Failed));
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    #[ignore]
    async fn successful_attempt_leaves_status_to_the_handler(pool: PgPool) {
        use vox_db::models::task::CreateTask;

        let task = TaskRepo::create(&pool, &CreateTask::training(1)).await.unwrap();
        settle(&pool, task.id, MAX_TRAINING_ATTEMPTS, Ok(())).await.unwrap();

        assert_eq!(stored_status(&pool, task.id).await, Some(TaskStatus::Pending));
    }
}
