//! Handlers that start model training.
//!
//! The request path only stages the reference files and enqueues a job;
//! training itself runs on the retry queues in
//! [`background::training`](crate::background::training).

use std::collections::HashSet;
use std::path::Path as FsPath;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use vox_core::error::CoreError;
use vox_core::storage::BlobStore;
use vox_core::types::{DbId, UserId};
use vox_db::models::file::StoredFile;
use vox_db::models::task::CreateTask;
use vox_db::models::voice_model::UpdateVoiceModel;
use vox_db::repositories::{FileRepo, ModelRepo, TaskRepo};

use crate::background::training::{AudioTrainingJob, VideoTrainingJob};
use crate::error::{AppError, AppResult};
use crate::handlers::validate_path_segment;
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, TaskCreated};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TrainAudioBody {
    pub model_name: String,
    /// Defaults to the configured epoch count.
    pub epoch: Option<u32>,
    /// Reference audio files.
    pub file_ids: Vec<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct TrainVideoBody {
    pub model_name: String,
    /// Talking-head speaker id to train and attach to the model.
    pub speaker: String,
    /// Reference video clips.
    pub file_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load the files named by `ids`, all of which must belong to `user_id`.
async fn owned_files(
    pool: &sqlx::PgPool,
    ids: &[DbId],
    user_id: UserId,
) -> AppResult<Vec<StoredFile>> {
    let mut seen = HashSet::new();
    let ids: Vec<DbId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if ids.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "file_ids must not be empty".into(),
        )));
    }

    let files = FileRepo::find_many_for_user(pool, &ids, user_id).await?;
    if let Some(missing) = ids.iter().find(|id| !files.iter().any(|f| f.id == **id)) {
        return Err(AppError::Core(CoreError::not_found("File", missing)));
    }
    Ok(files)
}

/// Replace `dir` with a fresh directory holding a copy of each file, named
/// by `name_of(index, file)`.
async fn stage_reference_files(
    blobs: &dyn BlobStore,
    files: &[StoredFile],
    dir: &FsPath,
    name_of: impl Fn(usize, &StoredFile) -> String,
) -> AppResult<()> {
    let io_err = |e: std::io::Error| {
        AppError::InternalError(format!("Failed to stage {}: {e}", dir.display()))
    };

    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(io_err(e)),
        _ => {}
    }
    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;

    for (index, file) in files.iter().enumerate() {
        let source = blobs.get(&file.key).await?;
        tokio::fs::copy(&source, dir.join(name_of(index, file)))
            .await
            .map_err(io_err)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// POST /train/audio_model
// ---------------------------------------------------------------------------

/// Stage reference audio and enqueue conversion training for `model_name`.
pub async fn train_audio_model(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<TrainAudioBody>,
) -> AppResult<(StatusCode, Json<DataResponse<TaskCreated>>)> {
    validate_path_segment("model_name", &body.model_name)?;
    let files = owned_files(&state.pool, &body.file_ids, auth.user_id).await?;

    let ref_dir = state
        .config
        .training
        .conversion_reference_root
        .join(&body.model_name);
    stage_reference_files(state.blobs.as_ref(), &files, &ref_dir, |_, file| {
        file.name.clone()
    })
    .await?;

    let task = TaskRepo::create(&state.pool, &CreateTask::training(auth.user_id)).await?;
    let job = AudioTrainingJob {
        task_id: task.id,
        model_name: body.model_name,
        ref_dir: ref_dir.to_string_lossy().into_owned(),
        epoch: body.epoch.unwrap_or(state.config.training.default_epoch),
    };
    state.training.audio.append(job).await?;

    tracing::info!(
        task_id = task.id,
        user_id = auth.user_id,
        files = files.len(),
        "Audio training queued"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TaskCreated { task_id: task.id },
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /train/video_model
// ---------------------------------------------------------------------------

/// Stage reference clips, attach `speaker` to the model, and enqueue
/// talking-head training.
pub async fn train_video_model(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<TrainVideoBody>,
) -> AppResult<(StatusCode, Json<DataResponse<TaskCreated>>)> {
    validate_path_segment("model_name", &body.model_name)?;
    validate_path_segment("speaker", &body.speaker)?;
    let files = owned_files(&state.pool, &body.file_ids, auth.user_id).await?;

    let clip_dir = state
        .config
        .training
        .talking_head_clip_root
        .join(&body.speaker);
    stage_reference_files(state.blobs.as_ref(), &files, &clip_dir, |index, _| {
        format!("{index:02}.mp4")
    })
    .await?;

    let model = ModelRepo::find_or_create(&state.pool, &body.model_name).await?;
    let update = UpdateVoiceModel {
        video_model: Some(body.speaker.clone()),
        ..UpdateVoiceModel::default()
    };
    ModelRepo::update(&state.pool, model.id, &update).await?;

    let task = TaskRepo::create(&state.pool, &CreateTask::training(auth.user_id)).await?;
    state
        .training
        .video
        .append(VideoTrainingJob {
            task_id: task.id,
            speaker: body.speaker,
        })
        .await?;

    tracing::info!(
        task_id = task.id,
        user_id = auth.user_id,
        model_id = model.id,
        clips = files.len(),
        "Video training queued"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TaskCreated { task_id: task.id },
        }),
    ))
}
