//! Handlers for inference requests.
//!
//! Every request follows the same path: resolve the voice model, compose
//! the pipeline (rejecting inconsistent requests before anything is
//! written), record a file row per output, submit, and store the task with
//! its flattened handles and role map.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use vox_core::naming;
use vox_core::types::{DbId, UserId};
use vox_db::models::file::CreateFile;
use vox_db::models::task::{CreateTask, Task};
use vox_db::repositories::{FileRepo, TaskRepo};
use vox_pipeline::{
    compose, compose_render, dispatch, resolve_profile, AudioMode, InferRequest, OutputPlan, Role,
    RoleMap, RoleOutput, DEFAULT_AUDIO_PROFILE,
};

use crate::error::{AppError, AppResult};
use crate::handlers::ensure_file_owned;
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, TaskCreated};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of the text-to-audio and text-to-video endpoints.
#[derive(Debug, Deserialize)]
pub struct TextInferBody {
    pub text: String,
    pub model_name: String,
    /// Cloud TTS voice for convert mode.
    #[serde(default = "default_audio_profile")]
    pub audio_profile: String,
    /// `1` = synthesize then convert (default), `2` = direct synthesis.
    #[serde(default)]
    pub mode: AudioMode,
    /// Also align a subtitle file to the generated audio.
    #[serde(default)]
    pub gen_srt: bool,
}

fn default_audio_profile() -> String {
    DEFAULT_AUDIO_PROFILE.to_string()
}

/// Body of the audio-to-video endpoint.
#[derive(Debug, Deserialize)]
pub struct RenderVideoBody {
    pub model_name: String,
    /// Previously uploaded or generated audio file.
    pub file_id: DbId,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a file row for every planned output and collect the role map.
async fn record_outputs(
    pool: &sqlx::PgPool,
    user_id: UserId,
    outputs: &[(Option<Role>, &str)],
) -> AppResult<RoleMap> {
    let mut roles = RoleMap::new();
    for &(role, key) in outputs {
        let name = key.rsplit('/').next().unwrap_or(key).to_string();
        let file = FileRepo::create(
            pool,
            &CreateFile {
                name,
                key: key.to_string(),
                user_id,
            },
        )
        .await?;

        if let Some(role) = role {
            roles
                .insert(
                    role,
                    RoleOutput {
                        file_id: file.id,
                        key: file.key,
                    },
                )
                .map_err(|e| AppError::InternalError(e.to_string()))?;
        }
    }
    Ok(roles)
}

async fn store_task(
    pool: &sqlx::PgPool,
    user_id: UserId,
    handles: Vec<vox_core::pipeline::Handle>,
    roles: &RoleMap,
) -> AppResult<Task> {
    let results =
        serde_json::to_value(roles).map_err(|e| AppError::InternalError(e.to_string()))?;
    let task = TaskRepo::create(
        pool,
        &CreateTask {
            user_id,
            status: None,
            handles: handles.into_iter().map(|h| h.0).collect(),
            results,
        },
    )
    .await?;
    Ok(task)
}

async fn run_text_request(
    state: &AppState,
    user_id: UserId,
    body: TextInferBody,
    video: bool,
) -> AppResult<Task> {
    let profile = resolve_profile(state.registry.as_ref(), &body.model_name).await?;

    let request = InferRequest {
        text: body.text,
        mode: body.mode,
        audio_profile: body.audio_profile,
        video,
        subtitles: body.gen_srt,
    };
    let plan = OutputPlan::for_request(&naming::new_output_uid(), &request);
    let pipeline = compose(&request, &profile, &plan)?;

    let roles = record_outputs(&state.pool, user_id, &plan.outputs()).await?;
    let dispatched = dispatch(state.substrate.as_ref(), &pipeline).await?;
    let task = store_task(&state.pool, user_id, dispatched.handles, &roles).await?;

    tracing::info!(
        task_id = task.id,
        user_id,
        model = %profile.name,
        uid = %plan.uid,
        video,
        subtitles = request.subtitles,
        "Inference task created"
    );
    Ok(task)
}

// ---------------------------------------------------------------------------
// POST /infer/text2audio
// ---------------------------------------------------------------------------

/// Synthesize speech for `text` in the voice of `model_name`.
pub async fn text_to_audio(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<TextInferBody>,
) -> AppResult<(StatusCode, Json<DataResponse<TaskCreated>>)> {
    let task = run_text_request(&state, auth.user_id, body, false).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TaskCreated { task_id: task.id },
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /infer/text2video
// ---------------------------------------------------------------------------

/// Synthesize speech and render a talking-head video from it.
pub async fn text_to_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<TextInferBody>,
) -> AppResult<(StatusCode, Json<DataResponse<TaskCreated>>)> {
    let task = run_text_request(&state, auth.user_id, body, true).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TaskCreated { task_id: task.id },
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /infer/video
// ---------------------------------------------------------------------------

/// Render a talking-head video from an existing audio file.
pub async fn audio_to_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RenderVideoBody>,
) -> AppResult<(StatusCode, Json<DataResponse<TaskCreated>>)> {
    let profile = resolve_profile(state.registry.as_ref(), &body.model_name).await?;
    let audio = ensure_file_owned(&state.pool, body.file_id, auth.user_id).await?;

    let video_key = naming::output_key(&naming::new_output_uid(), naming::SUFFIX_VIDEO);
    let pipeline = compose_render(&audio.key, &profile, &video_key)?;

    let roles = record_outputs(
        &state.pool,
        auth.user_id,
        &[(Some(Role::Video), video_key.as_str())],
    )
    .await?;
    let dispatched = dispatch(state.substrate.as_ref(), &pipeline).await?;
    let task = store_task(&state.pool, auth.user_id, dispatched.handles, &roles).await?;

    tracing::info!(
        task_id = task.id,
        user_id = auth.user_id,
        audio_file_id = audio.id,
        model = %profile.name,
        "Render task created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TaskCreated { task_id: task.id },
        }),
    ))
}
