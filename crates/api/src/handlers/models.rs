//! Handlers for voice model management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use vox_core::error::CoreError;
use vox_core::types::DbId;
use vox_db::models::voice_model::{CreateVoiceModel, UpdateVoiceModel, VoiceModel};
use vox_db::repositories::ModelRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::validate_path_segment;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Return only the model with this exact name.
    pub name: Option<String>,
}

async fn ensure_model_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<VoiceModel> {
    ModelRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("VoiceModel", id)))
}

// ---------------------------------------------------------------------------
// GET /models
// ---------------------------------------------------------------------------

pub async fn list_models(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<VoiceModel>>>> {
    let models = match params.name {
        Some(name) => ModelRepo::find_by_name(&state.pool, &name)
            .await?
            .into_iter()
            .collect(),
        None => ModelRepo::list(&state.pool).await?,
    };
    Ok(Json(DataResponse { data: models }))
}

// ---------------------------------------------------------------------------
// POST /models
// ---------------------------------------------------------------------------

pub async fn create_model(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateVoiceModel>,
) -> AppResult<(StatusCode, Json<DataResponse<VoiceModel>>)> {
    validate_path_segment("name", &input.name)?;
    let model = ModelRepo::create(&state.pool, &input).await?;
    tracing::info!(id = model.id, name = %model.name, "Voice model created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: model })))
}

// ---------------------------------------------------------------------------
// GET /models/{id}
// ---------------------------------------------------------------------------

pub async fn get_model(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VoiceModel>>> {
    let model = ensure_model_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: model }))
}

// ---------------------------------------------------------------------------
// PUT /models/{id}
// ---------------------------------------------------------------------------

/// Partial update; absent fields keep their stored value.
pub async fn update_model(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateVoiceModel>,
) -> AppResult<Json<DataResponse<VoiceModel>>> {
    if let Some(name) = &input.name {
        validate_path_segment("name", name)?;
    }
    let model = ModelRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("VoiceModel", id)))?;
    tracing::info!(id, name = %model.name, "Voice model updated");
    Ok(Json(DataResponse { data: model }))
}

// ---------------------------------------------------------------------------
// DELETE /models/{id}
// ---------------------------------------------------------------------------

pub async fn delete_model(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ModelRepo::delete(&state.pool, id).await? {
        tracing::info!(id, "Voice model deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::not_found("VoiceModel", id)))
    }
}
