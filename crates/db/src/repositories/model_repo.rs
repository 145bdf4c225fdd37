//! Repository for the `voice_models` table.

use sqlx::PgPool;
use vox_core::types::DbId;

use crate::models::voice_model::{CreateVoiceModel, UpdateVoiceModel, VoiceModel};

const COLUMNS: &str = "id, name, audio_model, audio_config, video_model, video_config, \
     created_at, updated_at";

pub struct ModelRepo;

impl ModelRepo {
    /// Insert a new model, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateVoiceModel) -> Result<VoiceModel, sqlx::Error> {
        let query = format!(
            "INSERT INTO voice_models \
                (name, audio_model, audio_config, video_model, video_config) \
             VALUES ($1, $2, COALESCE($3, '{{}}'::jsonb), $4, COALESCE($5, '{{}}'::jsonb)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VoiceModel>(&query)
            .bind(&input.name)
            .bind(&input.audio_model)
            .bind(&input.audio_config)
            .bind(&input.video_model)
            .bind(&input.video_config)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VoiceModel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM voice_models WHERE id = $1");
        sqlx::query_as::<_, VoiceModel>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<VoiceModel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM voice_models WHERE name = $1");
        sqlx::query_as::<_, VoiceModel>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Return the model named `name`, creating an empty one if absent.
    pub async fn find_or_create(pool: &PgPool, name: &str) -> Result<VoiceModel, sqlx::Error> {
        let query = format!(
            "INSERT INTO voice_models (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VoiceModel>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<VoiceModel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM voice_models ORDER BY name ASC");
        sqlx::query_as::<_, VoiceModel>(&query).fetch_all(pool).await
    }

    /// Update a model. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateVoiceModel,
    ) -> Result<Option<VoiceModel>, sqlx::Error> {
        let query = format!(
            "UPDATE voice_models SET \
                name = COALESCE($2, name), \
                audio_model = COALESCE($3, audio_model), \
                audio_config = COALESCE($4, audio_config), \
                video_model = COALESCE($5, video_model), \
                video_config = COALESCE($6, video_config), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VoiceModel>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.audio_model)
            .bind(&input.audio_config)
            .bind(&input.video_model)
            .bind(&input.video_config)
            .fetch_optional(pool)
            .await
    }

    /// Delete a model. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM voice_models WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
