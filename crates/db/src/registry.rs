//! [`ModelRegistry`] backed by the `voice_models` table.

use async_trait::async_trait;
use sqlx::PgPool;
use vox_core::error::CoreError;
use vox_core::registry::{ModelProfile, ModelRegistry};

use crate::repositories::ModelRepo;

#[derive(Clone)]
pub struct PgModelRegistry {
    pool: PgPool,
}

impl PgModelRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModelRegistry for PgModelRegistry {
    async fn lookup(&self, name: &str) -> Result<Option<ModelProfile>, CoreError> {
        let model = ModelRepo::find_by_name(&self.pool, name)
            .await
            .map_err(|e| CoreError::Internal(format!("model lookup failed: {e}")))?;
        Ok(model.map(|m| m.profile()))
    }
}
