//! Model registry contract.
//!
//! The composer never reads the database directly; it asks a
//! [`ModelRegistry`] for the [`ModelProfile`] of a named voice model and
//! derives every asset key from that.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::naming;

/// Registry view of one voice model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub name: String,
    /// Talking-head speaker id; `None` when no video model is trained.
    pub speaker: Option<String>,
    /// Pitch shift applied during voice conversion.
    pub pitch: i32,
}

impl ModelProfile {
    /// Reference transcript and clip keys for direct synthesis.
    pub fn cosy_assets(&self) -> (String, String) {
        naming::cosy_asset_keys(&self.name)
    }

    /// Index and weight keys for voice conversion.
    pub fn conversion_assets(&self) -> (String, String) {
        naming::conversion_asset_keys(&self.name)
    }
}

#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Look up a model by its unique name.
    async fn lookup(&self, name: &str) -> Result<Option<ModelProfile>, CoreError>;
}
