use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vox_queue::RetryQueueConfig;
use vox_remote::TrainingEndpoints;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on waiting for queue loops after the server stops.
    pub shutdown_timeout_secs: u64,
    /// Key-value store behind the retry queues; `memory://` keeps it in-process.
    pub redis_url: String,
    /// Execution substrate base URL; `memory://` completes stages in-process.
    pub substrate_url: String,
    /// Root directory of the local blob store.
    pub blob_root: PathBuf,
    /// Externally reachable base URL of this server, used for callbacks.
    pub public_base_url: String,
    /// Training service endpoints, directories and queue timing.
    pub training: TrainingConfig,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                   |
    /// |-------------------------|---------------------------|
    /// | `HOST`                  | `0.0.0.0`                 |
    /// | `PORT`                  | `3000`                    |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                      |
    /// | `REDIS_URL`             | `redis://127.0.0.1:6379/` |
    /// | `SUBSTRATE_URL`         | `memory://`               |
    /// | `BLOB_ROOT`             | `./data/blobs`            |
    /// | `PUBLIC_BASE_URL`       | `http://127.0.0.1:3000`   |
    ///
    /// See [`TrainingConfig::from_env`] and [`JwtConfig::from_env`] for the
    /// remaining variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = env_parse("SHUTDOWN_TIMEOUT_SECS", 30);

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".into());
        let substrate_url = std::env::var("SUBSTRATE_URL")
            .unwrap_or_else(|_| vox_remote::MEMORY_SUBSTRATE_URL.into());
        let blob_root =
            PathBuf::from(std::env::var("BLOB_ROOT").unwrap_or_else(|_| "./data/blobs".into()));
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{port}"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            redis_url,
            substrate_url,
            blob_root,
            public_base_url,
            training: TrainingConfig::from_env(),
            jwt: JwtConfig::from_env(),
        }
    }

    /// URL the talking-head trainer calls back with status updates for
    /// `task_id`.
    pub fn task_callback_url(&self, task_id: vox_core::types::DbId) -> String {
        format!(
            "{}/api/v1/internal/tasks/{task_id}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

/// Settings for the model-training flows.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub endpoints: TrainingEndpoints,
    /// Per-model reference clips handed to the conversion trainer.
    pub conversion_reference_root: PathBuf,
    /// Per-model output directory for sliced direct-synthesis prompts.
    pub cosy_workspace_root: PathBuf,
    /// Per-speaker clip directory read by the talking-head trainer.
    pub talking_head_clip_root: PathBuf,
    /// Epochs used when a request does not specify any.
    pub default_epoch: u32,
    pub audio_queue: RetryQueueConfig,
    pub video_queue: RetryQueueConfig,
}

impl TrainingConfig {
    /// | Env Var                        | Default                          |
    /// |--------------------------------|----------------------------------|
    /// | `TALKING_HEAD_URL`             | `http://127.0.0.1:8000`          |
    /// | `AUDIO_SLICER_URL`             | `http://127.0.0.1:3336`          |
    /// | `CONVERSION_TRAINER_URL`       | `http://127.0.0.1:3334`          |
    /// | `CONVERSION_REFERENCE_ROOT`    | `./data/reference/conversion`    |
    /// | `COSY_WORKSPACE_ROOT`          | `./data/reference/cosy`          |
    /// | `TALKING_HEAD_CLIP_ROOT`       | `./data/reference/talking-head`  |
    /// | `TRAIN_DEFAULT_EPOCH`          | `200`                            |
    /// | `TRAIN_AUDIO_HANDLE_SECS`      | `120`                            |
    /// | `TRAIN_AUDIO_RETRY_SECS`       | `60`                             |
    /// | `TRAIN_VIDEO_HANDLE_SECS`      | `1200`                           |
    /// | `TRAIN_VIDEO_RETRY_SECS`       | `300`                            |
    /// | `QUEUE_BACKOFF_MULTIPLIER`     | `1.0`                            |
    /// | `QUEUE_MAX_RETRY_SECS`         | `3600`                           |
    pub fn from_env() -> Self {
        let endpoints = TrainingEndpoints {
            talking_head_url: env_string("TALKING_HEAD_URL", "http://127.0.0.1:8000"),
            slicer_url: env_string("AUDIO_SLICER_URL", "http://127.0.0.1:3336"),
            conversion_url: env_string("CONVERSION_TRAINER_URL", "http://127.0.0.1:3334"),
        };

        let backoff: f64 = env_parse("QUEUE_BACKOFF_MULTIPLIER", 1.0);
        let max_retry = Duration::from_secs(env_parse("QUEUE_MAX_RETRY_SECS", 3600));
        let queue = |handle_var: &str, handle: u64, retry_var: &str, retry: u64| {
            RetryQueueConfig::new(
                Duration::from_secs(env_parse(handle_var, handle)),
                Duration::from_secs(env_parse(retry_var, retry)),
            )
            .with_backoff(backoff, max_retry)
        };

        Self {
            endpoints,
            conversion_reference_root: env_string(
                "CONVERSION_REFERENCE_ROOT",
                "./data/reference/conversion",
            )
            .into(),
            cosy_workspace_root: env_string("COSY_WORKSPACE_ROOT", "./data/reference/cosy").into(),
            talking_head_clip_root: env_string(
                "TALKING_HEAD_CLIP_ROOT",
                "./data/reference/talking-head",
            )
            .into(),
            default_epoch: env_parse("TRAIN_DEFAULT_EPOCH", 200),
            audio_queue: queue("TRAIN_AUDIO_HANDLE_SECS", 120, "TRAIN_AUDIO_RETRY_SECS", 60),
            video_queue: queue("TRAIN_VIDEO_HANDLE_SECS", 1200, "TRAIN_VIDEO_RETRY_SECS", 300),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse `key` from the environment, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but does not parse.
fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
