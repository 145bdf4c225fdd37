use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vox_core::error::CoreError;
use vox_core::storage::BlobError;
use vox_core::substrate::SubstrateError;
use vox_pipeline::CompositionError;
use vox_queue::QueueError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of every vox crate and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The request could not be turned into a pipeline.
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// Submitting to the execution substrate failed.
    #[error(transparent)]
    Substrate(#[from] SubstrateError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Composition(err) => match err {
                CompositionError::UnknownModel(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                CompositionError::Registry(core) => classify_core_error(core),
                CompositionError::EmptyText
                | CompositionError::MissingSpeaker(_)
                | CompositionError::MissingIntermediateOutput
                | CompositionError::MissingOutput(_)
                | CompositionError::UnsupportedShape => (
                    StatusCode::BAD_REQUEST,
                    "INCONSISTENT_REQUEST",
                    err.to_string(),
                ),
            },
            AppError::Substrate(err) => {
                tracing::error!(error = %err, "Execution substrate error");
                (
                    StatusCode::BAD_GATEWAY,
                    "SUBSTRATE_ERROR",
                    "The execution substrate did not accept the pipeline".to_string(),
                )
            }
            AppError::Queue(err) => internal("Retry queue error", err),
            AppError::Blob(err) => match err {
                BlobError::NotFound(key) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Blob {key} not found"),
                ),
                BlobError::InvalidKey(key) => (
                    StatusCode::BAD_REQUEST,
                    "BAD_REQUEST",
                    format!("Invalid blob key: {key}"),
                ),
                BlobError::Io(io) => internal("Blob store error", io),
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal("Internal error", msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Log `err` and produce a sanitized 500.
fn internal(context: &'static str, err: &dyn std::fmt::Display) -> Classified {
    tracing::error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(core: &CoreError) -> Classified {
    match core {
        CoreError::NotFound { entity, key } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} {key} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InconsistentRequest(msg) => (
            StatusCode::BAD_REQUEST,
            "INCONSISTENT_REQUEST",
            msg.clone(),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => internal("Internal core error", msg),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            internal("Database error", db_err)
        }
        other => internal("Database error", other),
    }
}
