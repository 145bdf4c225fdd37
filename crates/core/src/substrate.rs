//! Contract for the remote execution substrate.
//!
//! The substrate runs stages on remote workers. Callers only ever submit a
//! whole [`Pipeline`] and later poll individual [`Handle`]s; nothing is
//! cancelled once submitted.

use async_trait::async_trait;

use crate::pipeline::{DispatchRecord, Handle, Pipeline, RemoteResult};

/// Errors from talking to the execution substrate.
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    /// The substrate could not be reached or returned an unusable response.
    #[error("Substrate request failed: {0}")]
    Transport(String),

    /// The substrate answered with a non-success status.
    #[error("Substrate rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The returned receipt does not have the submitted pipeline's shape.
    #[error("Dispatch record does not mirror the submitted pipeline")]
    ShapeMismatch,

    /// The handle is not known to the substrate.
    #[error("Unknown handle: {0}")]
    UnknownHandle(Handle),
}

/// Remote execution substrate: submit pipelines, poll handles.
#[async_trait]
pub trait ExecutionSubstrate: Send + Sync {
    /// Submit a pipeline for execution. The returned record mirrors the
    /// pipeline's shape.
    async fn submit(&self, pipeline: &Pipeline) -> Result<DispatchRecord, SubstrateError>;

    /// Report the current state of one handle.
    async fn poll(&self, handle: &Handle) -> Result<RemoteResult, SubstrateError>;
}
