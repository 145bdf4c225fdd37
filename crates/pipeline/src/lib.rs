//! Pipeline composition and status reconciliation.
//!
//! [`composer`] turns an inference request into a [`Pipeline`] tree and
//! submits it; [`reconciler`] flattens the receipt into the handle list a
//! task stores and later folds the polled states back into one status.
//!
//! [`Pipeline`]: vox_core::pipeline::Pipeline

pub mod composer;
pub mod reconciler;

pub use composer::{
    compose, compose_render, dispatch, resolve_profile, AudioMode, CompositionError, Dispatched,
    InferRequest, OutputPlan, DEFAULT_AUDIO_PROFILE,
};
pub use reconciler::{
    aggregate_status, flatten, reconcile, resolve_results, PolledHandle, Role, RoleMap,
    RoleMapError, RoleOutput, TaskReport, TaskSnapshot,
};
