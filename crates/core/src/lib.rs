//! Domain types shared by every vox crate.
//!
//! Pipeline trees and dispatch receipts, task and remote statuses, blob key
//! conventions, and the narrow contracts (execution substrate, model
//! registry, blob store) the orchestration crates are written against.

pub mod error;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod status;
pub mod storage;
pub mod substrate;
pub mod types;
