//! Long-running background work.
//!
//! Jobs run on [`vox_queue`] retry queues owned by the process-wide
//! [`QueueManager`](vox_queue::QueueManager); handlers here only decide what
//! one attempt does and when a job is beyond saving.

pub mod training;
