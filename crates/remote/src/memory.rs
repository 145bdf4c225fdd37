//! In-process execution substrate.
//!
//! Records every submitted pipeline and hands out UUID handles mirroring its
//! shape. Stage states are scripted by the caller, or settle immediately as
//! SUCCESS with their declared output when built with
//! [`MemorySubstrate::completing`].

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use vox_core::pipeline::{DispatchRecord, Handle, Pipeline, RemoteResult, Stage};
use vox_core::substrate::{ExecutionSubstrate, SubstrateError};

struct Slot {
    stage: Stage,
    raw_state: String,
    output: Option<serde_json::Value>,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<Handle, Slot>,
    order: Vec<Handle>,
    submitted: Vec<Pipeline>,
}

#[derive(Default)]
pub struct MemorySubstrate {
    inner: Mutex<Inner>,
    auto_complete: bool,
}

impl MemorySubstrate {
    /// Every submitted stage stays PENDING until scripted otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every submitted stage reports SUCCESS with its declared output key.
    pub fn completing() -> Self {
        Self {
            auto_complete: true,
            ..Self::default()
        }
    }

    /// Set the raw state and reported output of `handle`.
    pub fn set_state(
        &self,
        handle: &Handle,
        raw_state: &str,
        output: Option<serde_json::Value>,
    ) -> Result<(), SubstrateError> {
        let mut inner = self.inner.lock();
        let slot = inner
            .slots
            .get_mut(handle)
            .ok_or_else(|| SubstrateError::UnknownHandle(handle.clone()))?;
        slot.raw_state = raw_state.to_string();
        slot.output = output;
        Ok(())
    }

    /// Mark `handle` SUCCESS with the output its stage declared.
    pub fn complete(&self, handle: &Handle) -> Result<(), SubstrateError> {
        let output = self
            .stage(handle)
            .map(|s| serde_json::Value::String(s.output))
            .ok_or_else(|| SubstrateError::UnknownHandle(handle.clone()))?;
        self.set_state(handle, "SUCCESS", Some(output))
    }

    pub fn fail(&self, handle: &Handle) -> Result<(), SubstrateError> {
        self.set_state(handle, "FAILURE", None)
    }

    pub fn stage(&self, handle: &Handle) -> Option<Stage> {
        self.inner.lock().slots.get(handle).map(|s| s.stage.clone())
    }

    /// All handles issued so far, in issue order.
    pub fn handles(&self) -> Vec<Handle> {
        self.inner.lock().order.clone()
    }

    /// Pipelines received by `submit`, oldest first.
    pub fn submitted(&self) -> Vec<Pipeline> {
        self.inner.lock().submitted.clone()
    }

    fn issue(&self, inner: &mut Inner, pipeline: &Pipeline) -> DispatchRecord {
        match pipeline {
            Pipeline::Stage(stage) => {
                let handle = Handle(uuid::Uuid::new_v4().to_string());
                let (raw_state, output) = if self.auto_complete {
                    (
                        "SUCCESS".to_string(),
                        Some(serde_json::Value::String(stage.output.clone())),
                    )
                } else {
                    ("PENDING".to_string(), None)
                };
                inner.slots.insert(
                    handle.clone(),
                    Slot {
                        stage: stage.clone(),
                        raw_state,
                        output,
                    },
                );
                inner.order.push(handle.clone());
                DispatchRecord::Leaf { handle }
            }
            Pipeline::Sequence { steps } => DispatchRecord::Sequence {
                steps: steps.iter().map(|s| self.issue(inner, s)).collect(),
            },
            Pipeline::Fanout { branches } => DispatchRecord::Fanout {
                branches: branches.iter().map(|b| self.issue(inner, b)).collect(),
            },
        }
    }
}

#[async_trait]
impl ExecutionSubstrate for MemorySubstrate {
    async fn submit(&self, pipeline: &Pipeline) -> Result<DispatchRecord, SubstrateError> {
        let mut inner = self.inner.lock();
        inner.submitted.push(pipeline.clone());
        let record = self.issue(&mut inner, pipeline);
        tracing::debug!(stages = pipeline.stages().len(), "Pipeline accepted by in-memory substrate");
        Ok(record)
    }

    async fn poll(&self, handle: &Handle) -> Result<RemoteResult, SubstrateError> {
        let inner = self.inner.lock();
        let slot = inner
            .slots
            .get(handle)
            .ok_or_else(|| SubstrateError::UnknownHandle(handle.clone()))?;
        Ok(RemoteResult::from_reported(
            slot.raw_state.clone(),
            slot.output.clone(),
        ))
    }
}
