//! Turns a dispatched pipeline into one user-facing status.
//!
//! The task row stores the flattened handle list and a role map; a status
//! query polls every handle, folds the states with a fixed precedence, and
//! reports a role's file only once the stage that produced it succeeded
//! with the expected blob key.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use vox_core::pipeline::{DispatchRecord, Handle, RemoteResult};
use vox_core::status::{RemoteState, TaskStatus};
use vox_core::substrate::ExecutionSubstrate;
use vox_core::types::DbId;

/// Raw state recorded for a handle whose poll failed.
const UNREACHABLE_STATE: &str = "UNKNOWN";

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Audio,
    Srt,
    Video,
}

/// File recorded for a role at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOutput {
    pub file_id: DbId,
    pub key: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoleMapError {
    #[error("role {0:?} recorded twice")]
    DuplicateRole(Role),

    #[error("blob key '{0}' assigned to more than one role")]
    DuplicateKey(String),
}

/// Role → output mapping in which no two roles share a blob key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Role, RoleOutput>",
    into = "BTreeMap<Role, RoleOutput>"
)]
pub struct RoleMap(BTreeMap<Role, RoleOutput>);

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role, output: RoleOutput) -> Result<(), RoleMapError> {
        if self.0.contains_key(&role) {
            return Err(RoleMapError::DuplicateRole(role));
        }
        if self.0.values().any(|o| o.key == output.key) {
            return Err(RoleMapError::DuplicateKey(output.key));
        }
        self.0.insert(role, output);
        Ok(())
    }

    pub fn get(&self, role: Role) -> Option<&RoleOutput> {
        self.0.get(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &RoleOutput)> {
        self.0.iter().map(|(r, o)| (*r, o))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<Role, RoleOutput>> for RoleMap {
    type Error = RoleMapError;

    fn try_from(value: BTreeMap<Role, RoleOutput>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        for output in value.values() {
            if !seen.insert(output.key.as_str()) {
                return Err(RoleMapError::DuplicateKey(output.key.clone()));
            }
        }
        Ok(Self(value))
    }
}

impl From<RoleMap> for BTreeMap<Role, RoleOutput> {
    fn from(value: RoleMap) -> Self {
        value.0
    }
}

// ---------------------------------------------------------------------------
// Flatten / aggregate / resolve
// ---------------------------------------------------------------------------

/// All handles of `record`, depth-first, parents before children, branches
/// in declaration order.
pub fn flatten(record: &DispatchRecord) -> Vec<Handle> {
    fn walk(record: &DispatchRecord, out: &mut Vec<Handle>) {
        match record {
            DispatchRecord::Leaf { handle } => out.push(handle.clone()),
            DispatchRecord::Sequence { steps: children }
            | DispatchRecord::Fanout { branches: children } => {
                for child in children {
                    walk(child, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(record, &mut out);
    out
}

/// Fold remote states into one task status.
///
/// Precedence FAILED > PENDING > UNKNOWN > SUCCEEDED; an empty input is
/// SUCCEEDED.
pub fn aggregate_status<I>(states: I) -> TaskStatus
where
    I: IntoIterator<Item = RemoteState>,
{
    states
        .into_iter()
        .fold(RemoteState::Succeeded, |acc, state| {
            if state.precedence() > acc.precedence() {
                state
            } else {
                acc
            }
        })
        .into()
}

/// One polled handle.
#[derive(Debug, Clone, PartialEq)]
pub struct PolledHandle {
    pub handle: Handle,
    pub result: RemoteResult,
}

/// File ids of the roles whose producing stage succeeded with the recorded
/// key. Roles with no such stage are simply absent.
pub fn resolve_results(polled: &[PolledHandle], roles: &RoleMap) -> BTreeMap<Role, DbId> {
    let mut results = BTreeMap::new();
    for p in polled {
        if p.result.state != RemoteState::Succeeded {
            continue;
        }
        let Some(key) = p.result.output_key() else {
            continue;
        };
        if let Some((role, output)) = roles.iter().find(|(_, o)| o.key == key) {
            results.insert(role, output.file_id);
        }
    }
    results
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// What the reconciler needs from a stored task.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: DbId,
    pub handles: Vec<Handle>,
    pub roles: RoleMap,
    /// Coarse status set out of band (training tasks).
    pub status: Option<TaskStatus>,
}

/// User-facing view of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub id: DbId,
    pub status: TaskStatus,
    pub results: BTreeMap<Role, DbId>,
    pub handle_states: BTreeMap<Handle, String>,
}

/// Poll every handle of `task` and build its report.
///
/// A failed poll counts as UNKNOWN for that handle; it never aborts the
/// report. Tasks without handles report their stored status.
pub async fn reconcile(substrate: &dyn ExecutionSubstrate, task: &TaskSnapshot) -> TaskReport {
    if task.handles.is_empty() {
        return TaskReport {
            id: task.id,
            status: task.status.unwrap_or(TaskStatus::Unknown),
            results: BTreeMap::new(),
            handle_states: BTreeMap::new(),
        };
    }

    let polls = task.handles.iter().map(|handle| async move {
        let result = match substrate.poll(handle).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(task_id = task.id, handle = %handle, error = %e, "Handle poll failed");
                RemoteResult {
                    state: RemoteState::Unknown,
                    raw_state: UNREACHABLE_STATE.to_string(),
                    output: None,
                }
            }
        };
        PolledHandle {
            handle: handle.clone(),
            result,
        }
    });
    let polled = futures::future::join_all(polls).await;

    let status = aggregate_status(polled.iter().map(|p| p.result.state));
    let results = resolve_results(&polled, &task.roles);
    let handle_states = polled
        .iter()
        .map(|p| (p.handle.clone(), p.result.raw_state.clone()))
        .collect();

    TaskReport {
        id: task.id,
        status,
        results,
        handle_states,
    }
}
