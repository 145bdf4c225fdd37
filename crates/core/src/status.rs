//! User-facing task status and the states reported by remote workers.
//!
//! [`TaskStatus`] discriminants match the SMALLINT stored in
//! `tasks.status_id`; [`RemoteState`] is what a worker reports for a single
//! handle, normalised so that anything unrecognised becomes
//! [`RemoteState::Unknown`] instead of being coerced to success or failure.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Coarse status of a whole task.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Unknown = 0,
    Pending = 1,
    Succeeded = 2,
    Failed = 3,
}

impl TaskStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a stored status ID back to the enum. Unrecognised IDs read as
    /// [`TaskStatus::Unknown`].
    pub fn from_id(id: StatusId) -> Self {
        match id {
            1 => Self::Pending,
            2 => Self::Succeeded,
            3 => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Map the numeric code delivered by the training callback.
    ///
    /// `2` = pending, `3` = succeeded, `4` = failed. Everything else
    /// (including `1`, "waiting") has no mapping.
    pub fn from_callback_code(code: i32) -> Option<Self> {
        match code {
            2 => Some(Self::Pending),
            3 => Some(Self::Succeeded),
            4 => Some(Self::Failed),
            _ => None,
        }
    }
}

impl From<TaskStatus> for StatusId {
    fn from(value: TaskStatus) -> Self {
        value as StatusId
    }
}

impl From<RemoteState> for TaskStatus {
    fn from(value: RemoteState) -> Self {
        match value {
            RemoteState::Pending => Self::Pending,
            RemoteState::Succeeded => Self::Succeeded,
            RemoteState::Failed => Self::Failed,
            RemoteState::Unknown => Self::Unknown,
        }
    }
}

/// State of one remote stage as reported by the execution substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    Pending,
    Succeeded,
    Failed,
    Unknown,
}

impl RemoteState {
    /// Normalise a raw state string reported by a worker.
    ///
    /// Accepts both the short (`SUCCESS`, `FAILURE`) and long (`SUCCEEDED`,
    /// `FAILED`) spellings, case-insensitively.
    pub fn from_reported(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "SUCCESS" | "SUCCEEDED" => Self::Succeeded,
            "FAILURE" | "FAILED" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Aggregation priority; higher wins. FAILED > PENDING > UNKNOWN > SUCCEEDED.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Succeeded => 0,
            Self::Unknown => 1,
            Self::Pending => 2,
            Self::Failed => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_states_are_normalised() {
        assert_eq!(RemoteState::from_reported("SUCCESS"), RemoteState::Succeeded);
        assert_eq!(RemoteState::from_reported("succeeded"), RemoteState::Succeeded);
        assert_eq!(RemoteState::from_reported("FAILURE"), RemoteState::Failed);
        assert_eq!(RemoteState::from_reported("PENDING"), RemoteState::Pending);
        assert_eq!(RemoteState::from_reported("RETRY"), RemoteState::Unknown);
        assert_eq!(RemoteState::from_reported("STARTED"), RemoteState::Unknown);
    }

    #[test]
    fn status_ids_round_trip_and_unknown_ids_degrade() {
        for status in [
            TaskStatus::Unknown,
            TaskStatus::Pending,
            TaskStatus::Succeeded,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_id(status.id()), status);
        }
        assert_eq!(TaskStatus::from_id(42), TaskStatus::Unknown);
    }

    #[test]
    fn callback_codes_map_only_known_values() {
        assert_eq!(TaskStatus::from_callback_code(2), Some(TaskStatus::Pending));
        assert_eq!(TaskStatus::from_callback_code(3), Some(TaskStatus::Succeeded));
        assert_eq!(TaskStatus::from_callback_code(4), Some(TaskStatus::Failed));
        assert_eq!(TaskStatus::from_callback_code(1), None);
        assert_eq!(TaskStatus::from_callback_code(0), None);
    }

    #[test]
    fn status_serializes_as_upper_case_name() {
        let json = serde_json::to_string(&TaskStatus::Succeeded).unwrap();
        assert_eq!(json, "\"SUCCEEDED\"");
    }
}
