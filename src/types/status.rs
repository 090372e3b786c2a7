//! Job and execution status codes.
//!
//! Both enums travel on the wire as the platform's integer codes. A missing
//! or `null` status is the "not yet decided" state: [`JobStatus::Pending`]
//! for user jobs and [`ExecutionStatus::Queueing`] for executions. Every
//! decision in this crate reduces to two checks:
//! [`JobStatus::is_pending`] and [`ExecutionStatus::is_ended`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status of a single user job (one manual task for one assignee).
///
/// `Pending` is the only non-terminal state. Every other variant is a
/// resolved sub-kind: which one depends on the action the assignee took.
///
/// # Examples
///
/// ```
/// use manual_tasks::JobStatus;
///
/// assert!(JobStatus::Pending.is_pending());
/// assert!(!JobStatus::Rejected.is_pending());
/// assert_eq!(JobStatus::from_code(-5), Some(JobStatus::Rejected));
/// assert_eq!(JobStatus::Resolved.code(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    /// Waiting for the assignee.
    #[default]
    Pending,
    /// Resolved by an action that lets the workflow continue.
    Resolved,
    /// Failed.
    Failed,
    /// Errored while being processed.
    Error,
    /// Aborted together with its execution.
    Aborted,
    /// Canceled.
    Canceled,
    /// Resolved by an action that rejects (terminates) the workflow.
    Rejected,
    /// Needs to be retried.
    RetryNeeded,
}

impl JobStatus {
    /// All statuses, in wire-code order starting from `Pending`.
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Pending,
        JobStatus::Resolved,
        JobStatus::Failed,
        JobStatus::Error,
        JobStatus::Aborted,
        JobStatus::Canceled,
        JobStatus::Rejected,
        JobStatus::RetryNeeded,
    ];

    /// Returns the integer wire code.
    pub fn code(self) -> i8 {
        match self {
            Self::Pending => 0,
            Self::Resolved => 1,
            Self::Failed => -1,
            Self::Error => -2,
            Self::Aborted => -3,
            Self::Canceled => -4,
            Self::Rejected => -5,
            Self::RetryNeeded => -6,
        }
    }

    /// Maps an integer wire code back to a status.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| i64::from(s.code()) == code)
    }

    /// Returns `true` while the job still waits for its assignee.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` once the job has been resolved in any way.
    pub fn is_resolved(self) -> bool {
        !self.is_pending()
    }

    /// Human readable label used by list columns and footers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Resolved => "Resolved",
            Self::Failed => "Failed",
            Self::Error => "Error",
            Self::Aborted => "Aborted",
            Self::Canceled => "Canceled",
            Self::Rejected => "Rejected",
            Self::RetryNeeded => "Retry needed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.code())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<i64>::deserialize(deserializer)? {
            None => Ok(Self::Pending),
            Some(code) => Self::from_code(code).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown job status code {code}"))
            }),
        }
    }
}

/// Status of the workflow execution that owns a job.
///
/// `Queueing` (wire `null`) and `Started` (wire `0`) mean the execution is
/// still running. Any other value means it has ended, which freezes all of
/// its jobs regardless of their own status.
///
/// # Examples
///
/// ```
/// use manual_tasks::ExecutionStatus;
///
/// assert!(!ExecutionStatus::Started.is_ended());
/// assert!(ExecutionStatus::Aborted.is_ended());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionStatus {
    /// Created but not picked up yet.
    #[default]
    Queueing,
    /// Running.
    Started,
    /// Finished successfully.
    Resolved,
    /// Finished with a failure.
    Failed,
    /// Finished with an error.
    Error,
    /// Aborted.
    Aborted,
    /// Canceled.
    Canceled,
    /// Rejected by a manual step.
    Rejected,
}

impl ExecutionStatus {
    /// Returns the wire code, `None` for `Queueing`.
    pub fn code(self) -> Option<i8> {
        match self {
            Self::Queueing => None,
            Self::Started => Some(0),
            Self::Resolved => Some(1),
            Self::Failed => Some(-1),
            Self::Error => Some(-2),
            Self::Aborted => Some(-3),
            Self::Canceled => Some(-4),
            Self::Rejected => Some(-5),
        }
    }

    /// Maps a wire code (`None` for null) back to a status.
    pub fn from_code(code: Option<i64>) -> Option<Self> {
        match code {
            None => Some(Self::Queueing),
            Some(0) => Some(Self::Started),
            Some(1) => Some(Self::Resolved),
            Some(-1) => Some(Self::Failed),
            Some(-2) => Some(Self::Error),
            Some(-3) => Some(Self::Aborted),
            Some(-4) => Some(Self::Canceled),
            Some(-5) => Some(Self::Rejected),
            Some(_) => None,
        }
    }

    /// Returns `true` once the execution can no longer make progress.
    pub fn is_ended(self) -> bool {
        !matches!(self, Self::Queueing | Self::Started)
    }
}

impl Serialize for ExecutionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.code() {
            Some(code) => serializer.serialize_i8(code),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ExecutionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = Option::<i64>::deserialize(deserializer)?;
        Self::from_code(code).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown execution status code {code:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_job_status_is_pending() {
        let status: JobStatus = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(status, JobStatus::Pending);
        let status: JobStatus = serde_json::from_value(json!(0)).unwrap();
        assert_eq!(status, JobStatus::Pending);
    }

    #[test]
    fn job_status_serializes_as_code() {
        assert_eq!(serde_json::to_value(JobStatus::Rejected).unwrap(), json!(-5));
        assert_eq!(serde_json::to_value(JobStatus::Resolved).unwrap(), json!(1));
    }

    #[test]
    fn unknown_job_status_code_is_rejected() {
        let err = serde_json::from_value::<JobStatus>(json!(42)).unwrap_err();
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn only_pending_is_pending() {
        for status in JobStatus::ALL {
            assert_eq!(status.is_pending(), status == JobStatus::Pending, "{status}");
        }
    }

    #[test]
    fn execution_null_and_zero_are_running() {
        let queued: ExecutionStatus = serde_json::from_value(json!(null)).unwrap();
        let started: ExecutionStatus = serde_json::from_value(json!(0)).unwrap();
        assert!(!queued.is_ended());
        assert!(!started.is_ended());
        let ended: ExecutionStatus = serde_json::from_value(json!(1)).unwrap();
        assert!(ended.is_ended());
    }

    #[test]
    fn execution_queueing_serializes_as_null() {
        assert_eq!(
            serde_json::to_value(ExecutionStatus::Queueing).unwrap(),
            json!(null)
        );
        assert_eq!(
            serde_json::to_value(ExecutionStatus::Started).unwrap(),
            json!(0)
        );
    }
}
