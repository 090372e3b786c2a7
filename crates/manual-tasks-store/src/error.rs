//! Error types for user job store operations.
//!
//! Provides [`StoreError`], an error enum with context fields and an HTTP
//! status mapping used when the store answers resource calls.

use std::fmt;

use manual_tasks::resource::ResourceError;
use manual_tasks::{ExecutionId, JobId, JobStatus, UserId};

/// Errors that can occur during store operations.
///
/// Each variant carries the ids involved. Use
/// [`status_code`](StoreError::status_code) to map to the HTTP status the
/// resource service answers with.
///
/// # Examples
///
/// ```
/// use manual_tasks::JobStatus;
/// use manual_tasks_store::StoreError;
///
/// let err = StoreError::AlreadyResolved {
///     job_id: 7,
///     status: JobStatus::Rejected,
/// };
/// assert_eq!(err.status_code(), 409);
/// assert!(err.to_string().contains("job 7"));
/// ```
#[derive(Debug)]
pub enum StoreError {
    /// No record with this id in the collection.
    NotFound {
        /// Collection name.
        collection: String,
        /// Missing id.
        id: i64,
    },

    /// The acting user is not the job's assignee.
    Forbidden {
        /// The job.
        job_id: JobId,
        /// The user who tried to act on it.
        user_id: Option<UserId>,
    },

    /// The job left the pending state already.
    AlreadyResolved {
        /// The job.
        job_id: JobId,
        /// Its current status.
        status: JobStatus,
    },

    /// The execution owning the job has ended.
    ExecutionEnded {
        /// The job.
        job_id: JobId,
        /// The ended execution.
        execution_id: ExecutionId,
    },

    /// Another write landed between read and conditional update.
    ConcurrentModification {
        /// The job.
        job_id: JobId,
        /// Version read before the update.
        expected_version: u64,
        /// Version found at write time.
        actual_version: u64,
    },

    /// The resolving action is not bound to the job's node, or cannot
    /// resolve it.
    InvalidAction {
        /// The job.
        job_id: JobId,
        /// Requested action key, if any.
        action: Option<String>,
    },

    /// The submitted values are unusable.
    InvalidPayload {
        /// The job.
        job_id: JobId,
        /// What is wrong.
        reason: String,
    },

    /// Storage or serialization failure.
    Storage(String),
}

impl StoreError {
    /// Returns the HTTP status code for this error.
    ///
    /// | Variant | Code |
    /// |---------|------|
    /// | `InvalidAction`, `InvalidPayload` | 400 |
    /// | `Forbidden` | 403 |
    /// | `NotFound` | 404 |
    /// | `AlreadyResolved`, `ExecutionEnded`, `ConcurrentModification` | 409 |
    /// | `Storage` | 500 |
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAction { .. } | Self::InvalidPayload { .. } => 400,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::AlreadyResolved { .. }
            | Self::ExecutionEnded { .. }
            | Self::ConcurrentModification { .. } => 409,
            Self::Storage(_) => 500,
        }
    }

    /// Returns `true` for the errors a losing concurrent submission sees.
    pub fn is_conflict(&self) -> bool {
        self.status_code() == 409
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { collection, id } => {
                write!(f, "{collection} record {id} not found")
            },
            Self::Forbidden { job_id, user_id } => match user_id {
                Some(user) => write!(f, "user {user} is not the assignee of job {job_id}"),
                None => write!(f, "job {job_id} requires a signed-in assignee"),
            },
            Self::AlreadyResolved { job_id, status } => {
                write!(f, "job {job_id} is already resolved ({status})")
            },
            Self::ExecutionEnded {
                job_id,
                execution_id,
            } => write!(
                f,
                "execution {execution_id} of job {job_id} has ended"
            ),
            Self::ConcurrentModification {
                job_id,
                expected_version,
                actual_version,
            } => write!(
                f,
                "job {job_id} was modified concurrently (expected version {expected_version}, found {actual_version})"
            ),
            Self::InvalidAction { job_id, action } => match action {
                Some(action) => write!(f, "action '{action}' cannot resolve job {job_id}"),
                None => write!(f, "submission for job {job_id} names no action"),
            },
            Self::InvalidPayload { job_id, reason } => {
                write!(f, "invalid submission for job {job_id}: {reason}")
            },
            Self::Storage(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for ResourceError {
    fn from(err: StoreError) -> Self {
        ResourceError::from_status(err.status_code(), err.to_string())
    }
}
