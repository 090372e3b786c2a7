//! Crate-level error type.

use thiserror::Error;

use crate::resource::ResourceError;
use crate::types::JobId;
use crate::validation::FieldError;

/// Errors surfaced by view composition and submission.
///
/// Stale-state submissions are not errors: they come back as
/// [`SubmitOutcome::Skipped`](crate::submit::SubmitOutcome::Skipped).
#[derive(Error, Debug)]
pub enum ManualTaskError {
    /// The form's own validators rejected the values. Nothing was sent.
    #[error("form validation failed for {} field(s)", errors.len())]
    Validation {
        /// Every failing field.
        errors: Vec<FieldError>,
    },

    /// The resource service failed or refused the request.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A form block names a form type nobody registered.
    #[error("form block '{block}' uses unregistered form type '{form_type}'")]
    UnknownFormType {
        /// Block key.
        block: String,
        /// Requested form type key.
        form_type: String,
    },

    /// A form block's configuration does not fit its form type.
    #[error("form block '{block}' is misconfigured: {reason}")]
    InvalidFormBlock {
        /// Block key.
        block: String,
        /// What is wrong.
        reason: String,
    },

    /// No form block with this key exists on the node.
    #[error("unknown form block '{block}'")]
    UnknownFormBlock {
        /// Requested block key.
        block: String,
    },

    /// The action is not bound to the form block.
    #[error("form block '{block}' has no action '{action}'")]
    UnknownAction {
        /// Block key.
        block: String,
        /// Requested action key.
        action: String,
    },

    /// A registry already holds a handler under this key.
    #[error("{kind} '{key}' is already registered")]
    DuplicateRegistration {
        /// Registry kind, e.g. "form type".
        kind: &'static str,
        /// Duplicate key.
        key: String,
    },

    /// A fetched record lacks data the flow needs.
    #[error("malformed record for job {job_id}: {reason}")]
    MalformedRecord {
        /// The job being loaded.
        job_id: JobId,
        /// What is missing or wrong.
        reason: String,
    },

    /// A payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for this crate.
pub type Result<T, E = ManualTaskError> = std::result::Result<T, E>;
