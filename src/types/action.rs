//! Completion actions bound to a manual form block.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::status::JobStatus;

/// One candidate completion action ("Approve", "Reject", ...) bound to a
/// form block.
///
/// `key` is the action's name; it is what ends up in the job result's `_`
/// entry once the action resolves the job. `status` is the job status the
/// action resolves to.
///
/// # Examples
///
/// ```
/// use manual_tasks::{ActionDescriptor, JobStatus};
/// use serde_json::json;
///
/// let action: ActionDescriptor = serde_json::from_value(json!({
///     "key": "reject",
///     "status": -5,
///     "assignedValues": { "values": { "approved": false } }
/// }))
/// .unwrap();
/// assert_eq!(action.status, JobStatus::Rejected);
/// assert_eq!(action.assigned_values.values["approved"], json!(false));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    /// Action name, unique within its form block.
    pub key: String,

    /// Status the job takes when this action resolves it.
    #[serde(default = "default_action_status")]
    pub status: JobStatus,

    /// Values forced into the submitted form values.
    #[serde(default)]
    pub assigned_values: AssignedValues,
}

fn default_action_status() -> JobStatus {
    JobStatus::Resolved
}

impl ActionDescriptor {
    /// Creates an action resolving to [`JobStatus::Resolved`] with no
    /// assigned values.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: JobStatus::Resolved,
            assigned_values: AssignedValues::default(),
        }
    }

    /// Sets the status the action resolves to.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Adds one assigned value.
    pub fn with_assigned_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.assigned_values.values.insert(name.into(), value);
        self
    }
}

/// Values an action writes over the submitted form values.
///
/// This type always has the `{ "values": { ... } }` shape, and only
/// `values` is merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignedValues {
    /// Field name to forced value.
    #[serde(default)]
    pub values: Map<String, Value>,
}

impl AssignedValues {
    /// Returns `true` when the action forces no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
