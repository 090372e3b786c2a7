//! The user job record and its result payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::flow::{Execution, FlowNode, User, Workflow};
use super::status::JobStatus;
use super::{ExecutionId, JobId, NodeId, UserId, WorkflowId};

/// Result key recording which action resolved the job.
pub const RESOLVED_BY_KEY: &str = "_";

/// Result of a user job: submitted values per form block, plus the key of
/// the resolving action under `_`.
///
/// # Examples
///
/// ```
/// use manual_tasks::JobResult;
/// use serde_json::json;
///
/// let result: JobResult = serde_json::from_value(json!({
///     "f1": { "comment": "ok" },
///     "_": "approve"
/// }))
/// .unwrap();
/// assert_eq!(result.resolved_by.as_deref(), Some("approve"));
/// assert_eq!(result.forms["f1"]["comment"], "ok");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Key of the action that resolved the job.
    #[serde(rename = "_", default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,

    /// Submitted values keyed by form block key.
    #[serde(flatten)]
    pub forms: Map<String, Value>,
}

impl JobResult {
    /// Builds a result holding one form block's values and the resolving
    /// action key.
    pub fn resolution(form_key: &str, values: Map<String, Value>, action_key: &str) -> Self {
        let mut forms = Map::new();
        forms.insert(form_key.to_string(), Value::Object(values));
        Self {
            resolved_by: Some(action_key.to_string()),
            forms,
        }
    }

    /// Returns `true` when `action_key` is the recorded resolving action.
    pub fn is_resolved_by(&self, action_key: &str) -> bool {
        self.resolved_by.as_deref() == Some(action_key)
    }

    /// Returns the values submitted for one form block.
    pub fn form(&self, form_key: &str) -> Option<&Map<String, Value>> {
        self.forms.get(form_key).and_then(Value::as_object)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One human work item spawned by a workflow execution.
///
/// Association fields (`user`, `node`, `workflow`, `execution`) are only
/// present when they were appended to the fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJob {
    /// Job identifier, the target of submissions.
    pub id: JobId,

    /// Assignee.
    pub user_id: UserId,

    /// Pending until the assignee submits.
    #[serde(default)]
    pub status: JobStatus,

    /// Submitted values and resolving action.
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: JobResult,

    /// Manual node that spawned this job.
    #[serde(default)]
    pub node_id: Option<NodeId>,

    /// Workflow the node belongs to.
    #[serde(default)]
    pub workflow_id: Option<WorkflowId>,

    /// Execution that owns this job.
    #[serde(default)]
    pub execution_id: Option<ExecutionId>,

    /// Engine-side job this user job contributes to.
    #[serde(default)]
    pub job_id: Option<i64>,

    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Last update time; the resolution time once resolved.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Appended assignee record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Appended node record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<FlowNode>,

    /// Appended workflow record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,

    /// Appended execution record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<Execution>,
}

impl UserJob {
    /// Creates a pending job with no associations loaded.
    pub fn pending(id: JobId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            status: JobStatus::Pending,
            result: JobResult::default(),
            node_id: None,
            workflow_id: None,
            execution_id: None,
            job_id: None,
            created_at: None,
            updated_at: None,
            user: None,
            node: None,
            workflow: None,
            execution: None,
        }
    }

    /// Returns `true` when `user` is this job's assignee.
    pub fn is_assignee(&self, user: Option<UserId>) -> bool {
        user == Some(self.user_id)
    }
}
