//! Workflow, node, execution and user records as returned by the resource
//! service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::action::ActionDescriptor;
use super::status::ExecutionStatus;
use super::{ExecutionId, NodeId, UserId, WorkflowId};
use crate::validation::FieldRule;

/// A workflow run instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Execution identifier.
    pub id: ExecutionId,

    /// Run status. Anything other than queueing/started freezes the
    /// execution's jobs.
    #[serde(default)]
    pub status: ExecutionStatus,
}

/// A workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow identifier.
    pub id: WorkflowId,

    /// Display title.
    #[serde(default)]
    pub title: Option<String>,

    /// Nodes of the workflow, present when `workflow.nodes` was appended.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<FlowNode>,
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Node identifier.
    pub id: NodeId,

    /// Instruction type, e.g. `manual`, `condition`, `calculation`.
    #[serde(rename = "type", default)]
    pub node_type: String,

    /// Display title.
    #[serde(default)]
    pub title: Option<String>,

    /// Previous node on the same branch.
    #[serde(default)]
    pub upstream_id: Option<NodeId>,

    /// Next node on the same branch.
    #[serde(default)]
    pub downstream_id: Option<NodeId>,

    /// Branch index when this node heads a branch of its upstream.
    #[serde(default)]
    pub branch_index: Option<i64>,

    /// Instruction-specific configuration.
    #[serde(default)]
    pub config: Value,
}

impl FlowNode {
    /// Returns the node title, or `#<id>` when it has none.
    pub fn label(&self) -> String {
        self.title.clone().unwrap_or_else(|| format!("#{}", self.id))
    }

    /// Parses the node configuration as a manual node configuration.
    ///
    /// A null or empty config yields the default (no forms).
    pub fn manual_config(&self) -> Result<ManualNodeConfig, serde_json::Error> {
        if self.config.is_null() {
            return Ok(ManualNodeConfig::default());
        }
        serde_json::from_value(self.config.clone())
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,

    /// Display name.
    #[serde(default)]
    pub nickname: Option<String>,
}

impl User {
    /// Returns the nickname, or the id when there is none.
    pub fn label(&self) -> String {
        self.nickname.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// Configuration of a manual node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualNodeConfig {
    /// Form blocks keyed by block key.
    #[serde(default)]
    pub forms: BTreeMap<String, FormBlockConfig>,

    /// Layout schema handed to the rendering engine untouched.
    #[serde(default)]
    pub schema: Value,
}

/// One form block of a manual node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormBlockConfig {
    /// Key of the registered form type handling this block.
    #[serde(rename = "type", default = "default_form_type")]
    pub form_type: String,

    /// Target collection for record-backed form types.
    #[serde(default)]
    pub collection: Option<String>,

    /// Completion actions bound to this block.
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,

    /// Field validators run before submission.
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

fn default_form_type() -> String {
    "customForm".to_string()
}

impl FormBlockConfig {
    /// Finds an action by key.
    pub fn action(&self, key: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.key == key)
    }
}
