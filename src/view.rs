//! Task view composition.
//!
//! [`TaskView::compose`] binds a loaded [`FlowContext`] to the registered
//! handlers: every form block gets its form type, every upstream node its
//! instruction. After that the view answers the questions a renderer asks
//! (form mode, button states, title) and routes submissions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::FlowContext;
use crate::error::{ManualTaskError, Result};
use crate::registry::{Instruction, ManualFormType, Registries};
use crate::resolver::{resolve_action_state, resolve_form_mode, status_cell, ActionState, FormMode, StatusCell};
use crate::resource::ResourceClient;
use crate::submit::{Submission, SubmitOutcome, Submitter, ViewHandle};
use crate::todo::task_title;
use crate::types::{FlowNode, FormBlockConfig, UserId};

/// A form block bound to its form type.
pub struct ComposedBlock {
    /// Block key.
    pub key: String,
    /// Block configuration from the node.
    pub config: FormBlockConfig,
    /// Handler for the block's form type.
    pub form_type: Arc<dyn ManualFormType>,
    /// Values the form starts with.
    pub initial_values: Map<String, Value>,
}

impl std::fmt::Debug for ComposedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedBlock")
            .field("key", &self.key)
            .field("form_type", &self.form_type.key())
            .field("actions", &self.config.actions.len())
            .finish()
    }
}

/// An upstream node bound to its instruction.
pub struct UpstreamSlot {
    /// The upstream node.
    pub node: FlowNode,
    /// Handler for the node's type.
    pub instruction: Arc<dyn Instruction>,
}

impl std::fmt::Debug for UpstreamSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSlot")
            .field("node", &self.node.id)
            .field("instruction", &self.instruction.kind())
            .finish()
    }
}

/// A composed task view for one acting user.
#[derive(Debug)]
pub struct TaskView {
    ctx: FlowContext,
    acting_user: Option<UserId>,
    record_loaded: bool,
    blocks: BTreeMap<String, ComposedBlock>,
    upstreams: Vec<UpstreamSlot>,
}

impl TaskView {
    /// Binds the context's form blocks and upstream nodes to `registries`.
    ///
    /// A block with an unregistered form type is an error. An upstream node
    /// with an unregistered instruction is left out.
    pub fn compose(
        ctx: FlowContext,
        registries: &Registries,
        acting_user: Option<UserId>,
        record_loaded: bool,
    ) -> Result<Self> {
        let config = ctx
            .node
            .manual_config()
            .map_err(|e| ManualTaskError::MalformedRecord {
                job_id: ctx.user_job.id,
                reason: format!("invalid manual node config: {e}"),
            })?;

        let mut blocks = BTreeMap::new();
        for (key, block) in config.forms {
            let form_type = registries
                .form_types()
                .get(&block.form_type)
                .cloned()
                .ok_or_else(|| ManualTaskError::UnknownFormType {
                    block: key.clone(),
                    form_type: block.form_type.clone(),
                })?;
            form_type.check_block(&key, &block)?;
            let initial_values = form_type.initial_values(&ctx.user_job, &key);
            blocks.insert(
                key.clone(),
                ComposedBlock {
                    key,
                    config: block,
                    form_type,
                    initial_values,
                },
            );
        }

        let mut upstreams = Vec::new();
        for node in ctx.upstreams() {
            match registries.instructions().get(&node.node_type) {
                Some(instruction) => upstreams.push(UpstreamSlot {
                    node: node.clone(),
                    instruction: Arc::clone(instruction),
                }),
                None => {
                    tracing::warn!(node_id = node.id, node_type = %node.node_type, "no instruction registered for upstream node");
                },
            }
        }

        Ok(Self {
            ctx,
            acting_user,
            record_loaded,
            blocks,
            upstreams,
        })
    }

    /// The loaded context.
    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    /// Interaction mode shared by all form blocks.
    pub fn form_mode(&self) -> FormMode {
        resolve_form_mode(
            &self.ctx.user_job,
            &self.ctx.execution,
            self.acting_user,
            self.record_loaded,
        )
    }

    /// State of every action of `block`, in declaration order.
    pub fn action_states(&self, block: &str) -> Result<Vec<(String, ActionState)>> {
        let composed = self.require_block(block)?;
        Ok(composed
            .config
            .actions
            .iter()
            .map(|action| {
                let state = resolve_action_state(
                    &self.ctx.user_job,
                    &self.ctx.execution,
                    &composed.key,
                    action,
                    self.acting_user,
                );
                (action.key.clone(), state)
            })
            .collect())
    }

    /// Looks a composed block up.
    pub fn block(&self, key: &str) -> Option<&ComposedBlock> {
        self.blocks.get(key)
    }

    /// All composed blocks, by key.
    pub fn blocks(&self) -> impl Iterator<Item = &ComposedBlock> {
        self.blocks.values()
    }

    /// Upstream nodes with a registered instruction, nearest first.
    pub fn upstreams(&self) -> &[UpstreamSlot] {
        &self.upstreams
    }

    /// Upstream nodes whose output forms can reference.
    pub fn variable_sources(&self) -> impl Iterator<Item = &UpstreamSlot> {
        self.upstreams.iter().filter(|s| s.instruction.provides_variables())
    }

    /// Drawer title.
    pub fn title(&self) -> String {
        task_title(self.ctx.workflow.as_ref(), &self.ctx.node)
    }

    /// Status column value of the task.
    pub fn status(&self) -> StatusCell {
        status_cell(&self.ctx.user_job, &self.ctx.execution)
    }

    /// Submits `values` of `block` through the action `action_key`.
    ///
    /// The block and the action must exist; the block's field rules run
    /// before anything is sent. See
    /// [`Submitter::submit_task_resolution`] for the outcomes.
    pub async fn submit<C: ResourceClient>(
        &self,
        submitter: &Submitter<C>,
        block: &str,
        action_key: &str,
        values: Map<String, Value>,
        view: &dyn ViewHandle,
    ) -> Result<SubmitOutcome> {
        let composed = self.require_block(block)?;
        let action = composed
            .config
            .action(action_key)
            .ok_or_else(|| ManualTaskError::UnknownAction {
                block: block.to_string(),
                action: action_key.to_string(),
            })?;
        let submission = Submission::new(&composed.key, values, action).with_rules(&composed.config.fields);
        submitter
            .submit_task_resolution(&self.ctx.user_job, &self.ctx.execution, submission, view)
            .await
    }

    fn require_block(&self, key: &str) -> Result<&ComposedBlock> {
        self.blocks.get(key).ok_or_else(|| ManualTaskError::UnknownFormBlock {
            block: key.to_string(),
        })
    }
}
