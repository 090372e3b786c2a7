//! Records exchanged with the resource service.
//!
//! These mirror the `users_jobs`, `executions`, `workflows`, `flow_nodes`
//! and `users` collections. Field names serialize in camelCase and status
//! fields use the platform's integer codes (see [`status`]).

pub mod action;
pub mod flow;
pub mod job;
pub mod status;

pub use action::*;
pub use flow::*;
pub use job::*;
pub use status::*;

/// Identifier of a user job.
pub type JobId = i64;
/// Identifier of a user.
pub type UserId = i64;
/// Identifier of a workflow node.
pub type NodeId = i64;
/// Identifier of a workflow.
pub type WorkflowId = i64;
/// Identifier of an execution.
pub type ExecutionId = i64;
