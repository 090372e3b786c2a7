//! Manual task completion for workflow executions.
//!
//! A workflow's manual node stops the execution and hands a user job to a
//! person: fill in a form, pick an action ("Approve", "Reject"), done. This
//! crate holds the client half of that flow:
//!
//! - [`resolver`] decides, from a job and its execution, how the form
//!   behaves and which actions show up
//! - [`submit`] writes the resolution back once
//! - [`context`] and [`view`] load a job with its node, workflow and
//!   execution and bind it to the handlers in a [`registry`]
//! - [`todo`] builds the todo list query and rows
//! - [`resource`] is the seam to the resource service, with a REST client
//!   behind the `http-client` feature
//!
//! The store that makes "one accepted resolution per job" hold lives in the
//! `manual-tasks-store` crate.
//!
//! # Example
//!
//! ```
//! use manual_tasks::resolver::{resolve_action_visibility, resolve_form_mode, FormMode};
//! use manual_tasks::{Execution, ExecutionStatus, JobResult, JobStatus, UserJob};
//! use serde_json::Map;
//!
//! let mut job = UserJob::pending(1, 10);
//! let execution = Execution { id: 1, status: ExecutionStatus::Started };
//! assert_eq!(resolve_form_mode(&job, &execution, Some(10), false), FormMode::Editable);
//!
//! job.status = JobStatus::Resolved;
//! job.result = JobResult::resolution("form", Map::new(), "approve");
//! assert!(resolve_action_visibility(&job, "approve", Some(10)));
//! assert!(!resolve_action_visibility(&job, "reject", Some(10)));
//! ```

pub mod context;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod submit;
pub mod todo;
pub mod types;
pub mod validation;
pub mod view;

pub use context::{FlowContext, NodeGraph};
pub use error::{ManualTaskError, Result};
pub use registry::Registries;
pub use resolver::{ActionState, FormMode, StatusCell};
pub use resource::{ResourceClient, ResourceError};
pub use submit::{SkipReason, SubmitOutcome, Submitter, ViewHandle};
pub use types::*;
pub use view::TaskView;
