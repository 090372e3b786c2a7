//! Task completion state resolution.
//!
//! Pure decision functions over a snapshot of a user job and its execution.
//! They decide how the task's form behaves, which completion actions show up
//! and what the status column says. None of them perform I/O; the view layer
//! calls them on whatever state it fetched last.
//!
//! All of them reduce to two predicates: whether the execution has ended
//! ([`ExecutionStatus::is_ended`](crate::ExecutionStatus::is_ended)) and
//! whether the job is still pending
//! ([`JobStatus::is_pending`](crate::JobStatus::is_pending)). A finished
//! task is frozen before the assignee is even considered.

use std::fmt;

use crate::types::{ActionDescriptor, Execution, JobStatus, UserId, UserJob};

/// How a task's form block behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormMode {
    /// The assignee may edit and submit.
    Editable,
    /// Shown but not interactive.
    Disabled,
    /// Shows the submitted record as plain values.
    ReadOnly,
}

impl FormMode {
    /// Returns `true` for [`FormMode::Editable`].
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Editable)
    }
}

/// Returns `true` when the task can no longer change: its execution ended or
/// the job was resolved.
pub fn is_frozen(job: &UserJob, execution: &Execution) -> bool {
    execution.status.is_ended() || job.status.is_resolved()
}

/// Decides the interaction mode of a task's form.
///
/// * frozen with a concrete record loaded: [`FormMode::ReadOnly`]
/// * frozen without a record (template view): [`FormMode::Disabled`]
/// * pending, but `acting_user` is not the assignee: [`FormMode::Disabled`]
/// * otherwise [`FormMode::Editable`]
///
/// # Examples
///
/// ```
/// use manual_tasks::resolver::{resolve_form_mode, FormMode};
/// use manual_tasks::{Execution, ExecutionStatus, UserJob};
///
/// let job = UserJob::pending(1, 10);
/// let execution = Execution { id: 1, status: ExecutionStatus::Started };
///
/// assert_eq!(resolve_form_mode(&job, &execution, Some(10), false), FormMode::Editable);
/// assert_eq!(resolve_form_mode(&job, &execution, Some(11), false), FormMode::Disabled);
/// ```
pub fn resolve_form_mode(
    job: &UserJob,
    execution: &Execution,
    acting_user: Option<UserId>,
    record_loaded: bool,
) -> FormMode {
    if is_frozen(job, execution) {
        return if record_loaded {
            FormMode::ReadOnly
        } else {
            FormMode::Disabled
        };
    }
    if !job.is_assignee(acting_user) {
        return FormMode::Disabled;
    }
    FormMode::Editable
}

/// Decides whether the completion action `action_key` is shown.
///
/// A resolved job shows only the action that resolved it, as a historical
/// marker. A pending job shows its actions to the assignee only.
pub fn resolve_action_visibility(job: &UserJob, action_key: &str, acting_user: Option<UserId>) -> bool {
    if job.status.is_resolved() {
        return job.result.is_resolved_by(action_key);
    }
    job.is_assignee(acting_user)
}

/// Full state of one completion action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionState {
    /// Whether the button renders at all.
    pub visible: bool,
    /// Whether the button is inert.
    pub disabled: bool,
    /// Whether this is the action that resolved the job.
    pub pinned: bool,
}

/// Resolves visibility plus the disabled and pinned flags of `action`
/// declared in form block `block`.
///
/// While the task is live, the assignee sees every action enabled and
/// everyone else sees nothing. Once it is frozen, only the pinned action
/// renders, disabled: the job must be resolved through `block` by this
/// action, and its status must be the one the action sets. A pending job
/// whose execution ended therefore shows no buttons at all.
pub fn resolve_action_state(
    job: &UserJob,
    execution: &Execution,
    block: &str,
    action: &ActionDescriptor,
    acting_user: Option<UserId>,
) -> ActionState {
    if !is_frozen(job, execution) {
        let assignee = job.is_assignee(acting_user);
        return ActionState {
            visible: assignee,
            disabled: !assignee,
            pinned: false,
        };
    }
    let pinned = job.status.is_resolved()
        && job.status == action.status
        && job.result.forms.get(block).is_some_and(|values| !values.is_null())
        && job.result.is_resolved_by(&action.key);
    ActionState {
        visible: pinned,
        disabled: true,
        pinned,
    }
}

/// What the task list's status column shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCell {
    /// The execution ended before the assignee acted.
    Unprocessed,
    /// The job's own status.
    Status(JobStatus),
}

impl StatusCell {
    /// Column label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unprocessed => "Unprocessed",
            Self::Status(status) => status.label(),
        }
    }
}

impl fmt::Display for StatusCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status column value for a job.
pub fn status_cell(job: &UserJob, execution: &Execution) -> StatusCell {
    if execution.status.is_ended() && job.status.is_pending() {
        StatusCell::Unprocessed
    } else {
        StatusCell::Status(job.status)
    }
}
