//! Writing a task's resolution.
//!
//! [`Submitter::submit_task_resolution`] sends the merged form values and
//! the resolving action key for one job, once. Two layers keep a job from
//! being resolved twice:
//!
//! * client side, a stale snapshot (execution ended or job already
//!   resolved) is a silent no-op, and a per-job in-flight flag turns a
//!   second click into [`SkipReason::InFlight`]. This only saves a round
//!   trip; it cannot see other clients.
//! * server side, the store accepts the first resolution with a
//!   compare-and-swap on the job record and answers every later one with
//!   409. That answer comes back here as [`SubmitOutcome::Superseded`].

use std::collections::HashSet;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use crate::error::{ManualTaskError, Result};
use crate::resolver::is_frozen;
use crate::resource::{ResourceClient, SubmitParams, USERS_JOBS};
use crate::types::{ActionDescriptor, Execution, JobId, UserJob, RESOLVED_BY_KEY};
use crate::validation::{validate_values, FieldRule};

/// Callbacks into the surface that shows the task.
pub trait ViewHandle: Send + Sync {
    /// Records that the form was submitted.
    fn mark_submitted(&self);

    /// Closes the task drawer or dialog.
    fn close(&self);

    /// Reloads the task list.
    fn refresh(&self);
}

/// Why a submission was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The execution ended or the job was resolved already.
    AlreadyResolved,
    /// A submission for the same job is still running on this client.
    InFlight,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service accepted the resolution.
    Submitted,
    /// Nothing was sent.
    Skipped(SkipReason),
    /// The service reported that another submission resolved the job first.
    Superseded,
}

/// One form block's submission.
#[derive(Debug, Clone)]
pub struct Submission<'a> {
    /// Key of the form block the values belong to.
    pub form_key: &'a str,
    /// Values entered in the form.
    pub values: Map<String, Value>,
    /// The completion action that was triggered.
    pub action: &'a ActionDescriptor,
    /// Field validators of the form block.
    pub rules: &'a [FieldRule],
}

impl<'a> Submission<'a> {
    /// Creates a submission without field validators.
    pub fn new(form_key: &'a str, values: Map<String, Value>, action: &'a ActionDescriptor) -> Self {
        Self {
            form_key,
            values,
            action,
            rules: &[],
        }
    }

    /// Sets the field validators to run before sending.
    pub fn with_rules(mut self, rules: &'a [FieldRule]) -> Self {
        self.rules = rules;
        self
    }
}

/// Merges the form values with the action's assigned values.
///
/// Assigned values are applied last and win on collisions.
pub fn merge_values(form_values: &Map<String, Value>, action: &ActionDescriptor) -> Map<String, Value> {
    let mut merged = form_values.clone();
    for (name, value) in &action.assigned_values.values {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Builds the update written to a user job when `action` resolves it.
///
/// # Examples
///
/// ```
/// use manual_tasks::submit::build_resolution;
/// use manual_tasks::ActionDescriptor;
/// use serde_json::json;
///
/// let action = ActionDescriptor::new("approve").with_assigned_value("b", json!(9));
/// let values = json!({ "a": 1, "b": 2 }).as_object().cloned().unwrap();
///
/// assert_eq!(
///     build_resolution("form", &values, &action),
///     json!({ "result": { "form": { "a": 1, "b": 9 }, "_": "approve" } })
/// );
/// ```
pub fn build_resolution(form_key: &str, form_values: &Map<String, Value>, action: &ActionDescriptor) -> Value {
    let mut result = Map::new();
    result.insert(form_key.to_string(), Value::Object(merge_values(form_values, action)));
    result.insert(RESOLVED_BY_KEY.to_string(), Value::String(action.key.clone()));
    json!({ "result": result })
}

/// Jobs with a submission currently running.
#[derive(Debug, Default)]
pub struct InFlight {
    jobs: Mutex<HashSet<JobId>>,
}

impl InFlight {
    /// Marks `job_id` as submitting, or returns `None` if it already is.
    pub fn try_acquire(&self, job_id: JobId) -> Option<InFlightGuard<'_>> {
        if !self.jobs.lock().insert(job_id) {
            return None;
        }
        Some(InFlightGuard { owner: self, job_id })
    }

    /// Returns `true` while a submission for `job_id` is running.
    pub fn contains(&self, job_id: JobId) -> bool {
        self.jobs.lock().contains(&job_id)
    }
}

/// Clears the in-flight mark when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    job_id: JobId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.jobs.lock().remove(&self.job_id);
    }
}

/// Sends task resolutions through a resource client.
#[derive(Debug)]
pub struct Submitter<C> {
    client: C,
    in_flight: InFlight,
}

impl<C: ResourceClient> Submitter<C> {
    /// Creates a submitter over `client`.
    pub fn new(client: C) -> Self {
        Self {
            client,
            in_flight: InFlight::default(),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns `true` while a submission for `job_id` is running; the view
    /// shows the triggering button as loading.
    pub fn is_loading(&self, job_id: JobId) -> bool {
        self.in_flight.contains(job_id)
    }

    /// Resolves `job` with `submission`.
    ///
    /// 1. A frozen snapshot (execution ended or job resolved) returns
    ///    [`SkipReason::AlreadyResolved`] without any call.
    /// 2. Field validators run; failures return
    ///    [`ManualTaskError::Validation`] without any call.
    /// 3. A submission already running for this job returns
    ///    [`SkipReason::InFlight`].
    /// 4. The resolution is sent to `users_jobs:submit`.
    /// 5. On success the view is marked submitted, closed and refreshed.
    ///
    /// A 409 answer means another submission won; the list is refreshed and
    /// [`SubmitOutcome::Superseded`] returned. Other failures propagate.
    pub async fn submit_task_resolution(
        &self,
        job: &UserJob,
        execution: &Execution,
        submission: Submission<'_>,
        view: &dyn ViewHandle,
    ) -> Result<SubmitOutcome> {
        let action_key = submission.action.key.as_str();

        if is_frozen(job, execution) {
            tracing::debug!(job_id = job.id, action = action_key, "job already resolved, skipping submission");
            return Ok(SubmitOutcome::Skipped(SkipReason::AlreadyResolved));
        }

        if let Err(errors) = validate_values(submission.rules, &submission.values) {
            tracing::debug!(job_id = job.id, failed = errors.len(), "form validation failed");
            return Err(ManualTaskError::Validation { errors });
        }

        let Some(_guard) = self.in_flight.try_acquire(job.id) else {
            tracing::debug!(job_id = job.id, action = action_key, "submission already in flight");
            return Ok(SubmitOutcome::Skipped(SkipReason::InFlight));
        };

        let params = SubmitParams {
            filter_by_tk: job.id,
            values: build_resolution(submission.form_key, &submission.values, submission.action),
        };

        match self.client.submit(USERS_JOBS, &params).await {
            Ok(_) => {
                tracing::info!(job_id = job.id, action = action_key, "task resolution submitted");
                view.mark_submitted();
                view.close();
                view.refresh();
                Ok(SubmitOutcome::Submitted)
            },
            Err(e) if e.is_conflict() => {
                tracing::warn!(job_id = job.id, action = action_key, error = %e, "task was resolved by another submission");
                view.refresh();
                Ok(SubmitOutcome::Superseded)
            },
            Err(e) => {
                tracing::warn!(job_id = job.id, action = action_key, error = %e, "task submission failed");
                Err(e.into())
            },
        }
    }
}
