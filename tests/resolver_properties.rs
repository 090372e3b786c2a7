//! Property tests for form mode, action visibility and the resolution
//! payload.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use manual_tasks::resolver::{resolve_action_state, resolve_action_visibility, resolve_form_mode, FormMode};
use manual_tasks::submit::build_resolution;
use manual_tasks::{ActionDescriptor, Execution, ExecutionStatus, JobResult, JobStatus, UserJob};

// ─── Arbitrary Strategies ───────────────────────────────────────────────────

fn arb_job_status() -> impl Strategy<Value = JobStatus> {
    prop::sample::select(JobStatus::ALL.to_vec())
}

fn arb_resolved_status() -> impl Strategy<Value = JobStatus> {
    prop::sample::select(JobStatus::ALL[1..].to_vec())
}

fn arb_execution_status() -> impl Strategy<Value = ExecutionStatus> {
    prop::sample::select(vec![
        ExecutionStatus::Queueing,
        ExecutionStatus::Started,
        ExecutionStatus::Resolved,
        ExecutionStatus::Failed,
        ExecutionStatus::Error,
        ExecutionStatus::Aborted,
        ExecutionStatus::Canceled,
        ExecutionStatus::Rejected,
    ])
}

fn arb_action_key() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn arb_values() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-e]", any::<i32>(), 0..5)
        .prop_map(|m| m.into_iter().map(|(k, v)| (k, json!(v))).collect())
}

fn job(status: JobStatus, assignee: i64, resolved_by: Option<String>) -> UserJob {
    let mut job = UserJob::pending(1, assignee);
    job.status = status;
    if let Some(key) = resolved_by {
        job.result = JobResult::resolution("form", Map::new(), &key);
    }
    job
}

fn execution(status: ExecutionStatus) -> Execution {
    Execution { id: 1, status }
}

// ─── Form Mode ──────────────────────────────────────────────────────────────

proptest! {
    /// A task is never editable once its execution ended or it was resolved.
    #[test]
    fn frozen_tasks_are_never_editable(
        status in arb_job_status(),
        exec in arb_execution_status(),
        assignee in 1i64..5,
        acting in proptest::option::of(1i64..5),
        record_loaded in any::<bool>(),
    ) {
        prop_assume!(status.is_resolved() || exec.is_ended());
        let mode = resolve_form_mode(&job(status, assignee, None), &execution(exec), acting, record_loaded);
        prop_assert_ne!(mode, FormMode::Editable);
        let expected = if record_loaded { FormMode::ReadOnly } else { FormMode::Disabled };
        prop_assert_eq!(mode, expected);
    }

    /// Pending tasks are disabled for everyone but the assignee.
    #[test]
    fn pending_tasks_are_disabled_for_non_assignees(
        exec in prop::sample::select(vec![ExecutionStatus::Queueing, ExecutionStatus::Started]),
        assignee in 1i64..5,
        acting in proptest::option::of(1i64..5),
        record_loaded in any::<bool>(),
    ) {
        prop_assume!(acting != Some(assignee));
        let mode = resolve_form_mode(&job(JobStatus::Pending, assignee, None), &execution(exec), acting, record_loaded);
        prop_assert_eq!(mode, FormMode::Disabled);
    }

    /// The assignee edits a pending task of a running execution.
    #[test]
    fn assignee_edits_running_pending_tasks(
        exec in prop::sample::select(vec![ExecutionStatus::Queueing, ExecutionStatus::Started]),
        assignee in 1i64..5,
        record_loaded in any::<bool>(),
    ) {
        let mode = resolve_form_mode(&job(JobStatus::Pending, assignee, None), &execution(exec), Some(assignee), record_loaded);
        prop_assert_eq!(mode, FormMode::Editable);
    }
}

// ─── Action Visibility ──────────────────────────────────────────────────────

proptest! {
    /// A resolved task shows exactly the action recorded under `_`.
    #[test]
    fn resolved_tasks_show_exactly_the_resolving_action(
        status in arb_resolved_status(),
        resolved_by in arb_action_key(),
        keys in prop::collection::vec(arb_action_key(), 1..6),
        acting in proptest::option::of(1i64..5),
    ) {
        let task = job(status, 1, Some(resolved_by.clone()));
        let mut keys = keys;
        keys.push(resolved_by.clone());
        keys.sort();
        keys.dedup();

        let visible: Vec<&String> = keys
            .iter()
            .filter(|k| resolve_action_visibility(&task, k, acting))
            .collect();
        prop_assert_eq!(visible, vec![&resolved_by]);
    }

    /// Every button of a frozen task is disabled.
    #[test]
    fn frozen_task_buttons_are_disabled(
        status in arb_job_status(),
        exec in arb_execution_status(),
        key in arb_action_key(),
        acting in proptest::option::of(1i64..5),
    ) {
        prop_assume!(status.is_resolved() || exec.is_ended());
        let action = ActionDescriptor::new(key.clone());
        let state = resolve_action_state(&job(status, 1, Some(key)), &execution(exec), "form", &action, acting);
        prop_assert!(state.disabled);
        prop_assert_eq!(state.visible, state.pinned);
    }

    /// A frozen task pins at most one action across all of its blocks:
    /// the one recorded under `_`, in the block that carries the result.
    #[test]
    fn frozen_task_pins_one_action_in_one_block(
        status in arb_job_status(),
        exec in arb_execution_status(),
        resolved_by in arb_action_key(),
        keys in prop::collection::vec(arb_action_key(), 1..6),
        acting in proptest::option::of(1i64..5),
    ) {
        prop_assume!(status.is_resolved() || exec.is_ended());
        let task = job(status, 1, Some(resolved_by.clone()));
        let mut keys = keys;
        keys.push(resolved_by);
        keys.sort();
        keys.dedup();

        let mut pinned = 0;
        for block in ["form", "other"] {
            for key in &keys {
                let mut action = ActionDescriptor::new(key.clone());
                action.status = status;
                let state = resolve_action_state(&task, &execution(exec), block, &action, acting);
                if state.pinned {
                    prop_assert_eq!(block, "form");
                    pinned += 1;
                }
            }
        }
        prop_assert_eq!(pinned, usize::from(status.is_resolved()));
    }
}

// ─── Resolution Payload ─────────────────────────────────────────────────────

proptest! {
    /// Assigned values win on collisions; other form values pass through.
    #[test]
    fn assigned_values_override_form_values(
        form in arb_values(),
        assigned in arb_values(),
        key in arb_action_key(),
    ) {
        let mut action = ActionDescriptor::new(key.clone());
        action.assigned_values.values = assigned.clone();

        let payload = build_resolution("form", &form, &action);
        let stored = payload["result"]["form"].as_object().cloned().unwrap_or_default();

        for (name, value) in &assigned {
            prop_assert_eq!(&stored[name], value);
        }
        for (name, value) in &form {
            if !assigned.contains_key(name) {
                prop_assert_eq!(&stored[name], value);
            }
        }
        prop_assert_eq!(stored.len(), form.keys().chain(assigned.keys()).collect::<std::collections::HashSet<_>>().len());
        prop_assert_eq!(&payload["result"]["_"], &json!(key));
    }
}

#[test]
fn merge_order_example() {
    let action = ActionDescriptor::new("approve").with_assigned_value("b", json!(9));
    let form = json!({ "a": 1, "b": 2 }).as_object().cloned().unwrap();
    assert_eq!(
        build_resolution("form", &form, &action)["result"]["form"],
        json!({ "a": 1, "b": 9 })
    );
}

#[test]
fn template_and_record_views_of_a_rejected_task() {
    let task = job(JobStatus::Rejected, 2, Some("reject".into()));
    let exec = execution(ExecutionStatus::Rejected);
    assert_eq!(resolve_form_mode(&task, &exec, Some(2), false), FormMode::Disabled);
    assert_eq!(resolve_form_mode(&task, &exec, Some(2), true), FormMode::ReadOnly);
}
