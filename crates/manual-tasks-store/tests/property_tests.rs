//! Property-based tests for the user job store using proptest.
//!
//! Properties verify the resolution invariants (one accepted resolution,
//! assignee only, frozen after an ended execution) and listing coverage
//! under arbitrary inputs. Fuzz-style tests feed arbitrary JSON to
//! `submit` and check it never panics.

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::{json, Value};

use manual_tasks::{Execution, ExecutionStatus, JobStatus, Workflow};
use manual_tasks_store::store::memory::InMemoryBackend;
use manual_tasks_store::{ListJobsOptions, NewUserJob, StoreConfig, StoreError, UserJobStore};

const ASSIGNEE: i64 = 10;

// ─── Arbitrary Strategies ───────────────────────────────────────────────────

fn arb_action() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["approve", "reject", "missing"])
}

fn arb_attempt() -> impl Strategy<Value = (Option<i64>, &'static str)> {
    (
        prop::option::weighted(0.9, prop::sample::select(vec![ASSIGNEE, 11, 12])),
        arb_action(),
    )
}

fn arb_ending_status() -> impl Strategy<Value = ExecutionStatus> {
    prop::sample::select(vec![
        ExecutionStatus::Resolved,
        ExecutionStatus::Failed,
        ExecutionStatus::Error,
        ExecutionStatus::Aborted,
        ExecutionStatus::Canceled,
        ExecutionStatus::Rejected,
    ])
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z_]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map("[a-z_]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn workflow() -> Workflow {
    serde_json::from_value(json!({
        "id": 1,
        "nodes": [{
            "id": 2,
            "type": "manual",
            "config": {
                "forms": {
                    "f": {
                        "actions": [
                            { "key": "approve", "status": 1 },
                            { "key": "reject", "status": -5 }
                        ]
                    }
                }
            }
        }]
    }))
    .unwrap()
}

async fn prop_test_store(config: StoreConfig) -> UserJobStore<InMemoryBackend> {
    let store = UserJobStore::new(InMemoryBackend::new()).with_config(config);
    store.put_workflow(&workflow()).await.unwrap();
    store
        .put_execution(&Execution {
            id: 3,
            status: ExecutionStatus::Started,
        })
        .await
        .unwrap();
    store
}

fn new_job() -> NewUserJob {
    NewUserJob {
        user_id: ASSIGNEE,
        node_id: 2,
        workflow_id: 1,
        execution_id: 3,
    }
}

fn expected_status(action: &str) -> JobStatus {
    match action {
        "reject" => JobStatus::Rejected,
        _ => JobStatus::Resolved,
    }
}

// ─── Property Tests: Resolution Invariants ──────────────────────────────────

proptest! {
    /// Whatever sequence of attempts arrives, at most one is accepted, it
    /// comes from the assignee with a bound action, and the stored job
    /// reflects exactly that attempt.
    #[test]
    fn prop_at_most_one_resolution_from_assignee(
        attempts in prop::collection::vec(arb_attempt(), 1..12)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = prop_test_store(StoreConfig::default()).await;
            let job = store.create_job(new_job()).await.unwrap();

            let mut accepted = Vec::new();
            for (index, (user, action)) in attempts.iter().enumerate() {
                let body = json!({ "result": { "f": { "n": index }, "_": action } });
                match store.submit(job.id, *user, &body).await {
                    Ok(_) => accepted.push((index, *user, *action)),
                    Err(StoreError::Forbidden { .. }) => {
                        prop_assert_ne!(*user, Some(ASSIGNEE));
                    },
                    Err(StoreError::InvalidAction { .. }) => {
                        prop_assert_eq!(*action, "missing");
                    },
                    Err(StoreError::AlreadyResolved { .. }) => {
                        prop_assert_eq!(accepted.len(), 1);
                    },
                    Err(other) => prop_assert!(false, "unexpected error {}", other),
                }
            }

            prop_assert!(accepted.len() <= 1);
            let stored = store.job(job.id).await.unwrap();
            match accepted.first() {
                Some((index, user, action)) => {
                    prop_assert_eq!(*user, Some(ASSIGNEE));
                    prop_assert_eq!(stored.status, expected_status(action));
                    prop_assert_eq!(&stored.result.forms["f"], &json!({ "n": index }));
                },
                None => prop_assert!(stored.status.is_pending()),
            }
            Ok(())
        })?;
    }

    /// Once the execution ends, no submission is accepted.
    #[test]
    fn prop_ended_execution_accepts_nothing(
        ending in arb_ending_status(),
        attempts in prop::collection::vec(arb_attempt(), 1..6)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = prop_test_store(StoreConfig::default()).await;
            let job = store.create_job(new_job()).await.unwrap();
            store.set_execution_status(3, ending).await.unwrap();

            for (user, action) in &attempts {
                let body = json!({ "result": { "f": {}, "_": action } });
                prop_assert!(store.submit(job.id, *user, &body).await.is_err());
            }
            prop_assert!(store.job(job.id).await.unwrap().status.is_pending());
            Ok(())
        })?;
    }
}

// ─── Property Tests: Listing ────────────────────────────────────────────────

proptest! {
    /// Walking every page returns each job exactly once, in any page size.
    #[test]
    fn prop_pages_cover_every_job_once(
        count in 0usize..25,
        page_size in 1u32..8,
        descending in any::<bool>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = prop_test_store(StoreConfig::default()).await;
            for _ in 0..count {
                store.create_job(new_job()).await.unwrap();
            }

            let sort = if descending { "-id" } else { "id" };
            let first = store
                .list_jobs(&ListJobsOptions {
                    page: 1,
                    page_size: Some(page_size),
                    sort: vec![sort.to_string()],
                    ..Default::default()
                })
                .await
                .unwrap();
            prop_assert_eq!(first.count, count as u64);

            let mut seen = HashSet::new();
            let mut previous: Option<i64> = None;
            for page in 1..=first.total_page {
                let listed = store
                    .list_jobs(&ListJobsOptions {
                        page,
                        page_size: Some(page_size),
                        sort: vec![sort.to_string()],
                        ..Default::default()
                    })
                    .await
                    .unwrap();
                prop_assert!(listed.jobs.len() <= page_size as usize);
                for row in &listed.jobs {
                    let id = row["id"].as_i64().unwrap();
                    if let Some(prev) = previous {
                        prop_assert_eq!(id < prev, descending);
                    }
                    previous = Some(id);
                    prop_assert!(seen.insert(id), "job {} listed twice", id);
                }
            }
            prop_assert_eq!(seen.len(), count);
            Ok(())
        })?;
    }
}

// ─── Fuzz Tests: Submission Bodies ──────────────────────────────────────────

proptest! {
    /// Arbitrary submission bodies never panic and never resolve a job
    /// without a bound action.
    #[test]
    fn fuzz_submit_body_never_panics(body in arb_json()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = prop_test_store(StoreConfig::default().with_max_result_bytes(256)).await;
            let job = store.create_job(new_job()).await.unwrap();

            if let Ok(resolved) = store.submit(job.id, Some(ASSIGNEE), &body).await {
                let action = resolved.result.resolved_by.clone().unwrap_or_default();
                prop_assert!(action == "approve" || action == "reject");
            }
            Ok(())
        })?;
    }
}
