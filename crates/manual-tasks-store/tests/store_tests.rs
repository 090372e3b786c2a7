//! Integration tests for UserJobStore.
//!
//! Tests cover the job lifecycle, the frozen-job rules, concurrent
//! resolution and backend limits. Organized into module blocks per concern.

use std::sync::Arc;

use manual_tasks::{Execution, ExecutionStatus, JobStatus, User, Workflow};
use manual_tasks_store::store::memory::InMemoryBackend;
use manual_tasks_store::{ListJobsOptions, NewUserJob, StoreError, UserJobStore};
use serde_json::{json, Value};

fn review_workflow() -> Workflow {
    serde_json::from_value(json!({
        "id": 1,
        "title": "Expense claim",
        "nodes": [{
            "id": 2,
            "type": "manual",
            "title": "Approve claim",
            "config": {
                "forms": {
                    "claim": {
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

async fn seeded_store_with(backend: InMemoryBackend) -> UserJobStore<InMemoryBackend> {
    let store = UserJobStore::new(backend);
    for (id, nickname) in [(10, "Ann"), (11, "Ben")] {
        store
            .put_user(&User {
                id,
                nickname: Some(nickname.to_string()),
            })
            .await
            .unwrap();
    }
    store.put_workflow(&review_workflow()).await.unwrap();
    store
        .put_execution(&Execution {
            id: 3,
            status: ExecutionStatus::Started,
        })
        .await
        .unwrap();
    store
}

async fn seeded_store() -> UserJobStore<InMemoryBackend> {
    seeded_store_with(InMemoryBackend::new()).await
}

fn new_job(user_id: i64) -> NewUserJob {
    NewUserJob {
        user_id,
        node_id: 2,
        workflow_id: 1,
        execution_id: 3,
    }
}

fn resolution(action: &str, amount: i64) -> Value {
    json!({ "result": { "claim": { "amount": amount }, "_": action } })
}

// ─── Lifecycle Tests ────────────────────────────────────────────────────────

mod lifecycle_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_pending_job_resolves_once() {
        let store = seeded_store().await;
        let job = store.create_job(new_job(10)).await.unwrap();

        let resolved = store
            .submit(job.id, Some(10), &resolution("reject", 5))
            .await
            .unwrap();
        assert_eq!(resolved.status, JobStatus::Rejected);
        assert!(resolved.result.is_resolved_by("reject"));

        let err = store
            .submit(job.id, Some(10), &resolution("approve", 5))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(store.job(job.id).await.unwrap().status, JobStatus::Rejected);
    }

    #[tokio::test]
    async fn test_jobs_of_one_execution_are_independent() {
        let store = seeded_store().await;
        let first = store.create_job(new_job(10)).await.unwrap();
        let second = store.create_job(new_job(11)).await.unwrap();

        store
            .submit(first.id, Some(10), &resolution("approve", 1))
            .await
            .unwrap();
        let still_pending = store.job(second.id).await.unwrap();
        assert!(still_pending.status.is_pending());

        store
            .submit(second.id, Some(11), &resolution("approve", 2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ended_execution_freezes_every_job() {
        let store = seeded_store().await;
        let first = store.create_job(new_job(10)).await.unwrap();
        let second = store.create_job(new_job(11)).await.unwrap();
        store
            .set_execution_status(3, ExecutionStatus::Canceled)
            .await
            .unwrap();

        for (job, user) in [(first, 10), (second, 11)] {
            let err = store
                .submit(job.id, Some(user), &resolution("approve", 1))
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::ExecutionEnded { .. }), "{err}");
        }
    }

    #[tokio::test]
    async fn test_todo_listing_for_assignee() {
        let store = seeded_store().await;
        for user in [10, 11, 10] {
            store.create_job(new_job(user)).await.unwrap();
        }

        let page = store
            .list_jobs(&ListJobsOptions {
                user_id: Some(10),
                appends: vec!["user".into(), "workflow".into(), "execution.status".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.count, 2);
        for row in &page.jobs {
            assert_eq!(row["user"]["nickname"], json!("Ann"));
            assert_eq!(row["workflow"]["title"], json!("Expense claim"));
            assert_eq!(row["execution"]["status"], json!(0));
        }
    }
}

// ─── Concurrency Tests ──────────────────────────────────────────────────────

mod concurrency_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_accept_exactly_one() {
        let store = Arc::new(seeded_store().await);
        let job = store.create_job(new_job(10)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let action = if i % 2 == 0 { "approve" } else { "reject" };
                store
                    .submit(job.id, Some(10), &resolution(action, i))
                    .await
                    .map(|resolved| (i, resolved))
            }));
        }

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one submission must win");
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(err.is_conflict(), "losers must see a conflict, got {err}");
        }

        let (winner, resolved) = winners[0];
        let stored = store.job(job.id).await.unwrap();
        assert_eq!(stored.status, resolved.status);
        assert_eq!(stored.result.forms["claim"], json!({ "amount": winner }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_of_distinct_jobs() {
        let store = Arc::new(seeded_store().await);
        let mut ids = Vec::new();
        for _ in 0..8 {
            ids.push(store.create_job(new_job(10)).await.unwrap().id);
        }

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.submit(id, Some(10), &resolution("approve", id)).await })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            let resolved = result.unwrap().unwrap();
            assert_eq!(resolved.status, JobStatus::Resolved);
        }

        let pending = store
            .list_jobs(&ListJobsOptions {
                status: Some(JobStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_reads_during_resolution() {
        let store = Arc::new(seeded_store().await);
        let job = store.create_job(new_job(10)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let value = store.get_job(job.id, &["node".to_string()], &[]).await;
                assert!(value.is_ok(), "reads should not fail during resolution");
            }));
        }
        {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .submit(job.id, Some(10), &resolution("approve", 1))
                    .await
                    .unwrap();
            }));
        }

        for result in futures::future::join_all(handles).await {
            let _: () = result.unwrap();
        }
    }
}

// ─── Backend Limit Tests ────────────────────────────────────────────────────

mod limit_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_backend_refuses_new_jobs() {
        // 2 users + 1 workflow + 1 node + 1 execution
        let store = seeded_store_with(InMemoryBackend::new().with_max_records(6)).await;
        store.create_job(new_job(10)).await.unwrap();

        let err = store.create_job(new_job(11)).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(ref m) if m.starts_with("capacity exceeded")));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_resolution_does_not_count_against_capacity() {
        let store = seeded_store_with(InMemoryBackend::new().with_max_records(6)).await;
        let job = store.create_job(new_job(10)).await.unwrap();
        store
            .submit(job.id, Some(10), &resolution("approve", 1))
            .await
            .unwrap();
    }
}
