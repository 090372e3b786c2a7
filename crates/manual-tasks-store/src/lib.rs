//! Server-side store for manual workflow tasks.
//!
//! This crate keeps user jobs and the records they reference (users,
//! workflows, nodes, executions) and enforces the rule the client can only
//! approximate: a job accepts at most one resolution, from its assignee,
//! while its execution is still running.
//!
//! # Module Organization
//!
//! - [`store`] - [`StorageBackend`](store::StorageBackend) KV trait with
//!   compare-and-swap, the in-memory backend, and
//!   [`UserJobStore`](store::generic::UserJobStore) holding the rules
//! - [`local`] - [`LocalResourceClient`](local::LocalResourceClient), the
//!   resource-client trait served in-process
//! - [`error`] - [`StoreError`] with HTTP status mapping
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use manual_tasks::{Execution, ExecutionStatus, FlowNode, JobStatus, Workflow};
//! use manual_tasks_store::store::generic::{NewUserJob, UserJobStore};
//! use manual_tasks_store::store::memory::InMemoryBackend;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(UserJobStore::new(InMemoryBackend::new()));
//! let node: FlowNode = serde_json::from_value(json!({
//!     "id": 2,
//!     "type": "manual",
//!     "config": { "forms": { "f1": { "actions": [{ "key": "approve", "status": 1 }] } } }
//! }))
//! .unwrap();
//! store.put_workflow(&Workflow { id: 1, title: None, nodes: vec![node] }).await.unwrap();
//! store.put_execution(&Execution { id: 3, status: ExecutionStatus::Started }).await.unwrap();
//!
//! let job = store
//!     .create_job(NewUserJob { user_id: 10, node_id: 2, workflow_id: 1, execution_id: 3 })
//!     .await
//!     .unwrap();
//! let body = json!({ "result": { "f1": {}, "_": "approve" } });
//! let resolved = store.submit(job.id, Some(10), &body).await.unwrap();
//! assert_eq!(resolved.status, JobStatus::Resolved);
//! assert!(store.submit(job.id, Some(10), &body).await.is_err());
//! # }
//! ```

pub mod error;
pub mod local;
pub mod store;

pub use error::StoreError;
pub use local::LocalResourceClient;
pub use store::generic::{NewUserJob, UserJobStore};
pub use store::memory::InMemoryBackend;
pub use store::{JobPage, ListJobsOptions, StoreConfig};
