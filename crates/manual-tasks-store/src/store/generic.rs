//! Generic user job store with all domain logic delegating to a
//! [`StorageBackend`].
//!
//! [`UserJobStore`] owns the `users`, `workflows`, `flow_nodes`,
//! `executions` and `users_jobs` collections and implements every domain
//! operation on top of any [`StorageBackend`]: job creation, association
//! loading (`appends` / `except`), listing, and resolution.
//!
//! Backends remain dumb key-value stores; all rules live here.
//!
//! # Resolution
//!
//! [`submit`](UserJobStore::submit) is the server half of "at most one
//! accepted resolution per job". It reads the job, checks assignee, pending
//! status and execution, re-applies the action's assigned values, runs the
//! form block's validators and writes with
//! [`StorageBackend::put_if_version`]. When two submissions race, the loser
//! either sees a non-pending job ([`StoreError::AlreadyResolved`]) or loses
//! the conditional write ([`StoreError::ConcurrentModification`]). Both map
//! to a conflict on the wire.
//!
//! Executions change status outside this store's resolution path. After the
//! job write, `submit` reads the execution again; if it ended since the
//! first check, the job is reverted to pending and the submission fails
//! with [`StoreError::ExecutionEnded`]. A resolution whose recheck still
//! saw a running execution counts as accepted before the execution ended.
//!
//! # Construction
//!
//! ```
//! use manual_tasks_store::store::generic::UserJobStore;
//! use manual_tasks_store::store::memory::InMemoryBackend;
//! use manual_tasks_store::store::StoreConfig;
//!
//! let store = UserJobStore::new(InMemoryBackend::new())
//!     .with_config(StoreConfig::default().with_max_page_size(50));
//! assert_eq!(store.config().max_page_size, 50);
//! ```

use std::cmp::Ordering;
use std::sync::atomic::{self, AtomicI64};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use manual_tasks::resource::{EXECUTIONS, FLOW_NODES, USERS, USERS_JOBS, WORKFLOWS};
use manual_tasks::submit::merge_values;
use manual_tasks::validation::validate_values;
use manual_tasks::{
    Execution, ExecutionId, ExecutionStatus, FlowNode, JobId, JobResult, NodeId, User, UserId,
    UserJob, Workflow, WorkflowId,
};

use crate::error::StoreError;
use crate::store::backend::{make_key, make_prefix, StorageBackend, StorageError, VersionedRecord};
use crate::store::{JobPage, ListJobsOptions, StoreConfig};

/// Parameters for [`UserJobStore::create_job`].
#[derive(Debug, Clone)]
pub struct NewUserJob {
    /// Assignee.
    pub user_id: UserId,
    /// Manual node spawning the job.
    pub node_id: NodeId,
    /// Workflow of the node.
    pub workflow_id: WorkflowId,
    /// Owning execution.
    pub execution_id: ExecutionId,
}

/// Generic user job store that delegates all storage to a
/// [`StorageBackend`].
///
/// # Type Parameters
///
/// * `B` - A [`StorageBackend`] implementation.
#[derive(Debug)]
pub struct UserJobStore<B: StorageBackend> {
    backend: B,
    config: StoreConfig,
    next_job_id: AtomicI64,
}

impl<B: StorageBackend> UserJobStore<B> {
    /// Creates a store with [`StoreConfig::default`].
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: StoreConfig::default(),
            next_job_id: AtomicI64::new(1),
        }
    }

    /// Sets the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    // ---- Serialization helpers (private) ----

    fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(record)
            .map_err(|e| StoreError::Storage(format!("failed to serialize record: {e}")))
    }

    fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, StoreError> {
        serde_json::from_slice(data)
            .map_err(|e| StoreError::Storage(format!("failed to deserialize record: {e}")))
    }

    fn map_storage_error(err: StorageError, collection: &str, id: i64) -> StoreError {
        match err {
            StorageError::NotFound { .. } => StoreError::NotFound {
                collection: collection.to_string(),
                id,
            },
            StorageError::VersionConflict {
                expected, actual, ..
            } => StoreError::ConcurrentModification {
                job_id: id,
                expected_version: expected,
                actual_version: actual,
            },
            StorageError::CapacityExceeded { message } => {
                StoreError::Storage(format!("capacity exceeded: {message}"))
            },
            StorageError::Backend { message, .. } => StoreError::Storage(message),
        }
    }

    async fn load<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: i64,
    ) -> Result<(T, u64), StoreError> {
        let versioned = self
            .backend
            .get(&make_key(collection, id))
            .await
            .map_err(|e| Self::map_storage_error(e, collection, id))?;
        Ok((Self::decode(&versioned.data)?, versioned.version))
    }

    /// Loads an association, treating a dangling reference as absent.
    async fn load_association<T: DeserializeOwned>(
        &self,
        job_id: JobId,
        collection: &str,
        id: Option<i64>,
    ) -> Result<Option<T>, StoreError> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.load(collection, id).await {
            Ok((record, _)) => Ok(Some(record)),
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!(
                    job_id = job_id,
                    collection = collection,
                    id = id,
                    "user job references a missing record"
                );
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    async fn store<T: Serialize>(
        &self,
        collection: &str,
        id: i64,
        record: &T,
    ) -> Result<u64, StoreError> {
        let bytes = Self::encode(record)?;
        self.backend
            .put(&make_key(collection, id), &bytes)
            .await
            .map_err(|e| Self::map_storage_error(e, collection, id))
    }

    // ---- Reference records (public) ----

    /// Stores or replaces a user.
    pub async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.store(USERS, user.id, user).await.map(|_| ())
    }

    /// Stores or replaces a workflow, and each of its nodes under
    /// `flow_nodes`.
    pub async fn put_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        for node in &workflow.nodes {
            self.store(FLOW_NODES, node.id, node).await?;
        }
        self.store(WORKFLOWS, workflow.id, workflow).await?;
        tracing::debug!(
            workflow_id = workflow.id,
            nodes = workflow.nodes.len(),
            "stored workflow"
        );
        Ok(())
    }

    /// Stores or replaces an execution.
    pub async fn put_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.store(EXECUTIONS, execution.id, execution).await.map(|_| ())
    }

    /// Moves an execution to `status`. Ending an execution freezes all of
    /// its jobs.
    pub async fn set_execution_status(
        &self,
        execution_id: ExecutionId,
        status: ExecutionStatus,
    ) -> Result<Execution, StoreError> {
        let (mut execution, _) = self.load::<Execution>(EXECUTIONS, execution_id).await?;
        execution.status = status;
        self.store(EXECUTIONS, execution_id, &execution).await?;
        tracing::info!(
            execution_id = execution_id,
            ended = status.is_ended(),
            "execution status changed"
        );
        Ok(execution)
    }

    /// Returns any stored record as JSON.
    pub async fn get_record(&self, collection: &str, id: i64) -> Result<Value, StoreError> {
        self.load(collection, id).await.map(|(record, _)| record)
    }

    // ---- User jobs (public) ----

    /// Creates a pending user job.
    ///
    /// The node and the execution must exist.
    pub async fn create_job(&self, new: NewUserJob) -> Result<UserJob, StoreError> {
        self.load::<FlowNode>(FLOW_NODES, new.node_id).await?;
        self.load::<Execution>(EXECUTIONS, new.execution_id).await?;

        let id = self.next_job_id.fetch_add(1, atomic::Ordering::Relaxed);
        let now = Utc::now();
        let mut job = UserJob::pending(id, new.user_id);
        job.node_id = Some(new.node_id);
        job.workflow_id = Some(new.workflow_id);
        job.execution_id = Some(new.execution_id);
        job.created_at = Some(now);
        job.updated_at = Some(now);

        self.store(USERS_JOBS, id, &job).await?;
        tracing::debug!(job_id = id, user_id = new.user_id, "created user job");
        Ok(job)
    }

    /// Returns a user job without associations.
    pub async fn job(&self, job_id: JobId) -> Result<UserJob, StoreError> {
        self.load(USERS_JOBS, job_id).await.map(|(job, _)| job)
    }

    /// Returns a user job with the requested associations loaded and the
    /// `except` paths removed.
    ///
    /// Supported appends: `user`, `node`, `workflow`, `workflow.nodes`,
    /// `execution` (and any `execution.*` path). `job` and unknown appends
    /// are ignored.
    pub async fn get_job(
        &self,
        job_id: JobId,
        appends: &[String],
        except: &[String],
    ) -> Result<Value, StoreError> {
        let job = self.job(job_id).await?;
        self.render(job, appends, except).await
    }

    async fn render(
        &self,
        job: UserJob,
        appends: &[String],
        except: &[String],
    ) -> Result<Value, StoreError> {
        let job = self.with_associations(job, appends).await?;
        let mut value = serde_json::to_value(&job)
            .map_err(|e| StoreError::Storage(format!("failed to serialize job: {e}")))?;
        for path in except {
            remove_path(&mut value, path);
        }
        Ok(value)
    }

    async fn with_associations(
        &self,
        mut job: UserJob,
        appends: &[String],
    ) -> Result<UserJob, StoreError> {
        let mut want = Appends::default();
        for append in appends {
            let (head, rest) = match append.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (append.as_str(), None),
            };
            match head {
                "user" => want.user = true,
                "node" => want.node = true,
                "workflow" => {
                    want.workflow = true;
                    want.workflow_nodes |= rest == Some("nodes");
                },
                "execution" => want.execution = true,
                "job" => {},
                other => tracing::debug!(append = other, "ignoring unsupported append"),
            }
        }

        if want.user {
            job.user = self
                .load_association(job.id, USERS, Some(job.user_id))
                .await?;
        }
        if want.node {
            job.node = self.load_association(job.id, FLOW_NODES, job.node_id).await?;
        }
        if want.workflow {
            let workflow: Option<Workflow> = self
                .load_association(job.id, WORKFLOWS, job.workflow_id)
                .await?;
            job.workflow = workflow.map(|mut workflow| {
                if !want.workflow_nodes {
                    workflow.nodes.clear();
                }
                workflow
            });
        }
        if want.execution {
            job.execution = self
                .load_association(job.id, EXECUTIONS, job.execution_id)
                .await?;
        }
        Ok(job)
    }

    /// Lists user jobs with filtering, sorting and paging.
    pub async fn list_jobs(&self, options: &ListJobsOptions) -> Result<JobPage, StoreError> {
        let records = self
            .backend
            .list_by_prefix(&make_prefix(USERS_JOBS))
            .await
            .map_err(|e| Self::map_storage_error(e, USERS_JOBS, 0))?;

        let mut jobs = records
            .iter()
            .map(|(_, record)| Self::decode::<UserJob>(&record.data))
            .collect::<Result<Vec<_>, _>>()?;
        jobs.retain(|job| {
            options.user_id.map_or(true, |user| job.user_id == user)
                && options.status.map_or(true, |status| job.status == status)
        });
        sort_jobs(
            &mut jobs,
            options.sort.first().map_or("-createdAt", String::as_str),
        );

        let page_size = options
            .page_size
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size);
        let page = options.page.max(1);
        let count = jobs.len() as u64;
        let total_page = u32::try_from(count.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX);
        let skip = (page as usize - 1).saturating_mul(page_size as usize);

        let mut rows = Vec::new();
        for job in jobs.into_iter().skip(skip).take(page_size as usize) {
            rows.push(self.render(job, &options.appends, &options.except).await?);
        }

        Ok(JobPage {
            jobs: rows,
            count,
            page,
            page_size,
            total_page,
        })
    }

    /// Resolves a pending user job on behalf of `acting_user`.
    ///
    /// `values` is the submission body: `{ "result": { <formKey>: {...},
    /// "_": <actionKey> } }`. The resolving action must be bound to the
    /// submitted form block on the job's node. Its assigned values are
    /// applied again here, so a client cannot override them.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the job, its node or execution is gone.
    /// - [`StoreError::Forbidden`] if `acting_user` is not the assignee.
    /// - [`StoreError::AlreadyResolved`] if the job is no longer pending.
    /// - [`StoreError::ExecutionEnded`] if the execution has ended, or ended
    ///   while the job was being written.
    /// - [`StoreError::InvalidPayload`] / [`StoreError::InvalidAction`] for
    ///   unusable submissions.
    /// - [`StoreError::ConcurrentModification`] if another write won.
    pub async fn submit(
        &self,
        job_id: JobId,
        acting_user: Option<UserId>,
        values: &Value,
    ) -> Result<UserJob, StoreError> {
        let key = make_key(USERS_JOBS, job_id);
        let versioned = self
            .backend
            .get(&key)
            .await
            .map_err(|e| Self::map_storage_error(e, USERS_JOBS, job_id))?;
        let mut job: UserJob = Self::decode(&versioned.data)?;

        if !job.is_assignee(acting_user) {
            tracing::warn!(
                job_id = job_id,
                assignee = job.user_id,
                acting_user = ?acting_user,
                "rejected submission from non-assignee"
            );
            return Err(StoreError::Forbidden {
                job_id,
                user_id: acting_user,
            });
        }
        if !job.status.is_pending() {
            return Err(StoreError::AlreadyResolved {
                job_id,
                status: job.status,
            });
        }
        let mut seen_execution = None;
        if let Some(execution_id) = job.execution_id {
            let (execution, version) = self.load::<Execution>(EXECUTIONS, execution_id).await?;
            if execution.status.is_ended() {
                return Err(StoreError::ExecutionEnded {
                    job_id,
                    execution_id,
                });
            }
            seen_execution = Some((execution_id, version));
        }

        let mut result = self.parse_result(job_id, values)?;
        let action_key = result
            .resolved_by
            .clone()
            .ok_or(StoreError::InvalidAction {
                job_id,
                action: None,
            })?;
        let invalid_action = || StoreError::InvalidAction {
            job_id,
            action: Some(action_key.clone()),
        };

        let node_id = job.node_id.ok_or_else(invalid_action)?;
        let (node, _) = self.load::<FlowNode>(FLOW_NODES, node_id).await?;
        let config = node.manual_config().map_err(|e| {
            StoreError::Storage(format!("node {node_id} has an unreadable config: {e}"))
        })?;
        let (form_key, block, action) = result
            .forms
            .keys()
            .find_map(|form_key| {
                let block = config.forms.get(form_key)?;
                let action = block.action(&action_key)?;
                Some((form_key.clone(), block, action))
            })
            .ok_or_else(invalid_action)?;
        if action.status.is_pending() {
            return Err(invalid_action());
        }

        let submitted = match result.forms.get(&form_key) {
            Some(Value::Object(values)) => values.clone(),
            _ => {
                return Err(StoreError::InvalidPayload {
                    job_id,
                    reason: format!("values of form '{form_key}' must be an object"),
                })
            },
        };
        let merged = merge_values(&submitted, action);
        validate_values(&block.fields, &merged).map_err(|errors| StoreError::InvalidPayload {
            job_id,
            reason: errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        })?;
        result.forms.insert(form_key, Value::Object(merged));

        job.status = action.status;
        job.result = result;
        job.updated_at = Some(Utc::now());

        let bytes = Self::encode(&job)?;
        let written = self
            .backend
            .put_if_version(&key, &bytes, versioned.version)
            .await
            .map_err(|e| {
                let err = Self::map_storage_error(e, USERS_JOBS, job_id);
                if matches!(err, StoreError::ConcurrentModification { .. }) {
                    tracing::warn!(job_id = job_id, "lost resolution race");
                }
                err
            })?;
        if let Some((execution_id, seen_version)) = seen_execution {
            self.revert_if_execution_ended(&key, &versioned, written, job_id, execution_id, seen_version)
                .await?;
        }

        tracing::info!(
            job_id = job_id,
            action = %action_key,
            status = %job.status,
            "user job resolved"
        );
        Ok(job)
    }

    /// Checks the execution again after the job write. If it ended in
    /// between, the job is put back to its pending record.
    async fn revert_if_execution_ended(
        &self,
        key: &str,
        pending: &VersionedRecord,
        written_version: u64,
        job_id: JobId,
        execution_id: ExecutionId,
        seen_version: u64,
    ) -> Result<(), StoreError> {
        let (execution, version) = self.load::<Execution>(EXECUTIONS, execution_id).await?;
        if version == seen_version || !execution.status.is_ended() {
            return Ok(());
        }
        tracing::warn!(
            job_id = job_id,
            execution_id = execution_id,
            "execution ended during resolution, reverting job"
        );
        self.backend
            .put_if_version(key, &pending.data, written_version)
            .await
            .map_err(|e| Self::map_storage_error(e, USERS_JOBS, job_id))?;
        Err(StoreError::ExecutionEnded {
            job_id,
            execution_id,
        })
    }

    fn parse_result(&self, job_id: JobId, values: &Value) -> Result<JobResult, StoreError> {
        let raw = values
            .get("result")
            .filter(|result| result.is_object())
            .ok_or_else(|| StoreError::InvalidPayload {
                job_id,
                reason: "expected an object under 'result'".to_string(),
            })?;

        let size = Self::encode(raw)?.len();
        if size > self.config.max_result_bytes {
            return Err(StoreError::InvalidPayload {
                job_id,
                reason: format!(
                    "result is {size} bytes, limit is {}",
                    self.config.max_result_bytes
                ),
            });
        }

        serde_json::from_value(raw.clone()).map_err(|e| StoreError::InvalidPayload {
            job_id,
            reason: e.to_string(),
        })
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[derive(Default)]
struct Appends {
    user: bool,
    node: bool,
    workflow: bool,
    workflow_nodes: bool,
    execution: bool,
}

fn sort_jobs(jobs: &mut [UserJob], sort: &str) {
    let (field, descending) = match sort.strip_prefix('-') {
        Some(field) => (field, true),
        None => (sort, false),
    };
    jobs.sort_by(|a, b| {
        let ordering = match field {
            "createdAt" => a.created_at.cmp(&b.created_at),
            "updatedAt" => a.updated_at.cmp(&b.updated_at),
            _ => Ordering::Equal,
        }
        .then(a.id.cmp(&b.id));
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

/// Removes the field at a dotted path, e.g. `node.config`.
fn remove_path(value: &mut Value, path: &str) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut target = value;
    for segment in segments {
        match target.get_mut(segment) {
            Some(next) => target = next,
            None => return,
        }
    }
    if let Some(object) = target.as_object_mut() {
        object.remove(last);
    }
}
