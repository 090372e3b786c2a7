//! The todo list: query parameters and row presentation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::resolver::{status_cell, StatusCell};
use crate::resource::{ClientConfig, ListMeta, ListParams, ResourceClient, USERS_JOBS};
use crate::types::{Execution, FlowNode, JobId, JobStatus, UserId, UserJob, Workflow};

/// Associations every todo row loads.
pub const TODO_APPENDS: [&str; 4] = ["user", "node", "workflow", "execution.status"];

/// Fields left out of todo rows.
pub const TODO_EXCEPT: [&str; 3] = ["node.config", "workflow.config", "workflow.options"];

/// Default todo page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Query for one page of the todo list.
///
/// Callers choose paging, sort and filter; the association list is fixed.
///
/// # Examples
///
/// ```
/// use manual_tasks::todo::TodoQuery;
///
/// let params = TodoQuery::default().assigned_to(7).page(2).list_params();
/// assert_eq!(params.page_size, 20);
/// assert_eq!(params.sort, vec!["-createdAt"]);
/// assert_eq!(params.appends, vec!["user", "node", "workflow", "execution.status"]);
/// assert_eq!(params.filter.unwrap()["userId"], 7);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TodoQuery {
    page: u32,
    page_size: u32,
    sort: Vec<String>,
    filter: Map<String, Value>,
}

impl Default for TodoQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: vec!["-createdAt".to_string()],
            filter: Map::new(),
        }
    }
}

impl TodoQuery {
    /// Default query using the configured page size.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::default().page_size(config.page_size)
    }

    /// Selects the page, starting at 1.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Replaces the sort fields.
    pub fn sort<I, S>(mut self, sort: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = sort.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one filter condition; later conditions on the same field win.
    pub fn filter(mut self, field: impl Into<String>, condition: Value) -> Self {
        self.filter.insert(field.into(), condition);
        self
    }

    /// Only jobs assigned to `user`.
    pub fn assigned_to(self, user: UserId) -> Self {
        self.filter("userId", Value::from(user))
    }

    /// Only jobs in `status`.
    pub fn with_status(self, status: JobStatus) -> Self {
        self.filter("status", Value::from(status.code()))
    }

    /// List parameters: the caller's paging, sort and filter, then the
    /// fixed appends and excepts.
    pub fn list_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            page_size: self.page_size,
            sort: self.sort.clone(),
            filter: (!self.filter.is_empty()).then(|| Value::Object(self.filter.clone())),
            appends: TODO_APPENDS.iter().map(|s| s.to_string()).collect(),
            except: TODO_EXCEPT.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Fetches the page and turns every job into a row.
    pub async fn fetch(&self, client: &dyn ResourceClient) -> Result<TodoPage> {
        let page = client.list(USERS_JOBS, &self.list_params()).await?;
        let jobs: Vec<UserJob> = page.records()?;
        tracing::debug!(page = self.page, rows = jobs.len(), total = page.meta.count, "fetched todo page");
        Ok(TodoPage {
            rows: jobs.iter().map(TodoRow::from_job).collect(),
            meta: page.meta,
        })
    }
}

/// One page of todo rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoPage {
    /// Rows on this page.
    pub rows: Vec<TodoRow>,
    /// Paging metadata.
    pub meta: ListMeta,
}

/// One row of the todo list.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoRow {
    /// Job id; opening the row loads this job.
    pub id: JobId,
    /// Node column.
    pub node: String,
    /// Workflow column.
    pub workflow: String,
    /// Assignee column.
    pub user: String,
    /// Status column.
    pub status: StatusCell,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl TodoRow {
    /// Builds the row for a job fetched with [`TODO_APPENDS`].
    pub fn from_job(job: &UserJob) -> Self {
        let node = match (&job.node, job.node_id) {
            (Some(node), _) => node.label(),
            (None, Some(id)) => format!("#{id}"),
            (None, None) => String::new(),
        };
        let workflow = job
            .workflow
            .as_ref()
            .and_then(|w| w.title.clone())
            .unwrap_or_default();
        let user = job
            .user
            .as_ref()
            .map(|u| u.label())
            .unwrap_or_else(|| job.user_id.to_string());
        let execution = job.execution.clone().unwrap_or(Execution {
            id: job.execution_id.unwrap_or_default(),
            status: Default::default(),
        });
        Self {
            id: job.id,
            node,
            workflow,
            user,
            status: status_cell(job, &execution),
            created_at: job.created_at,
        }
    }
}

/// `"<workflow title> - <node title or #id>"`.
pub fn task_title(workflow: Option<&Workflow>, node: &FlowNode) -> String {
    let workflow = workflow.and_then(|w| w.title.as_deref()).unwrap_or_default();
    format!("{workflow} - {}", node.label())
}

/// Drawer title for a job fetched with its workflow and node.
pub fn drawer_title(job: &UserJob) -> String {
    match &job.node {
        Some(node) => task_title(job.workflow.as_ref(), node),
        None => {
            let workflow = job
                .workflow
                .as_ref()
                .and_then(|w| w.title.as_deref())
                .unwrap_or_default();
            let node = job.node_id.map(|id| format!("#{id}")).unwrap_or_default();
            format!("{workflow} - {node}")
        },
    }
}

/// Footer of a resolved task: resolution time and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterStatus {
    /// `YYYY-MM-DD HH:mm:ss`, UTC; empty if the job has no update time.
    pub time: String,
    /// Job status.
    pub status: JobStatus,
}

impl fmt::Display for FooterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.time.is_empty() {
            f.write_str(self.status.label())
        } else {
            write!(f, "{} {}", self.time, self.status.label())
        }
    }
}

/// Footer for `job`; `None` while it is pending.
pub fn footer_status(job: &UserJob) -> Option<FooterStatus> {
    if job.status.is_pending() {
        return None;
    }
    Some(FooterStatus {
        time: job
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        status: job.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // ---- query tests ----

    #[test]
    fn default_query_params() {
        let params = TodoQuery::default().list_params();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 20);
        assert_eq!(params.sort, vec!["-createdAt".to_string()]);
        assert_eq!(params.except, vec!["node.config", "workflow.config", "workflow.options"]);
        assert!(params.filter.is_none());
    }

    #[test]
    fn caller_params_apply_before_fixed_appends() {
        let params = TodoQuery::default()
            .page_size(50)
            .sort(["id"])
            .with_status(JobStatus::Pending)
            .list_params();
        assert_eq!(params.page_size, 50);
        assert_eq!(params.sort, vec!["id".to_string()]);
        assert_eq!(params.filter, Some(json!({ "status": 0 })));
        assert_eq!(params.appends.len(), 4);
    }

    #[test]
    fn page_zero_becomes_first_page() {
        assert_eq!(TodoQuery::default().page(0).list_params().page, 1);
    }

    // ---- row tests ----

    #[test]
    fn row_labels() {
        let job: UserJob = serde_json::from_value(json!({
            "id": 5,
            "userId": 10,
            "nodeId": 3,
            "status": 0,
            "user": { "id": 10 },
            "node": { "id": 3 },
            "workflow": { "id": 1, "title": "Leave" },
            "execution": { "id": 2, "status": -3 }
        }))
        .unwrap();
        let row = TodoRow::from_job(&job);
        assert_eq!(row.node, "#3");
        assert_eq!(row.workflow, "Leave");
        assert_eq!(row.user, "10");
        assert_eq!(row.status, StatusCell::Unprocessed);
        assert_eq!(drawer_title(&job), "Leave - #3");
    }

    #[test]
    fn footer_only_for_resolved_jobs() {
        let mut job = UserJob::pending(1, 10);
        assert!(footer_status(&job).is_none());

        job.status = JobStatus::Rejected;
        job.updated_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap());
        let footer = footer_status(&job).unwrap();
        assert_eq!(footer.time, "2024-03-01 09:05:07");
        assert_eq!(footer.to_string(), "2024-03-01 09:05:07 Rejected");
    }
}
