//! User job store, generic implementation, and supporting types.
//!
//! # Architecture
//!
//! The store has two layers:
//!
//! 1. **[`UserJobStore<B>`](generic::UserJobStore)** holds every domain
//!    rule: assignee check, pending check, execution check, action lookup,
//!    assigned-value merge, field validation, CAS-based resolution and
//!    association loading.
//!
//! 2. **[`StorageBackend`]** is a dumb KV trait that backends implement.
//!    No domain logic.
//!
//! To serve the resource-client trait in-process, wrap the store in a
//! [`LocalResourceClient`](crate::local::LocalResourceClient).
//!
//! # Supporting Types
//!
//! - [`StoreConfig`] - Page size and payload limits.
//! - [`ListJobsOptions`] - Filter, sort and paging for job listing.
//! - [`JobPage`] - One page of listed jobs with paging metadata.

pub mod backend;
pub mod generic;
pub mod memory;

use manual_tasks::{JobStatus, UserId};
use serde_json::Value;

pub use backend::{StorageBackend, StorageError, VersionedRecord};

/// Limits applied by [`UserJobStore`](generic::UserJobStore).
///
/// | Field | Default | Purpose |
/// |-------|---------|---------|
/// | `default_page_size` | 20 | Page size when a listing names none |
/// | `max_page_size` | 100 | Upper clamp for requested page sizes |
/// | `max_result_bytes` | 1 MB | Largest accepted submitted result |
///
/// # Examples
///
/// ```
/// use manual_tasks_store::store::StoreConfig;
///
/// let config = StoreConfig::default().with_max_page_size(50);
/// assert_eq!(config.default_page_size, 20);
/// assert_eq!(config.max_page_size, 50);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Page size used when a listing names none.
    pub default_page_size: u32,

    /// Largest page size a listing may request; larger requests are
    /// clamped.
    pub max_page_size: u32,

    /// Largest serialized `result` a submission may carry, in bytes.
    pub max_result_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            max_result_bytes: 1_048_576,
        }
    }
}

impl StoreConfig {
    /// Sets the default page size.
    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    /// Sets the largest page size.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size.max(1);
        self
    }

    /// Sets the largest accepted result size.
    pub fn with_max_result_bytes(mut self, bytes: usize) -> Self {
        self.max_result_bytes = bytes;
        self
    }
}

/// Options for [`UserJobStore::list_jobs`](generic::UserJobStore::list_jobs).
#[derive(Debug, Clone, Default)]
pub struct ListJobsOptions {
    /// Only jobs assigned to this user.
    pub user_id: Option<UserId>,

    /// Only jobs in this status.
    pub status: Option<JobStatus>,

    /// 1-based page number; 0 is treated as 1.
    pub page: u32,

    /// Requested page size; `None` uses the configured default.
    pub page_size: Option<u32>,

    /// Sort keys (`createdAt`, `updatedAt`, `id`), `-` prefixed for
    /// descending. Only the first one is used. Empty means `-createdAt`.
    pub sort: Vec<String>,

    /// Associations to load on every row.
    pub appends: Vec<String>,

    /// Dotted field paths removed from every row.
    pub except: Vec<String>,
}

impl ListJobsOptions {
    /// Reads `userId` and `status` from a resource `filter` object.
    ///
    /// Conditions on other fields are ignored. A `status` code that maps to
    /// no job status filters nothing out.
    ///
    /// # Examples
    ///
    /// ```
    /// use manual_tasks::JobStatus;
    /// use manual_tasks_store::store::ListJobsOptions;
    /// use serde_json::json;
    ///
    /// let options = ListJobsOptions::default().with_filter(&json!({ "userId": 4, "status": 0 }));
    /// assert_eq!(options.user_id, Some(4));
    /// assert_eq!(options.status, Some(JobStatus::Pending));
    /// ```
    pub fn with_filter(mut self, filter: &Value) -> Self {
        self.user_id = filter.get("userId").and_then(Value::as_i64);
        self.status = filter
            .get("status")
            .and_then(Value::as_i64)
            .and_then(JobStatus::from_code);
        self
    }
}

/// One page of listed jobs.
#[derive(Debug, Clone)]
pub struct JobPage {
    /// Jobs on this page, with requested associations loaded.
    pub jobs: Vec<Value>,

    /// Total number of matching jobs.
    pub count: u64,

    /// 1-based page number.
    pub page: u32,

    /// Effective page size.
    pub page_size: u32,

    /// Number of pages.
    pub total_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_setters_keep_sizes_positive() {
        let config = StoreConfig::default()
            .with_default_page_size(0)
            .with_max_page_size(0)
            .with_max_result_bytes(64);
        assert_eq!(config.default_page_size, 1);
        assert_eq!(config.max_page_size, 1);
        assert_eq!(config.max_result_bytes, 64);
    }

    #[test]
    fn filter_ignores_unknown_conditions() {
        let options = ListJobsOptions::default().with_filter(&json!({
            "status": 99,
            "workflowId": 3
        }));
        assert_eq!(options.user_id, None);
        assert_eq!(options.status, None);
    }
}
