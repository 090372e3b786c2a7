//! In-process [`ResourceClient`] backed by a [`UserJobStore`].
//!
//! [`LocalResourceClient`] answers the same `get` / `submit` / `list`
//! calls the REST service does, acting as one user. Store errors come back
//! as the [`ResourceError`] the REST client would produce for the same
//! HTTP status, so a lost resolution race is a
//! [`ResourceError::Conflict`] either way.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use manual_tasks::resource::{
    GetParams, ListMeta, ListPage, ListParams, ResourceClient, ResourceError, SubmitParams,
    USERS_JOBS,
};
use manual_tasks::UserId;

use crate::store::generic::UserJobStore;
use crate::store::{ListJobsOptions, StorageBackend};

/// Resource client that calls a [`UserJobStore`] directly.
///
/// Cheap to clone; clones share the store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use manual_tasks_store::local::LocalResourceClient;
/// use manual_tasks_store::store::generic::UserJobStore;
/// use manual_tasks_store::store::memory::InMemoryBackend;
///
/// let store = Arc::new(UserJobStore::new(InMemoryBackend::new()));
/// let client = LocalResourceClient::new(store).acting_as(10);
/// assert_eq!(client.acting_user(), Some(10));
/// ```
#[derive(Debug)]
pub struct LocalResourceClient<B: StorageBackend> {
    store: Arc<UserJobStore<B>>,
    acting_user: Option<UserId>,
}

impl<B: StorageBackend> Clone for LocalResourceClient<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            acting_user: self.acting_user,
        }
    }
}

impl<B: StorageBackend> LocalResourceClient<B> {
    /// Creates an anonymous client. Anonymous callers can read but never
    /// resolve a job.
    pub fn new(store: Arc<UserJobStore<B>>) -> Self {
        Self {
            store,
            acting_user: None,
        }
    }

    /// Acts as `user` for every following call.
    pub fn acting_as(mut self, user: UserId) -> Self {
        self.acting_user = Some(user);
        self
    }

    /// The user calls are made as.
    pub fn acting_user(&self) -> Option<UserId> {
        self.acting_user
    }

    /// The underlying store.
    pub fn store(&self) -> &UserJobStore<B> {
        &self.store
    }
}

#[async_trait]
impl<B: StorageBackend + 'static> ResourceClient for LocalResourceClient<B> {
    async fn get(&self, resource: &str, params: &GetParams) -> Result<Value, ResourceError> {
        if resource == USERS_JOBS {
            Ok(self
                .store
                .get_job(params.filter_by_tk, &params.appends, &[])
                .await?)
        } else {
            Ok(self.store.get_record(resource, params.filter_by_tk).await?)
        }
    }

    async fn submit(&self, resource: &str, params: &SubmitParams) -> Result<Value, ResourceError> {
        if resource != USERS_JOBS {
            return Err(ResourceError::from_status(
                405,
                format!("{resource}:submit is not supported"),
            ));
        }
        let job = self
            .store
            .submit(params.filter_by_tk, self.acting_user, &params.values)
            .await?;
        Ok(serde_json::to_value(job)?)
    }

    async fn list(&self, resource: &str, params: &ListParams) -> Result<ListPage, ResourceError> {
        if resource != USERS_JOBS {
            return Err(ResourceError::from_status(
                405,
                format!("{resource}:list is not supported"),
            ));
        }
        let mut options = ListJobsOptions {
            page: params.page,
            page_size: Some(params.page_size),
            sort: params.sort.clone(),
            appends: params.appends.clone(),
            except: params.except.clone(),
            ..Default::default()
        };
        if let Some(filter) = &params.filter {
            options = options.with_filter(filter);
        }

        let page = self.store.list_jobs(&options).await?;
        Ok(ListPage {
            data: page.jobs,
            meta: ListMeta {
                count: page.count,
                page: page.page,
                page_size: page.page_size,
                total_page: page.total_page,
            },
        })
    }
}
