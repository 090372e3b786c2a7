//! Resource client abstraction.
//!
//! The flow talks to the platform's resource service through three calls on
//! named resources: `get` a record with appended associations, `submit` a
//! partial update, and `list` a page of records. [`ResourceClient`] is the
//! seam; [`HttpResourceClient`] speaks the REST dialect over reqwest (feature
//! `http-client`), and the store crate serves the same trait in-process.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod config;
mod error;
#[cfg(all(feature = "http-client", not(target_arch = "wasm32")))]
mod http;

pub use config::{ClientConfig, ENV_AUTH_TOKEN, ENV_BASE_URL, ENV_PAGE_SIZE, ENV_TIMEOUT_MS};
pub use error::ResourceError;
#[cfg(all(feature = "http-client", not(target_arch = "wasm32")))]
pub use http::HttpResourceClient;

/// The user jobs collection.
pub const USERS_JOBS: &str = "users_jobs";
/// The workflow executions collection.
pub const EXECUTIONS: &str = "executions";
/// The workflows collection.
pub const WORKFLOWS: &str = "workflows";
/// The workflow nodes collection.
pub const FLOW_NODES: &str = "flow_nodes";
/// The users collection.
pub const USERS: &str = "users";

/// Parameters of a `get` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParams {
    /// Primary key of the record.
    pub filter_by_tk: i64,

    /// Association paths to load with the record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appends: Vec<String>,
}

impl GetParams {
    /// Fetches record `id` without associations.
    pub fn by_id(id: i64) -> Self {
        Self {
            filter_by_tk: id,
            appends: Vec::new(),
        }
    }

    /// Adds association paths to load.
    pub fn with_appends<I, S>(mut self, appends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.appends.extend(appends.into_iter().map(Into::into));
        self
    }
}

/// Parameters of a `submit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitParams {
    /// Primary key of the record being updated.
    pub filter_by_tk: i64,

    /// Partial update.
    pub values: Value,
}

/// Parameters of a `list` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// One-based page number.
    pub page: u32,

    /// Records per page.
    pub page_size: u32,

    /// Sort fields; a leading `-` sorts descending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,

    /// Association paths to load with each record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appends: Vec<String>,

    /// Field paths to leave out of each record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,

    /// Filter object in the service's filter dialect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort: Vec::new(),
            appends: Vec::new(),
            except: Vec::new(),
            filter: None,
        }
    }
}

/// Paging metadata of a `list` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Total number of matching records.
    #[serde(default)]
    pub count: u64,
    /// Page returned.
    #[serde(default)]
    pub page: u32,
    /// Page size used.
    #[serde(default)]
    pub page_size: u32,
    /// Number of pages.
    #[serde(default)]
    pub total_page: u32,
}

/// One page of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    /// Records on this page.
    pub data: Vec<Value>,
    /// Paging metadata.
    #[serde(default)]
    pub meta: ListMeta,
}

impl ListPage {
    /// Deserializes every record on the page.
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>, ResourceError> {
        self.data
            .iter()
            .map(|v| T::deserialize(v).map_err(ResourceError::from))
            .collect()
    }
}

/// Client for the platform's resource service.
///
/// Implementations must be safe to share across tasks. Errors use
/// [`ResourceError`]; an HTTP 409 must surface as
/// [`ResourceError::Conflict`] so a lost submission race can be told apart
/// from a failure.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetches one record of `resource` with the requested associations.
    async fn get(&self, resource: &str, params: &GetParams) -> Result<Value, ResourceError>;

    /// Applies a partial update to one record of `resource`.
    async fn submit(&self, resource: &str, params: &SubmitParams) -> Result<Value, ResourceError>;

    /// Lists one page of `resource`.
    async fn list(&self, resource: &str, params: &ListParams) -> Result<ListPage, ResourceError>;
}

#[async_trait]
impl<C: ResourceClient + ?Sized> ResourceClient for Arc<C> {
    async fn get(&self, resource: &str, params: &GetParams) -> Result<Value, ResourceError> {
        (**self).get(resource, params).await
    }

    async fn submit(&self, resource: &str, params: &SubmitParams) -> Result<Value, ResourceError> {
        (**self).submit(resource, params).await
    }

    async fn list(&self, resource: &str, params: &ListParams) -> Result<ListPage, ResourceError> {
        (**self).list(resource, params).await
    }
}

/// Fetches one record and deserializes it.
pub async fn get_as<T: DeserializeOwned>(
    client: &dyn ResourceClient,
    resource: &str,
    params: &GetParams,
) -> Result<T, ResourceError> {
    let value = client.get(resource, params).await?;
    serde_json::from_value(value).map_err(ResourceError::from)
}
