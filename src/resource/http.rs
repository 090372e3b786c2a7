//! REST resource client over reqwest.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{
    ClientConfig, GetParams, ListMeta, ListPage, ListParams, ResourceClient, ResourceError,
    SubmitParams,
};

/// Resource client speaking the service's `{resource}:{action}` REST API.
///
/// Every response is unwrapped from its `{ "data": ..., "meta": ... }`
/// envelope. Error responses carry `{ "errors": [{ "message": ... }] }`;
/// the first message and the status code are mapped through
/// [`ResourceError::from_status`].
///
/// # Example
///
/// ```rust,ignore
/// use manual_tasks::resource::{ClientConfig, GetParams, HttpResourceClient, ResourceClient};
///
/// let client = HttpResourceClient::new(ClientConfig::from_env()?)?;
/// let job = client.get("users_jobs", &GetParams::by_id(42)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    http: reqwest::Client,
    api_root: Url,
    config: ClientConfig,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    meta: Option<ListMeta>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    #[serde(default)]
    message: String,
}

impl HttpResourceClient {
    /// Creates a client; fails on an invalid base URL.
    pub fn new(config: ClientConfig) -> Result<Self, ResourceError> {
        let api_root = config.api_root()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ResourceError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_root,
            config,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, resource: &str, action: &str) -> Result<Url, ResourceError> {
        self.api_root
            .join(&format!("./{resource}:{action}"))
            .map_err(|e| ResourceError::Configuration(format!("invalid resource '{resource}': {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Envelope, ResourceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ResourceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResourceError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.errors.into_iter().next())
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            tracing::debug!(status = status.as_u16(), %message, "resource request failed");
            return Err(ResourceError::from_status(status.as_u16(), message));
        }

        if body.trim().is_empty() {
            return Ok(Envelope {
                data: Value::Null,
                meta: None,
            });
        }
        serde_json::from_str(&body).map_err(ResourceError::from)
    }
}

fn append_list(url: &mut Url, name: &str, items: &[String]) {
    let key = format!("{name}[]");
    let mut pairs = url.query_pairs_mut();
    for item in items {
        pairs.append_pair(&key, item);
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get(&self, resource: &str, params: &GetParams) -> Result<Value, ResourceError> {
        let mut url = self.endpoint(resource, "get")?;
        url.query_pairs_mut()
            .append_pair("filterByTk", &params.filter_by_tk.to_string());
        append_list(&mut url, "appends", &params.appends);

        tracing::debug!(resource, id = params.filter_by_tk, "GET record");
        Ok(self.execute(self.http.get(url)).await?.data)
    }

    async fn submit(&self, resource: &str, params: &SubmitParams) -> Result<Value, ResourceError> {
        let mut url = self.endpoint(resource, "submit")?;
        url.query_pairs_mut()
            .append_pair("filterByTk", &params.filter_by_tk.to_string());

        tracing::debug!(resource, id = params.filter_by_tk, "POST submit");
        Ok(self
            .execute(self.http.post(url).json(&params.values))
            .await?
            .data)
    }

    async fn list(&self, resource: &str, params: &ListParams) -> Result<ListPage, ResourceError> {
        let mut url = self.endpoint(resource, "list")?;
        url.query_pairs_mut()
            .append_pair("page", &params.page.to_string())
            .append_pair("pageSize", &params.page_size.to_string());
        append_list(&mut url, "sort", &params.sort);
        append_list(&mut url, "appends", &params.appends);
        append_list(&mut url, "except", &params.except);
        if let Some(filter) = &params.filter {
            let filter = serde_json::to_string(filter)
                .map_err(|e| ResourceError::Serialization(e.to_string()))?;
            url.query_pairs_mut().append_pair("filter", &filter);
        }

        tracing::debug!(resource, page = params.page, "GET list");
        let envelope = self.execute(self.http.get(url)).await?;
        let data = match envelope.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(ResourceError::Deserialization(format!(
                    "expected a list of records, got {other}"
                )))
            },
        };
        Ok(ListPage {
            data,
            meta: envelope.meta.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_resource_and_action() {
        let client = HttpResourceClient::new(ClientConfig::new("http://localhost:13000/")).unwrap();
        assert_eq!(
            client.endpoint("users_jobs", "submit").unwrap().as_str(),
            "http://localhost:13000/api/users_jobs:submit"
        );
    }

    #[test]
    fn list_query_uses_bracket_arrays() {
        let mut url = Url::parse("http://h/api/x:list").unwrap();
        append_list(&mut url, "sort", &["-createdAt".to_string()]);
        assert_eq!(url.query(), Some("sort%5B%5D=-createdAt"));
    }
}
