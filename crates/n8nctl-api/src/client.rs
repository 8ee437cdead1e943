//! The REST client for a remote n8n instance.
//!
//! One shared `reqwest` client (per-host connection reuse), the API key on
//! every request, and the retry policy of [`crate::retry`] around every
//! call. Response classification turns HTTP status codes into the
//! [`ApiError`] taxonomy; payload decoding failures are protocol errors.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use n8nctl_core::Workflow;

use crate::error::{ApiError, Result};
use crate::retry::{retry_with_policy, RetryPolicy};
use crate::types::{
    Credential, Execution, ExecutionFilters, Page, Tag, Variable, WorkflowFilters, WorkflowSummary,
};

/// Header carrying the API key. The key itself is never logged.
pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Hard ceiling on any configured timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for unary API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Instance base URL, e.g. `https://n8n.example.com`
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(MAX_TIMEOUT);
        self
    }
}

/// Shared REST client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout.min(MAX_TIMEOUT))
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/v1{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    /// Send one request under the retry policy and decode the JSON response.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let url = self.url(path);
        retry_with_policy(&self.config.retry, || {
            let url = url.clone();
            let method = method.clone();
            async move {
                debug!(%method, %url, "request");
                let mut builder = self
                    .http
                    .request(method, &url)
                    .header(API_KEY_HEADER, &self.config.api_key)
                    .query(query);
                if let Some(body) = body {
                    builder = builder.json(body);
                }
                let response = builder.send().await?;
                Self::decode(response).await
            }
        })
        .await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                // DELETE-style endpoints return nothing; decode from null.
                return serde_json::from_value(Value::Null).map_err(|e| ApiError::Protocol {
                    message: format!("empty response where a payload was expected: {e}"),
                });
            }
            return serde_json::from_slice(&bytes).map_err(|e| ApiError::Protocol {
                message: format!("response does not match the API contract: {e}"),
            });
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let message = response
            .text()
            .await
            .ok()
            .and_then(|raw| {
                serde_json::from_str::<Value>(&raw)
                    .ok()
                    .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                    .or(Some(raw))
            })
            .unwrap_or_default();

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized { message },
            StatusCode::NOT_FOUND => ApiError::NotFound {
                resource: "resource".into(),
                id: message,
            },
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { retry_after },
            StatusCode::REQUEST_TIMEOUT => ApiError::Server {
                status: status.as_u16(),
                message,
            },
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            _ => ApiError::Validation { message },
        })
    }

    // ---- workflows ----

    pub async fn list_workflows(&self, filters: &WorkflowFilters) -> Result<Page<WorkflowSummary>> {
        let mut query = Vec::new();
        if let Some(active) = filters.active {
            query.push(("active".to_string(), active.to_string()));
        }
        if !filters.tags.is_empty() {
            query.push(("tags".to_string(), filters.tags.join(",")));
        }
        if let Some(name) = &filters.name {
            query.push(("name".to_string(), name.clone()));
        }
        if let Some(limit) = filters.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(cursor) = &filters.cursor {
            query.push(("cursor".to_string(), cursor.clone()));
        }
        self.request(Method::GET, "/workflows", &query, None).await
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Workflow> {
        match self
            .request::<Workflow>(Method::GET, &format!("/workflows/{id}"), &[], None)
            .await
        {
            Err(ApiError::NotFound { resource: _, id: _ }) => Err(ApiError::NotFound {
                resource: "workflow".into(),
                id: id.to_string(),
            }),
            other => other,
        }
    }

    pub async fn create_workflow(&self, workflow: &Workflow) -> Result<Workflow> {
        let body = workflow.to_value(false);
        self.request(Method::POST, "/workflows", &[], Some(&body))
            .await
    }

    pub async fn update_workflow(&self, id: &str, workflow: &Workflow) -> Result<Workflow> {
        let body = workflow.to_value(false);
        self.request(Method::PUT, &format!("/workflows/{id}"), &[], Some(&body))
            .await
    }

    pub async fn delete_workflow(&self, id: &str) -> Result<Value> {
        self.request(Method::DELETE, &format!("/workflows/{id}"), &[], None)
            .await
    }

    pub async fn activate_workflow(&self, id: &str) -> Result<WorkflowSummary> {
        self.request(
            Method::POST,
            &format!("/workflows/{id}/activate"),
            &[],
            None,
        )
        .await
    }

    pub async fn deactivate_workflow(&self, id: &str) -> Result<WorkflowSummary> {
        self.request(
            Method::POST,
            &format!("/workflows/{id}/deactivate"),
            &[],
            None,
        )
        .await
    }

    // ---- executions ----

    pub async fn list_executions(&self, filters: &ExecutionFilters) -> Result<Page<Execution>> {
        let mut query = Vec::new();
        if let Some(workflow_id) = &filters.workflow_id {
            query.push(("workflowId".to_string(), workflow_id.clone()));
        }
        if let Some(status) = &filters.status {
            query.push(("status".to_string(), status.clone()));
        }
        if let Some(limit) = filters.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(cursor) = &filters.cursor {
            query.push(("cursor".to_string(), cursor.clone()));
        }
        self.request(Method::GET, "/executions", &query, None).await
    }

    pub async fn get_execution(&self, id: &str, include_data: bool) -> Result<Execution> {
        let query = if include_data {
            vec![("includeData".to_string(), "true".to_string())]
        } else {
            Vec::new()
        };
        self.request(Method::GET, &format!("/executions/{id}"), &query, None)
            .await
    }

    pub async fn delete_execution(&self, id: &str) -> Result<Value> {
        self.request(Method::DELETE, &format!("/executions/{id}"), &[], None)
            .await
    }

    pub async fn retry_execution(&self, id: &str, load_latest: bool) -> Result<Value> {
        let body = json!({ "loadWorkflow": load_latest });
        self.request(
            Method::POST,
            &format!("/executions/{id}/retry"),
            &[],
            Some(&body),
        )
        .await
    }

    // ---- credentials ----

    pub async fn create_credential(&self, payload: &Value) -> Result<Credential> {
        self.request(Method::POST, "/credentials", &[], Some(payload))
            .await
    }

    pub async fn delete_credential(&self, id: &str) -> Result<Value> {
        self.request(Method::DELETE, &format!("/credentials/{id}"), &[], None)
            .await
    }

    pub async fn credential_schema(&self, credential_type: &str) -> Result<Value> {
        self.request(
            Method::GET,
            &format!("/credentials/schema/{credential_type}"),
            &[],
            None,
        )
        .await
    }

    // ---- variables ----

    pub async fn list_variables(&self) -> Result<Page<Variable>> {
        self.request(Method::GET, "/variables", &[], None).await
    }

    pub async fn create_variable(&self, key: &str, value: &str) -> Result<Value> {
        let body = json!({ "key": key, "value": value });
        self.request(Method::POST, "/variables", &[], Some(&body))
            .await
    }

    pub async fn delete_variable(&self, id: &str) -> Result<Value> {
        self.request(Method::DELETE, &format!("/variables/{id}"), &[], None)
            .await
    }

    // ---- tags ----

    pub async fn list_tags(&self) -> Result<Page<Tag>> {
        self.request(Method::GET, "/tags", &[], None).await
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let body = json!({ "name": name });
        self.request(Method::POST, "/tags", &[], Some(&body)).await
    }

    pub async fn delete_tag(&self, id: &str) -> Result<Value> {
        self.request(Method::DELETE, &format!("/tags/{id}"), &[], None)
            .await
    }

    // ---- audit & health ----

    pub async fn generate_audit(&self) -> Result<Value> {
        self.request(Method::POST, "/audit", &[], Some(&json!({})))
            .await
    }

    /// Instance liveness probe; hits the unversioned healthz endpoint.
    pub async fn health(&self) -> Result<Value> {
        let url = format!("{}/healthz", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network {
                message: format!("health check failed: {e}"),
            })?;
        Self::decode(response).await
    }

    /// Cheap auth probe: lists one workflow with the configured key.
    pub async fn verify_auth(&self) -> Result<()> {
        let filters = WorkflowFilters {
            limit: Some(1),
            ..Default::default()
        };
        self.list_workflows(&filters).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new(ApiConfig::new("https://n8n.example.com/", "key")).unwrap();
        assert_eq!(
            client.url("/workflows"),
            "https://n8n.example.com/api/v1/workflows"
        );
    }

    #[test]
    fn configured_timeout_is_clamped_to_ceiling() {
        let config = ApiConfig::new("https://n8n.example.com", "key")
            .with_timeout(Duration::from_secs(86_400));
        assert_eq!(config.timeout, MAX_TIMEOUT);
    }
}
