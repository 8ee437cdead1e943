//! Webhook trigger dispatch.
//!
//! Sends a single HTTP request to a workflow's webhook URL. The URL passes
//! the SSRF guard first; the resolved addresses are pinned on a dedicated
//! client so the connection can only go where the check looked.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::MAX_TIMEOUT;
use crate::error::{ApiError, Result};
use crate::ssrf::SsrfGuard;

/// Default timeout for webhook triggers.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// One webhook dispatch.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl WebhookRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            body: None,
            headers: Vec::new(),
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(MAX_TIMEOUT);
        self
    }
}

/// Response summary returned to the caller.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub status: u16,
    pub body: Value,
}

/// Dispatch a webhook request under the given SSRF guard.
///
/// The guard resolves the target immediately before the connection and the
/// resolved addresses are pinned, so a rebinding DNS name cannot redirect
/// the request after validation.
pub async fn trigger(request: &WebhookRequest, guard: &SsrfGuard) -> Result<WebhookResponse> {
    let url = Url::parse(&request.url).map_err(|e| ApiError::Validation {
        message: format!("invalid webhook URL: {e}"),
    })?;
    let addrs = guard.resolve_and_check(&url).await?;

    let mut builder = reqwest::Client::builder()
        .timeout(request.timeout.min(MAX_TIMEOUT))
        // No redirects: a redirect target would bypass the guard.
        .redirect(reqwest::redirect::Policy::none());
    if let Some(host) = url.host_str() {
        if host.parse::<std::net::IpAddr>().is_err() {
            builder = builder.resolve_to_addrs(host, &addrs);
        }
    }
    let client = builder.build().map_err(|e| ApiError::Network {
        message: format!("failed to build webhook client: {e}"),
    })?;

    let mut req = client.request(request.method.clone(), url.clone());
    for (name, value) in &request.headers {
        req = req.header(name, value);
    }
    if let Some(body) = &request.body {
        req = req.json(body);
    }

    debug!(url = %url, method = %request.method, "dispatching webhook");
    let response = req.send().await?;
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

    Ok(WebhookResponse { status, body })
}
