//! # n8nctl API Client
//!
//! Remote orchestration client for an n8n instance: the REST surface
//! (workflows, executions, credentials, variables, tags, audit, health), a
//! retry policy with exponential backoff and jitter, an error taxonomy
//! mapped to exit codes, and an SSRF-guarded webhook trigger.
//!
//! The API key travels in the `X-N8N-API-KEY` header and is never logged.

pub mod client;
pub mod error;
pub mod retry;
pub mod ssrf;
pub mod types;
pub mod webhook;

pub use client::{ApiClient, ApiConfig, DEFAULT_TIMEOUT, MAX_TIMEOUT};
pub use error::{ApiError, Result};
pub use retry::{retry_with_policy, RetryPolicy};
pub use ssrf::{GuardMode, SsrfGuard};
pub use types::{
    Credential, Execution, ExecutionFilters, Page, Tag, Variable, WorkflowFilters, WorkflowSummary,
};
pub use webhook::{trigger, WebhookRequest, WebhookResponse, DEFAULT_WEBHOOK_TIMEOUT};
