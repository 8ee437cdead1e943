//! Remote-only commands: executions, credentials, variables, tags, audit,
//! auth probe, and health check.

use serde_json::json;

use n8nctl_api::{ApiClient, ExecutionFilters};

use crate::cli::{CredentialCommand, ExecutionCommand, TagCommand, VariableCommand};
use crate::commands::{api_error, confirm, engine_error};
use crate::context::AppContext;
use crate::envelope::Outcome;

fn client(ctx: &AppContext) -> Result<ApiClient, Outcome> {
    ctx.api()
        .map_err(|(class, code, message)| Outcome::error(class, code, &message, None))
}

pub async fn run_executions(ctx: &AppContext, command: ExecutionCommand) -> Outcome {
    let api = match client(ctx) {
        Ok(api) => api,
        Err(outcome) => return outcome,
    };
    match command {
        ExecutionCommand::List {
            workflow_id,
            status,
            limit,
            cursor,
        } => {
            let filters = ExecutionFilters {
                workflow_id,
                status,
                limit,
                cursor,
            };
            match api.list_executions(&filters).await {
                Ok(page) => Outcome::success(json!(page)),
                Err(err) => api_error(err),
            }
        }
        ExecutionCommand::Get { id, data } => match api.get_execution(&id, data).await {
            Ok(execution) => Outcome::success(json!(execution)),
            Err(err) => api_error(err),
        },
        ExecutionCommand::Delete { id, force } => {
            if let Err(outcome) = confirm(&format!("delete execution {id}? [y/N]"), force, None) {
                return outcome;
            }
            match api.delete_execution(&id).await {
                Ok(data) => Outcome::success(data),
                Err(err) => api_error(err),
            }
        }
        ExecutionCommand::Retry { id, load_latest } => {
            match api.retry_execution(&id, load_latest).await {
                Ok(data) => Outcome::success(data),
                Err(err) => api_error(err),
            }
        }
    }
}

pub async fn run_credentials(ctx: &AppContext, command: CredentialCommand) -> Outcome {
    let api = match client(ctx) {
        Ok(api) => api,
        Err(outcome) => return outcome,
    };
    match command {
        CredentialCommand::Create { file } => {
            let payload = match std::fs::read_to_string(&file) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(value) => value,
                    Err(err) => {
                        return Outcome::error(
                            n8nctl_core::ErrorClass::Data,
                            "PARSE_ERROR",
                            &format!("{file} is not valid JSON: {err}"),
                            None,
                        )
                    }
                },
                Err(err) => return engine_error(err.into()),
            };
            match api.create_credential(&payload).await {
                Ok(credential) => Outcome::success(json!(credential)),
                Err(err) => api_error(err),
            }
        }
        CredentialCommand::Delete { id, force } => {
            if let Err(outcome) = confirm(&format!("delete credential {id}? [y/N]"), force, None) {
                return outcome;
            }
            match api.delete_credential(&id).await {
                Ok(data) => Outcome::success(data),
                Err(err) => api_error(err),
            }
        }
        CredentialCommand::Schema { credential_type } => {
            match api.credential_schema(&credential_type).await {
                Ok(schema) => Outcome::success(schema),
                Err(err) => api_error(err),
            }
        }
    }
}

pub async fn run_variables(ctx: &AppContext, command: VariableCommand) -> Outcome {
    let api = match client(ctx) {
        Ok(api) => api,
        Err(outcome) => return outcome,
    };
    match command {
        VariableCommand::List => match api.list_variables().await {
            Ok(page) => Outcome::success(json!(page)),
            Err(err) => api_error(err),
        },
        VariableCommand::Create { key, value } => match api.create_variable(&key, &value).await {
            Ok(data) => Outcome::success(data),
            Err(err) => api_error(err),
        },
        VariableCommand::Delete { id, force } => {
            if let Err(outcome) = confirm(&format!("delete variable {id}? [y/N]"), force, None) {
                return outcome;
            }
            match api.delete_variable(&id).await {
                Ok(data) => Outcome::success(data),
                Err(err) => api_error(err),
            }
        }
    }
}

pub async fn run_tags(ctx: &AppContext, command: TagCommand) -> Outcome {
    let api = match client(ctx) {
        Ok(api) => api,
        Err(outcome) => return outcome,
    };
    match command {
        TagCommand::List => match api.list_tags().await {
            Ok(page) => Outcome::success(json!(page)),
            Err(err) => api_error(err),
        },
        TagCommand::Create { name } => match api.create_tag(&name).await {
            Ok(tag) => Outcome::success(json!(tag)),
            Err(err) => api_error(err),
        },
        TagCommand::Delete { id, force } => {
            if let Err(outcome) = confirm(&format!("delete tag {id}? [y/N]"), force, None) {
                return outcome;
            }
            match api.delete_tag(&id).await {
                Ok(data) => Outcome::success(data),
                Err(err) => api_error(err),
            }
        }
    }
}

pub async fn run_audit(ctx: &AppContext) -> Outcome {
    let api = match client(ctx) {
        Ok(api) => api,
        Err(outcome) => return outcome,
    };
    match api.generate_audit().await {
        Ok(report) => Outcome::success(report),
        Err(err) => api_error(err),
    }
}

pub async fn run_auth(ctx: &AppContext) -> Outcome {
    let api = match client(ctx) {
        Ok(api) => api,
        Err(outcome) => return outcome,
    };
    match api.verify_auth().await {
        Ok(()) => Outcome::success(json!({ "authenticated": true })),
        Err(err) => api_error(err),
    }
}

pub async fn run_health(ctx: &AppContext) -> Outcome {
    let api = match client(ctx) {
        Ok(api) => api,
        Err(outcome) => return outcome,
    };
    match api.health().await {
        Ok(status) => Outcome::success(status),
        Err(err) => api_error(err),
    }
}
