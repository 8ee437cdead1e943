//! Workflow commands: remote CRUD, bulk activation, and the webhook
//! trigger; the offline engines live in [`crate::commands::engine`].

use std::time::Duration;

use reqwest::Method;
use serde_json::json;

use n8nctl_api::{trigger, WebhookRequest, WorkflowFilters};
use n8nctl_core::workflow::parser::{self, ParseOptions};
use n8nctl_store::SnapshotTrigger;

use crate::bulk::{self, ItemOutcome};
use crate::cli::WorkflowCommand;
use crate::commands::engine::{
    autofix_command, diff_command, validate_command, AutofixArgs, DiffArgs, ValidateArgs,
};
use crate::commands::{
    api_error, confirm, engine_error, snapshot_before_mutation, store_error, usage_error,
};
use crate::context::AppContext;
use crate::envelope::Outcome;

/// Bulk deletions above this need the typed confirmation phrase.
const BULK_DELETE_THRESHOLD: usize = 10;

pub async fn run(ctx: &AppContext, command: WorkflowCommand) -> Outcome {
    match command {
        WorkflowCommand::List {
            active,
            tags,
            limit,
            cursor,
        } => list(ctx, active, tags, limit, cursor).await,
        WorkflowCommand::Get { id, output } => get(ctx, &id, output.as_deref()).await,
        WorkflowCommand::Create { file } => create(ctx, &file).await,
        WorkflowCommand::Update { id, file } => update(ctx, &id, &file).await,
        WorkflowCommand::Delete { ids, force } => delete(ctx, &ids, force).await,
        WorkflowCommand::Activate { ids } => bulk_toggle(ctx, &ids, true).await,
        WorkflowCommand::Deactivate { ids } => bulk_toggle(ctx, &ids, false).await,
        WorkflowCommand::Validate {
            input,
            validation_profile,
            mode,
            repair,
            no_expressions,
            no_versions,
        } => {
            validate_command(
                ctx,
                ValidateArgs {
                    input,
                    profile: validation_profile,
                    mode,
                    repair,
                    no_expressions,
                    no_versions,
                },
            )
            .await
        }
        WorkflowCommand::Autofix {
            input,
            apply,
            confidence,
            fix_types,
            max_fixes,
            output,
        } => {
            autofix_command(
                ctx,
                AutofixArgs {
                    input,
                    apply,
                    confidence,
                    fix_types,
                    max_fixes,
                    output,
                },
            )
            .await
        }
        WorkflowCommand::Diff {
            input,
            operations,
            apply,
            continue_on_error,
            output,
        } => {
            diff_command(
                ctx,
                DiffArgs {
                    input,
                    operations,
                    apply,
                    continue_on_error,
                    output,
                },
            )
            .await
        }
        WorkflowCommand::Trigger {
            url,
            method,
            body,
            header,
            timeout,
            guard,
        } => trigger_webhook(ctx, url, method, body, header, timeout, guard).await,
    }
}

async fn list(
    ctx: &AppContext,
    active: Option<bool>,
    tags: Vec<String>,
    limit: Option<u32>,
    cursor: Option<String>,
) -> Outcome {
    let api = match ctx.api() {
        Ok(api) => api,
        Err((class, code, message)) => return Outcome::error(class, code, &message, None),
    };
    let filters = WorkflowFilters {
        active,
        tags,
        name: None,
        limit,
        cursor,
    };
    match api.list_workflows(&filters).await {
        Ok(page) => Outcome::success(json!(page)),
        Err(err) => api_error(err),
    }
}

async fn get(ctx: &AppContext, id: &str, output: Option<&str>) -> Outcome {
    let api = match ctx.api() {
        Ok(api) => api,
        Err((class, code, message)) => return Outcome::error(class, code, &message, None),
    };
    let workflow = match api.get_workflow(id).await {
        Ok(workflow) => workflow,
        Err(err) => return api_error(err),
    };
    if let Some(path) = output {
        let bytes = match parser::serialize(&workflow, true) {
            Ok(bytes) => bytes,
            Err(err) => return engine_error(err),
        };
        if let Err(err) = std::fs::write(path, bytes) {
            return engine_error(err.into());
        }
    }
    Outcome::success(workflow.to_value(true))
}

async fn create(ctx: &AppContext, file: &str) -> Outcome {
    let api = match ctx.api() {
        Ok(api) => api,
        Err((class, code, message)) => return Outcome::error(class, code, &message, None),
    };
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(err) => return engine_error(err.into()),
    };
    let parsed = match parser::parse(&bytes, ParseOptions { repair: true }) {
        Ok(parsed) => parsed,
        Err(err) => return engine_error(err),
    };

    match api.create_workflow(&parsed.workflow).await {
        Ok(created) => {
            // First snapshot under the freshly assigned id.
            if let Some(id) = &created.id {
                let _ = snapshot_before_mutation(ctx, id, &created, SnapshotTrigger::FullUpdate);
            }
            Outcome::success(created.to_value(true))
        }
        Err(err) => api_error(err),
    }
}

async fn update(ctx: &AppContext, id: &str, file: &str) -> Outcome {
    let api = match ctx.api() {
        Ok(api) => api,
        Err((class, code, message)) => return Outcome::error(class, code, &message, None),
    };
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(err) => return engine_error(err.into()),
    };
    let parsed = match parser::parse(&bytes, ParseOptions { repair: true }) {
        Ok(parsed) => parsed,
        Err(err) => return engine_error(err),
    };

    // Snapshot the remote state before replacing it.
    match api.get_workflow(id).await {
        Ok(current) => {
            if let Err(outcome) =
                snapshot_before_mutation(ctx, id, &current, SnapshotTrigger::FullUpdate)
            {
                return outcome;
            }
        }
        Err(err) => return api_error(err),
    }

    match api.update_workflow(id, &parsed.workflow).await {
        Ok(updated) => Outcome::success(updated.to_value(true)),
        Err(err) => api_error(err),
    }
}

async fn delete(ctx: &AppContext, ids: &[String], force: bool) -> Outcome {
    if ids.is_empty() {
        return usage_error("no workflow ids given");
    }
    let phrase = format!("DELETE {}", ids.len());
    let confirmation = if ids.len() > BULK_DELETE_THRESHOLD {
        confirm(
            &format!(
                "about to delete {} workflows; type '{phrase}' to continue:",
                ids.len()
            ),
            force,
            Some(&phrase),
        )
    } else {
        confirm(
            &format!("delete {} workflow(s)? [y/N]", ids.len()),
            force,
            None,
        )
    };
    if let Err(outcome) = confirmation {
        return outcome;
    }

    let api = match ctx.api() {
        Ok(api) => api,
        Err((class, code, message)) => return Outcome::error(class, code, &message, None),
    };

    // Snapshot each workflow before it disappears.
    for id in ids {
        if let Ok(current) = api.get_workflow(id).await {
            let store = match ctx.store() {
                Ok(store) => store,
                Err(err) => return store_error(err),
            };
            let _ = store.create_snapshot(id, &current, SnapshotTrigger::FullUpdate, Some("n8nctl"));
        }
    }

    let outcomes = bulk::for_each_id(ids, |id| {
        let api = api.clone();
        async move { api.delete_workflow(&id).await }
    })
    .await;
    aggregate(outcomes)
}

async fn bulk_toggle(ctx: &AppContext, ids: &[String], activate: bool) -> Outcome {
    if ids.is_empty() {
        return usage_error("no workflow ids given");
    }
    let api = match ctx.api() {
        Ok(api) => api,
        Err((class, code, message)) => return Outcome::error(class, code, &message, None),
    };

    let outcomes = bulk::for_each_id(ids, |id| {
        let api = api.clone();
        async move {
            let summary = if activate {
                api.activate_workflow(&id).await?
            } else {
                api.deactivate_workflow(&id).await?
            };
            Ok(json!(summary))
        }
    })
    .await;
    aggregate(outcomes)
}

/// Input-order per-item results; exit code from the most severe failure.
fn aggregate(outcomes: Vec<ItemOutcome>) -> Outcome {
    let exit_code = Outcome::worst_exit_code(outcomes.iter().map(ItemOutcome::exit_code));
    let items: Vec<serde_json::Value> = outcomes.iter().map(ItemOutcome::to_json).collect();
    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let mut outcome = Outcome::success(json!({
        "items": items,
        "succeeded": succeeded,
        "failed": outcomes.len() - succeeded,
    }));
    outcome.exit_code = exit_code;
    if exit_code != 0 {
        outcome.envelope["success"] = json!(false);
    }
    outcome
}

async fn trigger_webhook(
    ctx: &AppContext,
    url: String,
    method: String,
    body: Option<String>,
    headers: Vec<String>,
    timeout: Option<u64>,
    guard_mode: Option<String>,
) -> Outcome {
    let method = match method.to_ascii_uppercase().parse::<Method>() {
        Ok(method) => method,
        Err(_) => return usage_error(&format!("invalid HTTP method '{method}'")),
    };

    let mut request = WebhookRequest::new(url).with_method(method);
    if let Some(raw) = &body {
        match crate::commands::read_json_argument(raw) {
            Ok(value) => request = request.with_body(value),
            Err(outcome) => return outcome,
        }
    }
    for raw in &headers {
        let Some((name, value)) = raw.split_once(':') else {
            return usage_error(&format!("header '{raw}' is not name:value"));
        };
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(seconds) = timeout {
        request = request.with_timeout(Duration::from_secs(seconds));
    }

    let guard = match ctx.ssrf_guard(guard_mode.as_deref()) {
        Ok(guard) => guard,
        Err(err) => return engine_error(err),
    };

    match trigger(&request, &guard).await {
        Ok(response) => Outcome::success(json!(response)),
        Err(err) => api_error(err),
    }
}
