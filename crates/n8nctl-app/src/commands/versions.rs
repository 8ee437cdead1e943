//! Local version history commands.

use serde_json::json;

use n8nctl_core::workflow::parser;

use crate::cli::VersionCommand;
use crate::commands::{api_error, confirm, engine_error, store_error};
use crate::context::AppContext;
use crate::envelope::Outcome;

pub async fn run(ctx: &AppContext, command: VersionCommand) -> Outcome {
    let store = match ctx.store() {
        Ok(store) => store,
        Err(err) => return store_error(err),
    };

    match command {
        VersionCommand::List { workflow_id, limit } => match store.list(&workflow_id, limit) {
            Ok(versions) => Outcome::success(json!({ "versions": versions })),
            Err(err) => store_error(err),
        },
        VersionCommand::Get {
            workflow_id,
            version,
            output,
        } => match store.get(&workflow_id, version) {
            Ok(Some(snapshot)) => {
                if let Some(path) = output {
                    match parser::serialize(&snapshot.workflow, true) {
                        Ok(bytes) => {
                            if let Err(err) = std::fs::write(&path, bytes) {
                                return engine_error(err.into());
                            }
                        }
                        Err(err) => return engine_error(err),
                    }
                }
                Outcome::success(json!(snapshot))
            }
            Ok(None) => Outcome::error(
                n8nctl_core::ErrorClass::Data,
                "VERSION_NOT_FOUND",
                &format!("version {version} of workflow {workflow_id} not found"),
                None,
            ),
            Err(err) => store_error(err),
        },
        VersionCommand::Compare {
            workflow_id,
            from,
            to,
        } => match store.compare(&workflow_id, from, to) {
            Ok(diff) => Outcome::success(json!({
                "from": from,
                "to": to,
                "changes": diff,
            })),
            Err(err) => store_error(err),
        },
        VersionCommand::Rollback {
            workflow_id,
            to_version,
            no_backup,
            no_validate,
            force,
        } => {
            rollback(
                ctx,
                &store,
                &workflow_id,
                to_version,
                !no_backup,
                !no_validate,
                force,
            )
            .await
        }
        VersionCommand::Prune { workflow_id, keep } => match store.prune(&workflow_id, keep) {
            Ok(removed) => Outcome::success(json!({ "removed": removed, "kept": keep })),
            Err(err) => store_error(err),
        },
        VersionCommand::Delete { workflow_id, force } => {
            if let Err(outcome) = confirm(
                &format!("delete all stored versions of {workflow_id}? [y/N]"),
                force,
                None,
            ) {
                return outcome;
            }
            match store.delete_all(&workflow_id) {
                Ok(removed) => Outcome::success(json!({ "removed": removed })),
                Err(err) => store_error(err),
            }
        }
        VersionCommand::Stats => match store.stats() {
            Ok(stats) => Outcome::success(json!(stats)),
            Err(err) => store_error(err),
        },
    }
}

/// Fetch the live state, snapshot it, then push the target version back to
/// the instance.
async fn rollback(
    ctx: &AppContext,
    store: &n8nctl_store::VersionStore,
    workflow_id: &str,
    target_version: u64,
    backup: bool,
    validate_before: bool,
    force: bool,
) -> Outcome {
    if let Err(outcome) = confirm(
        &format!("roll {workflow_id} back to version {target_version}? [y/N]"),
        force,
        None,
    ) {
        return outcome;
    }

    let api = match ctx.api() {
        Ok(api) => api,
        Err((class, code, message)) => return Outcome::error(class, code, &message, None),
    };
    let current = match api.get_workflow(workflow_id).await {
        Ok(workflow) => workflow,
        Err(err) => return api_error(err),
    };

    // Refuse to push a target state that would not pass runtime validation.
    if validate_before {
        let target = match store.get(workflow_id, target_version) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                return Outcome::error(
                    n8nctl_core::ErrorClass::Data,
                    "VERSION_NOT_FOUND",
                    &format!("version {target_version} of workflow {workflow_id} not found"),
                    None,
                )
            }
            Err(err) => return store_error(err),
        };
        let catalog = match ctx.catalog() {
            Ok(catalog) => catalog,
            Err(err) => return engine_error(err),
        };
        match n8nctl_core::validate::validate(
            &target.workflow,
            catalog.as_ref(),
            &n8nctl_core::validate::ValidateOptions::default(),
        ) {
            Ok(report) if !report.valid => {
                return Outcome::error(
                    n8nctl_core::ErrorClass::Data,
                    "ROLLBACK_TARGET_INVALID",
                    &format!(
                        "version {target_version} fails validation with {} error(s); \
                         re-run with --no-validate to force",
                        report.errors.len()
                    ),
                    serde_json::to_value(&report).ok(),
                )
            }
            Ok(_) => {}
            Err(err) => return engine_error(err),
        }
    }

    let (restored, backup_version) =
        match store.rollback(workflow_id, &current, target_version, backup) {
            Ok(result) => result,
            Err(err) => return store_error(err),
        };

    if let Err(err) = api.update_workflow(workflow_id, &restored).await {
        return api_error(err);
    }

    Outcome::success(json!({
        "workflowId": workflow_id,
        "restoredVersion": target_version,
        "preRollbackVersion": backup_version,
    }))
}
