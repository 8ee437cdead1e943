//! Command handlers.
//!
//! Every handler returns an [`Outcome`]: the envelope to print and the exit
//! code. Mutating commands snapshot to the version store and the backups
//! directory before writing anywhere, and preview by default.

pub mod config_cmd;
pub mod engine;
pub mod nodes;
pub mod remote;
pub mod versions;
pub mod workflows;

use std::io::IsTerminal;

use serde_json::json;

use n8nctl_api::ApiError;
use n8nctl_core::workflow::parser::{self, ParseOptions};
use n8nctl_core::workflow::normalize;
use n8nctl_core::{EngineError, ErrorClass, Workflow};
use n8nctl_kb::NodeCatalog;
use n8nctl_store::{SnapshotTrigger, StoreError};

use crate::cli::{Command, WorkflowInput};
use crate::context::AppContext;
use crate::envelope::Outcome;

/// Top-level dispatch.
pub async fn dispatch(ctx: &AppContext, command: Command) -> Outcome {
    match command {
        Command::Workflows { command } => workflows::run(ctx, command).await,
        Command::Versions { command } => versions::run(ctx, command).await,
        Command::Nodes { command } => nodes::run_nodes(ctx, command),
        Command::Templates { command } => nodes::run_templates(ctx, command),
        Command::Executions { command } => remote::run_executions(ctx, command).await,
        Command::Credentials { command } => remote::run_credentials(ctx, command).await,
        Command::Variables { command } => remote::run_variables(ctx, command).await,
        Command::Tags { command } => remote::run_tags(ctx, command).await,
        Command::Audit => remote::run_audit(ctx).await,
        Command::Auth => remote::run_auth(ctx).await,
        Command::Health => remote::run_health(ctx).await,
        Command::Config { command } => config_cmd::run(ctx, command),
    }
}

pub fn engine_error(err: EngineError) -> Outcome {
    Outcome::error(err.class(), err.code(), &err.to_string(), None)
}

pub fn api_error(err: ApiError) -> Outcome {
    Outcome::error(err.class(), err.code(), &err.to_string(), None)
}

pub fn store_error(err: StoreError) -> Outcome {
    Outcome::error(err.class(), err.code(), &err.to_string(), None)
}

pub fn usage_error(message: &str) -> Outcome {
    Outcome::error(ErrorClass::Usage, "MISSING_ARGUMENT", message, None)
}

/// Where a workflow came from; decides where mutations are written back.
#[derive(Debug, Clone)]
pub enum WorkflowSource {
    File(String),
    Remote(String),
    Inline,
}

impl WorkflowSource {
    pub fn describe(&self) -> serde_json::Value {
        match self {
            WorkflowSource::File(path) => json!({ "kind": "file", "path": path }),
            WorkflowSource::Remote(id) => json!({ "kind": "remote", "id": id }),
            WorkflowSource::Inline => json!({ "kind": "inline" }),
        }
    }
}

/// Load a workflow from `--file`, `--id`, or `--inline`, normalized against
/// the catalog.
pub async fn load_workflow(
    ctx: &AppContext,
    input: &WorkflowInput,
    catalog: &dyn NodeCatalog,
    repair: bool,
) -> Result<(Workflow, WorkflowSource, Vec<parser::RepairNote>), Outcome> {
    let (bytes, source) = if let Some(path) = &input.file {
        let bytes = std::fs::read(path).map_err(|e| {
            engine_error(EngineError::from(e))
        })?;
        (bytes, WorkflowSource::File(path.clone()))
    } else if let Some(inline) = &input.inline {
        (inline.clone().into_bytes(), WorkflowSource::Inline)
    } else if let Some(id) = &input.id {
        let api = ctx.api().map_err(|(class, code, message)| {
            Outcome::error(class, code, &message, None)
        })?;
        let workflow = api.get_workflow(id).await.map_err(api_error)?;
        let mut workflow = workflow;
        normalize::normalize(&mut workflow, catalog).map_err(engine_error)?;
        return Ok((workflow, WorkflowSource::Remote(id.clone()), Vec::new()));
    } else {
        return Err(usage_error("supply one of --file, --id, or --inline"));
    };

    let parsed = parser::parse(&bytes, ParseOptions { repair }).map_err(engine_error)?;
    let mut workflow = parsed.workflow;
    normalize::normalize(&mut workflow, catalog).map_err(engine_error)?;
    Ok((workflow, source, parsed.repairs))
}

/// Interactive confirmation. `expected` demands a typed phrase (bulk
/// deletes); otherwise y/yes confirms. Non-interactive runs require
/// `--force`.
pub fn confirm(prompt: &str, force: bool, expected: Option<&str>) -> Result<(), Outcome> {
    if force {
        return Ok(());
    }
    if !std::io::stdin().is_terminal() {
        return Err(Outcome::error(
            ErrorClass::Usage,
            "CONFIRMATION_REQUIRED",
            "refusing to mutate without --force in a non-interactive session",
            None,
        ));
    }

    eprint!("{prompt} ");
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return Err(Outcome::cancelled());
    }
    let answer = answer.trim();

    let confirmed = match expected {
        Some(phrase) => answer == phrase,
        None => matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"),
    };
    if confirmed {
        Ok(())
    } else {
        Err(Outcome::error(
            ErrorClass::Usage,
            "CONFIRMATION_REQUIRED",
            "aborted by user",
            None,
        ))
    }
}

/// Snapshot a workflow (by id) to the version store and the backups
/// directory before any mutation.
pub fn snapshot_before_mutation(
    ctx: &AppContext,
    workflow_id: &str,
    workflow: &Workflow,
    trigger: SnapshotTrigger,
) -> Result<u64, Outcome> {
    let store = ctx.store().map_err(store_error)?;
    let version = store
        .create_snapshot(workflow_id, workflow, trigger, Some("n8nctl"))
        .map_err(store_error)?;

    let backups = ctx.backups_dir();
    if let Err(err) = write_backup(&backups, workflow_id, workflow) {
        // A failed raw backup is not fatal; the store snapshot succeeded.
        tracing::warn!(error = %err, "could not write raw backup file");
    }
    Ok(version)
}

fn write_backup(
    dir: &std::path::Path,
    workflow_id: &str,
    workflow: &Workflow,
) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let path = dir.join(format!("{workflow_id}-{stamp}.json"));
    let bytes = parser::serialize(workflow, true)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(path, bytes)
}

/// Inline JSON or `@path` indirection for argument payloads.
pub fn read_json_argument(raw: &str) -> Result<serde_json::Value, Outcome> {
    let text = if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path).map_err(|e| engine_error(EngineError::from(e)))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text).map_err(|e| {
        Outcome::error(
            ErrorClass::Data,
            "PARSE_ERROR",
            &format!("argument is not valid JSON: {e}"),
            None,
        )
    })
}
