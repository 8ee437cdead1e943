//! The offline engine commands: validate, autofix, diff.

use serde_json::json;

use n8nctl_core::autofix::{self, AutofixOptions, Confidence, FixType};
use n8nctl_core::diff::{self, DiffOperation, DiffOptions};
use n8nctl_core::validate::{validate, Mode, Profile, ValidateOptions};
use n8nctl_core::workflow::parser;
use n8nctl_core::Workflow;
use n8nctl_store::SnapshotTrigger;

use crate::cli::WorkflowInput;
use crate::commands::{
    api_error, engine_error, load_workflow, snapshot_before_mutation, usage_error, WorkflowSource,
};
use crate::context::AppContext;
use crate::envelope::Outcome;

pub struct ValidateArgs {
    pub input: WorkflowInput,
    pub profile: Option<String>,
    pub mode: Option<String>,
    pub repair: bool,
    pub no_expressions: bool,
    pub no_versions: bool,
}

pub async fn validate_command(ctx: &AppContext, args: ValidateArgs) -> Outcome {
    let options = match build_validate_options(
        args.profile.as_deref(),
        args.mode.as_deref(),
        args.no_expressions,
        args.no_versions,
    ) {
        Ok(options) => options,
        Err(outcome) => return outcome,
    };
    let catalog = match ctx.catalog() {
        Ok(catalog) => catalog,
        Err(err) => return engine_error(err),
    };
    let (workflow, _, _) = match load_workflow(ctx, &args.input, catalog.as_ref(), args.repair).await
    {
        Ok(loaded) => loaded,
        Err(outcome) => return outcome,
    };

    match validate(&workflow, catalog.as_ref(), &options) {
        Ok(result) => Outcome::validation(&result),
        Err(err) => engine_error(err),
    }
}

fn build_validate_options(
    profile: Option<&str>,
    mode: Option<&str>,
    no_expressions: bool,
    no_versions: bool,
) -> Result<ValidateOptions, Outcome> {
    let mut options = ValidateOptions::default();
    if let Some(raw) = profile {
        options.profile = Profile::parse(raw).ok_or_else(|| {
            usage_error(&format!(
                "unknown profile '{raw}' (minimal, runtime, ai-friendly, strict)"
            ))
        })?;
    }
    if let Some(raw) = mode {
        options.mode = Mode::parse(raw).ok_or_else(|| {
            usage_error(&format!("unknown mode '{raw}' (minimal, operation, full)"))
        })?;
    }
    options.check_expressions = !no_expressions;
    options.check_versions = !no_versions;
    Ok(options)
}

pub struct AutofixArgs {
    pub input: WorkflowInput,
    pub apply: bool,
    pub confidence: Option<String>,
    pub fix_types: Vec<String>,
    pub max_fixes: Option<usize>,
    pub output: Option<String>,
}

pub async fn autofix_command(ctx: &AppContext, args: AutofixArgs) -> Outcome {
    let mut options = AutofixOptions::default();
    if let Some(raw) = &args.confidence {
        match Confidence::parse(raw) {
            Some(level) => options.min_confidence = level,
            None => return usage_error(&format!("unknown confidence '{raw}' (high, medium, low)")),
        }
    }
    if !args.fix_types.is_empty() {
        let mut parsed = Vec::new();
        for raw in &args.fix_types {
            match FixType::parse(raw) {
                Some(fix_type) => parsed.push(fix_type),
                None => return usage_error(&format!("unknown fix type '{raw}'")),
            }
        }
        options.fix_types = Some(parsed);
    }
    options.max_fixes = args.max_fixes;

    let catalog = match ctx.catalog() {
        Ok(catalog) => catalog,
        Err(err) => return engine_error(err),
    };
    let (workflow, source, _) = match load_workflow(ctx, &args.input, catalog.as_ref(), true).await
    {
        Ok(loaded) => loaded,
        Err(outcome) => return outcome,
    };

    let validation = match validate(&workflow, catalog.as_ref(), &ValidateOptions::default()) {
        Ok(result) => result,
        Err(err) => return engine_error(err),
    };

    if !args.apply {
        let plan = match autofix::plan(&workflow, &validation, catalog.as_ref(), &options) {
            Ok(plan) => plan,
            Err(err) => return engine_error(err),
        };
        return Outcome::success(json!({
            "preview": true,
            "source": source.describe(),
            "plan": plan,
        }));
    }

    // Snapshot before mutating anything the workflow id can key.
    if let Some(id) = workflow_id_for(&source, &workflow) {
        if let Err(outcome) =
            snapshot_before_mutation(ctx, &id, &workflow, SnapshotTrigger::Autofix)
        {
            return outcome;
        }
    }

    let outcome = match autofix::apply(&workflow, &validation, catalog.as_ref(), &options) {
        Ok(outcome) => outcome,
        Err(err) => return engine_error(err),
    };
    if outcome.diff.failed > 0 {
        return Outcome::error(
            n8nctl_core::ErrorClass::Data,
            "DIFF_OPERATION_FAILED",
            "autofix operations failed to apply",
            Some(json!(outcome.diff)),
        );
    }

    if let Err(failure) =
        persist(ctx, &source, &outcome.workflow, args.output.as_deref()).await
    {
        return failure;
    }

    Outcome::success(json!({
        "applied": outcome.plan.operations,
        "skipped": outcome.plan.skipped,
        "guidance": outcome.plan.guidance,
        "source": source.describe(),
    }))
}

pub struct DiffArgs {
    pub input: WorkflowInput,
    pub operations: String,
    pub apply: bool,
    pub continue_on_error: bool,
    pub output: Option<String>,
}

pub async fn diff_command(ctx: &AppContext, args: DiffArgs) -> Outcome {
    let operations_json = match crate::commands::read_json_argument(&args.operations) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    let operations: Vec<DiffOperation> = match serde_json::from_value(operations_json) {
        Ok(operations) => operations,
        Err(err) => {
            return Outcome::error(
                n8nctl_core::ErrorClass::Data,
                "PARSE_ERROR",
                &format!("operations do not match the diff contract: {err}"),
                None,
            )
        }
    };

    let catalog = match ctx.catalog() {
        Ok(catalog) => catalog,
        Err(err) => return engine_error(err),
    };
    let (workflow, source, _) = match load_workflow(ctx, &args.input, catalog.as_ref(), true).await
    {
        Ok(loaded) => loaded,
        Err(outcome) => return outcome,
    };

    let diff_options = DiffOptions {
        continue_on_error: args.continue_on_error,
    };
    let outcome = match diff::apply(&workflow, &operations, catalog.as_ref(), diff_options) {
        Ok(outcome) => outcome,
        Err(err) => return engine_error(err),
    };

    if !args.apply {
        return Outcome::success(json!({
            "preview": true,
            "result": outcome.result,
            "workflow": outcome.workflow.to_value(true),
            "source": source.describe(),
        }));
    }

    if outcome.result.failed > 0 && !args.continue_on_error {
        return Outcome::error(
            n8nctl_core::ErrorClass::Data,
            "DIFF_OPERATION_FAILED",
            "diff rejected; workflow unchanged",
            Some(json!(outcome.result)),
        );
    }

    if let Some(id) = workflow_id_for(&source, &workflow) {
        if let Err(failure) =
            snapshot_before_mutation(ctx, &id, &workflow, SnapshotTrigger::PartialUpdate)
        {
            return failure;
        }
    }
    if let Err(failure) = persist(ctx, &source, &outcome.workflow, args.output.as_deref()).await {
        return failure;
    }

    Outcome::success(json!({
        "result": outcome.result,
        "source": source.describe(),
    }))
}

pub(crate) fn workflow_id_for(source: &WorkflowSource, workflow: &Workflow) -> Option<String> {
    match source {
        WorkflowSource::Remote(id) => Some(id.clone()),
        _ => workflow.id.clone(),
    }
}

/// Write the mutated workflow back to where it came from.
async fn persist(
    ctx: &AppContext,
    source: &WorkflowSource,
    workflow: &Workflow,
    output: Option<&str>,
) -> Result<(), Outcome> {
    match source {
        WorkflowSource::Remote(id) => {
            let api = ctx
                .api()
                .map_err(|(class, code, message)| Outcome::error(class, code, &message, None))?;
            api.update_workflow(id, workflow).await.map_err(api_error)?;
            Ok(())
        }
        WorkflowSource::File(path) => {
            let target = output.unwrap_or(path);
            let bytes = parser::serialize(workflow, true).map_err(engine_error)?;
            std::fs::write(target, bytes)
                .map_err(|e| engine_error(n8nctl_core::EngineError::from(e)))?;
            Ok(())
        }
        WorkflowSource::Inline => match output {
            Some(target) => {
                let bytes = parser::serialize(workflow, true).map_err(engine_error)?;
                std::fs::write(target, bytes)
                    .map_err(|e| engine_error(n8nctl_core::EngineError::from(e)))?;
                Ok(())
            }
            None => Err(usage_error(
                "inline input needs --output to receive the mutated workflow",
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::WorkflowInput;
    use crate::config::Settings;
    use crate::context::AppContext;
    use n8nctl_kb::{fixture_records, fixture_templates, SqliteCatalog};
    use serde_json::json;

    /// Context backed by a freshly seeded nodes.db in a temp dir.
    fn test_context(dir: &std::path::Path) -> AppContext {
        let db_path = dir.join("nodes.db");
        let catalog = SqliteCatalog::create(&db_path).unwrap();
        for record in fixture_records() {
            catalog.ingest_node(&record).unwrap();
        }
        for template in fixture_templates() {
            catalog.ingest_template(&template).unwrap();
        }
        drop(catalog);

        let mut settings = Settings::default();
        settings.nodes_db = Some(db_path);
        settings.data_dir = dir.join("data");
        AppContext::new(settings)
    }

    fn file_input(path: &std::path::Path) -> WorkflowInput {
        WorkflowInput {
            file: Some(path.display().to_string()),
            id: None,
            inline: None,
        }
    }

    fn write_workflow(dir: &std::path::Path, value: serde_json::Value) -> std::path::PathBuf {
        let path = dir.join("flow.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
        path
    }

    fn broken_workflow() -> serde_json::Value {
        json!({
            "name": "Ingest",
            "nodes": [
                {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "ingest", "httpMethod": "POST"}},
                {"name": "Fetch", "type": "n8n-nodes-base.httpRequest", "typeVersion": 4.2,
                 "position": [220, 0], "parameters": {"url": "{{ $json.body.endpoint }}"}}
            ],
            "connections": {
                "Hook": {"main": [[{"node": "Fetch", "type": "main", "index": 0}]]}
            }
        })
    }

    #[tokio::test]
    async fn validate_reports_expression_error_with_exit_65() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let path = write_workflow(dir.path(), broken_workflow());

        let outcome = validate_command(
            &ctx,
            ValidateArgs {
                input: file_input(&path),
                profile: None,
                mode: None,
                repair: false,
                no_expressions: false,
                no_versions: false,
            },
        )
        .await;

        assert_eq!(outcome.exit_code, 65);
        assert_eq!(outcome.envelope["valid"], json!(false));
        let codes: Vec<&str> = outcome.envelope["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["code"].as_str())
            .collect();
        assert!(codes.contains(&"EXPRESSION_MISSING_PREFIX"));
    }

    #[tokio::test]
    async fn autofix_previews_then_applies_and_file_becomes_valid() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let path = write_workflow(dir.path(), broken_workflow());

        let preview = autofix_command(
            &ctx,
            AutofixArgs {
                input: file_input(&path),
                apply: false,
                confidence: None,
                fix_types: vec![],
                max_fixes: None,
                output: None,
            },
        )
        .await;
        assert_eq!(preview.exit_code, 0);
        assert_eq!(preview.envelope["data"]["preview"], json!(true));
        assert!(!preview.envelope["data"]["plan"]["operations"]
            .as_array()
            .unwrap()
            .is_empty());
        // Preview must not touch the file.
        let untouched: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(untouched["nodes"][1]["parameters"]["url"], json!("{{ $json.body.endpoint }}"));

        let applied = autofix_command(
            &ctx,
            AutofixArgs {
                input: file_input(&path),
                apply: true,
                confidence: Some("high".to_string()),
                fix_types: vec![],
                max_fixes: None,
                output: None,
            },
        )
        .await;
        assert_eq!(applied.exit_code, 0, "apply failed: {:?}", applied.envelope);

        let revalidated = validate_command(
            &ctx,
            ValidateArgs {
                input: file_input(&path),
                profile: None,
                mode: None,
                repair: false,
                no_expressions: false,
                no_versions: false,
            },
        )
        .await;
        assert_eq!(revalidated.exit_code, 0, "still invalid: {:?}", revalidated.envelope);
    }

    #[tokio::test]
    async fn diff_preview_keeps_file_and_apply_wires_branches() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let path = write_workflow(
            dir.path(),
            json!({
                "name": "Branching",
                "nodes": [
                    {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                     "position": [0, 0], "parameters": {"path": "in"}},
                    {"name": "IF", "type": "n8n-nodes-base.if", "typeVersion": 2.2,
                     "position": [220, 0], "parameters": {"conditions": {}}},
                    {"name": "Success", "type": "n8n-nodes-base.set", "typeVersion": 3.4,
                     "position": [440, -80], "parameters": {}},
                    {"name": "Failure", "type": "n8n-nodes-base.set", "typeVersion": 3.4,
                     "position": [440, 80], "parameters": {}}
                ],
                "connections": {
                    "Hook": {"main": [[{"node": "IF", "type": "main", "index": 0}]]}
                }
            }),
        );
        let operations = r#"[
            {"type": "addConnection", "source": "IF", "target": "Success", "branch": "true"},
            {"type": "addConnection", "source": "IF", "target": "Failure", "branch": "false"}
        ]"#;

        let preview = diff_command(
            &ctx,
            DiffArgs {
                input: file_input(&path),
                operations: operations.to_string(),
                apply: false,
                continue_on_error: false,
                output: None,
            },
        )
        .await;
        assert_eq!(preview.exit_code, 0);
        assert_eq!(preview.envelope["data"]["result"]["applied"], json!(2));

        let applied = diff_command(
            &ctx,
            DiffArgs {
                input: file_input(&path),
                operations: operations.to_string(),
                apply: true,
                continue_on_error: false,
                output: None,
            },
        )
        .await;
        assert_eq!(applied.exit_code, 0, "apply failed: {:?}", applied.envelope);

        let on_disk: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let slots = on_disk["connections"]["IF"]["main"].as_array().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0][0]["node"], json!("Success"));
        assert_eq!(slots[1][0]["node"], json!("Failure"));
    }

    #[tokio::test]
    async fn failing_diff_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let path = write_workflow(dir.path(), broken_workflow());
        let before = std::fs::read(&path).unwrap();

        let outcome = diff_command(
            &ctx,
            DiffArgs {
                input: file_input(&path),
                operations: r#"[{"type": "removeNode", "name": "Ghost"}]"#.to_string(),
                apply: true,
                continue_on_error: false,
                output: None,
            },
        )
        .await;
        assert_eq!(outcome.exit_code, 65);
        assert_eq!(outcome.envelope["error"]["code"], json!("DIFF_OPERATION_FAILED"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn missing_input_file_maps_to_enoent() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        let outcome = validate_command(
            &ctx,
            ValidateArgs {
                input: file_input(&dir.path().join("absent.json")),
                profile: None,
                mode: None,
                repair: false,
                no_expressions: false,
                no_versions: false,
            },
        )
        .await;
        assert_eq!(outcome.exit_code, 66);
        assert_eq!(outcome.envelope["error"]["code"], json!("ENOENT"));
    }
}
