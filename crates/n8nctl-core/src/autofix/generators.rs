//! Fix generators, run in fixed order for deterministic output.

use serde_json::{json, Value};
use uuid::Uuid;

use n8nctl_kb::{short_alias, ChangeSeverity, NodeCatalog};

use crate::autofix::{
    Confidence, FixOperation, FixType, GuidanceStatus, PostUpdateGuidance,
};
use crate::error::Result;
use crate::validate::{codes, Finding, ValidationResult};
use crate::workflow::Workflow;

pub(crate) fn run_all(
    workflow: &Workflow,
    validation: &ValidationResult,
    catalog: &dyn NodeCatalog,
    fixes: &mut Vec<FixOperation>,
    guidance: &mut Vec<PostUpdateGuidance>,
) -> Result<()> {
    let findings: Vec<&Finding> = validation
        .errors
        .iter()
        .chain(validation.warnings.iter())
        .collect();

    expression_format(workflow, &findings, fixes);
    node_type_correction(&findings, fixes, guidance);
    webhook_missing_path(&findings, fixes);
    switch_options(workflow, fixes);
    typeversion_correction(&findings, fixes);
    error_output_config(workflow, &findings, fixes);
    typeversion_upgrade(workflow, catalog, fixes, guidance)?;
    version_migration(workflow, catalog, guidance)?;
    Ok(())
}

fn scored(
    fix_type: FixType,
    score: u8,
    node_name: &str,
    path: Option<String>,
    before: Value,
    after: Value,
    description: String,
) -> FixOperation {
    FixOperation {
        fix_type,
        confidence: Confidence::from_score(score),
        score,
        node_name: node_name.to_string(),
        path,
        before,
        after,
        description,
    }
}

/// 1. Wrap unprefixed `{{…}}` values with `=`. Base 95; lowered to 65 when
/// the raw value is itself valid JSON and might be an intentional literal.
fn expression_format(workflow: &Workflow, findings: &[&Finding], fixes: &mut Vec<FixOperation>) {
    for finding in findings
        .iter()
        .filter(|f| f.code == codes::EXPRESSION_MISSING_PREFIX)
    {
        let (Some(node_name), Some(path), Some(context)) =
            (&finding.node_name, &finding.path, &finding.context)
        else {
            continue;
        };
        if !workflow.has_node(node_name) {
            continue;
        }
        let before = context.get("value").cloned().unwrap_or(Value::Null);
        let after = context.get("expected").cloned().unwrap_or(Value::Null);

        let looks_like_json_literal = before
            .as_str()
            .map(|raw| serde_json::from_str::<Value>(raw).is_ok())
            .unwrap_or(false);
        let score = if looks_like_json_literal { 65 } else { 95 };

        fixes.push(scored(
            FixType::ExpressionFormat,
            score,
            node_name,
            Some(path.clone()),
            before,
            after,
            format!("prefix expression at {path} with '='"),
        ));
    }
}

/// 2. Replace unknown node types with the top similarity suggestion.
/// High at similarity >= 0.9, medium from 0.75, not offered below.
fn node_type_correction(
    findings: &[&Finding],
    fixes: &mut Vec<FixOperation>,
    guidance: &mut Vec<PostUpdateGuidance>,
) {
    for finding in findings
        .iter()
        .filter(|f| f.code == codes::INVALID_NODE_TYPE_FORMAT)
    {
        let Some(node_name) = &finding.node_name else {
            continue;
        };
        let Some(best) = finding.suggestions.first() else {
            continue;
        };
        if best.confidence < 0.75 {
            continue;
        }
        let score = (best.confidence * 100.0).round().min(100.0) as u8;
        let after = best.value.clone();
        fixes.push(scored(
            FixType::NodeTypeCorrection,
            score,
            node_name,
            None,
            Value::Null,
            after.clone(),
            format!("correct node type to {after}"),
        ));
        guidance.push(PostUpdateGuidance {
            node_name: node_name.clone(),
            required_actions: vec![format!(
                "confirm the parameters of '{node_name}' match the {after} schema"
            )],
            behavior_changes: Vec::new(),
            estimated_minutes: 2,
            status: GuidanceStatus::Partial,
        });
    }
}

/// 3. Synthesize a unique path for webhooks that have none.
fn webhook_missing_path(findings: &[&Finding], fixes: &mut Vec<FixOperation>) {
    for finding in findings
        .iter()
        .filter(|f| f.code == codes::WEBHOOK_MISSING_PATH)
    {
        let Some(node_name) = &finding.node_name else {
            continue;
        };
        let path_value = Uuid::new_v4().to_string();
        let mut fix = scored(
            FixType::WebhookMissingPath,
            75,
            node_name,
            Some("path".to_string()),
            Value::String(String::new()),
            Value::String(path_value),
            "generate a webhook path".to_string(),
        );
        // Path synthesis is safe regardless of the numeric score.
        fix.confidence = Confidence::High;
        fixes.push(fix);
    }
}

/// 4. Upgrade legacy switch rule containers to the v3 schema.
fn switch_options(workflow: &Workflow, fixes: &mut Vec<FixOperation>) {
    for node in &workflow.nodes {
        if short_alias(&node.node_type) != "switch" || node.type_version < 3.0 {
            continue;
        }
        let Some(rules) = node.parameters.get("rules") else {
            continue;
        };
        // Pre-v3 exports keep the case list under rules.rules.
        let Some(legacy) = rules.get("rules").and_then(Value::as_array) else {
            continue;
        };
        if rules.get("values").is_some() {
            continue;
        }
        let after = json!({ "values": legacy });
        fixes.push(scored(
            FixType::SwitchOptions,
            88,
            &node.name,
            Some("rules".to_string()),
            rules.clone(),
            after,
            "migrate switch rules to the v3 values schema".to_string(),
        ));
    }
}

/// 5. Clamp typeVersion down to the latest the catalog knows.
fn typeversion_correction(findings: &[&Finding], fixes: &mut Vec<FixOperation>) {
    for finding in findings
        .iter()
        .filter(|f| f.code == codes::TYPEVERSION_EXCEEDS_LATEST)
    {
        let Some(node_name) = &finding.node_name else {
            continue;
        };
        let Some(after) = finding.suggestions.first().map(|s| s.value.clone()) else {
            continue;
        };
        fixes.push(scored(
            FixType::TypeversionCorrection,
            70,
            node_name,
            None,
            Value::Null,
            after,
            "clamp typeVersion to the latest supported version".to_string(),
        ));
    }
}

/// 6. Remove onError from nodes whose schema has no error output.
fn error_output_config(
    workflow: &Workflow,
    findings: &[&Finding],
    fixes: &mut Vec<FixOperation>,
) {
    for finding in findings
        .iter()
        .filter(|f| f.code == codes::UNSUPPORTED_ERROR_OUTPUT)
    {
        let Some(node_name) = &finding.node_name else {
            continue;
        };
        let before = workflow
            .node(node_name)
            .and_then(|n| n.on_error.clone())
            .map(Value::String)
            .unwrap_or(Value::Null);
        fixes.push(scored(
            FixType::ErrorOutputConfig,
            70,
            node_name,
            None,
            before,
            Value::Null,
            "remove unsupported onError setting".to_string(),
        ));
    }
}

/// 7. Raise outdated typeVersions to the latest. Medium when the catalog
/// records no breaking changes for the jump, low otherwise.
fn typeversion_upgrade(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
    fixes: &mut Vec<FixOperation>,
    guidance: &mut Vec<PostUpdateGuidance>,
) -> Result<()> {
    for node in &workflow.nodes {
        let Some(record) = catalog.lookup(&node.node_type)? else {
            continue;
        };
        if node.type_version >= record.latest_version {
            continue;
        }
        let changes =
            catalog.breaking_changes(&record.node_type, node.type_version, record.latest_version)?;
        let blocking: Vec<_> = changes.iter().filter(|c| !c.auto_migratable).collect();
        let score = if blocking.is_empty() { 65 } else { 45 };

        fixes.push(scored(
            FixType::TypeversionUpgrade,
            score,
            &node.name,
            None,
            json!(node.type_version),
            json!(record.latest_version),
            format!(
                "upgrade typeVersion {} -> {}",
                node.type_version, record.latest_version
            ),
        ));

        if !changes.is_empty() {
            let required_actions: Vec<String> = blocking
                .iter()
                .filter(|c| !c.migration_hint.is_empty())
                .map(|c| c.migration_hint.clone())
                .collect();
            let behavior_changes: Vec<String> =
                changes.iter().map(|c| c.description.clone()).collect();
            let status = if required_actions.is_empty() {
                GuidanceStatus::Complete
            } else {
                GuidanceStatus::Partial
            };
            guidance.push(PostUpdateGuidance {
                node_name: node.name.clone(),
                estimated_minutes: 3 * changes.len() as u32,
                required_actions,
                behavior_changes,
                status,
            });
        }
    }
    Ok(())
}

/// 8. Guidance-only: surface migration steps for upgrades with high-severity
/// changes. Never mutates the workflow.
fn version_migration(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
    guidance: &mut Vec<PostUpdateGuidance>,
) -> Result<()> {
    for node in &workflow.nodes {
        let Some(record) = catalog.lookup(&node.node_type)? else {
            continue;
        };
        if node.type_version >= record.latest_version {
            continue;
        }
        let changes =
            catalog.breaking_changes(&record.node_type, node.type_version, record.latest_version)?;
        let severe: Vec<_> = changes
            .iter()
            .filter(|c| c.severity == ChangeSeverity::High && !c.auto_migratable)
            .collect();
        if severe.is_empty() {
            continue;
        }
        guidance.push(PostUpdateGuidance {
            node_name: node.name.clone(),
            required_actions: severe
                .iter()
                .map(|c| {
                    if c.migration_hint.is_empty() {
                        format!("review '{}' after upgrading: {}", node.name, c.description)
                    } else {
                        c.migration_hint.clone()
                    }
                })
                .collect(),
            behavior_changes: severe.iter().map(|c| c.description.clone()).collect(),
            estimated_minutes: 5 * severe.len() as u32,
            status: GuidanceStatus::ManualOnly,
        });
    }
    Ok(())
}
