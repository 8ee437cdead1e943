//! Expression syntax checks.
//!
//! The platform only evaluates `{{ … }}` templates when the containing
//! string starts with `=`. This stage walks every string leaf under each
//! node's `parameters` and reports missing prefixes (auto-fixable),
//! unbalanced braces, and references to unknown top-level variables.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::Result;
use crate::validate::{codes, Ctx, Finding, FindingCategory, RepairHint};
use crate::workflow::paths;

/// Top-level variables the platform exposes to expressions.
pub const VALID_ROOTS: &[&str] = &[
    "$json", "$node", "$workflow", "$vars", "$env", "$execution", "$item", "$items", "$now",
    "$today",
];

static ROOT_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[a-zA-Z_][a-zA-Z0-9_]*").expect("static regex"));

pub(crate) fn run(ctx: &mut Ctx<'_>, findings: &mut Vec<Finding>) -> Result<()> {
    for node in &ctx.workflow.nodes {
        let parameters = Value::Object(node.parameters.clone());
        let mut leaves = Vec::new();
        paths::walk_strings(&parameters, "", &mut leaves);

        for (path, text) in leaves {
            if !text.contains("{{") && !text.contains("}}") {
                continue;
            }
            ctx.statistics.expressions_validated += 1;
            check_leaf(&node.name, &path, text, findings);
        }
    }
    Ok(())
}

fn check_leaf(node_name: &str, path: &str, text: &str, findings: &mut Vec<Finding>) {
    if text.contains("{{") && !text.starts_with('=') {
        let expected = format!("={text}");
        findings.push(
            Finding::error(
                FindingCategory::Expression,
                codes::EXPRESSION_MISSING_PREFIX,
                format!(
                    "expression in '{node_name}' at {path} is missing the '=' prefix and will be passed through as literal text"
                ),
            )
            .on_node(node_name)
            .at_path(path)
            .with_context(json!({ "value": text, "expected": expected }))
            .with_suggestion(RepairHint {
                value: Value::String(expected.clone()),
                confidence: 0.95,
                auto_fixable: true,
                reason: "prefix the value with '=' so the platform evaluates it".into(),
            }),
        );
    }

    let opens = text.matches("{{").count();
    let closes = text.matches("}}").count();
    if opens != closes {
        findings.push(
            Finding::error(
                FindingCategory::Expression,
                codes::EXPRESSION_UNBALANCED,
                format!(
                    "expression in '{node_name}' at {path} has {opens} '{{{{' but {closes} '}}}}'"
                ),
            )
            .on_node(node_name)
            .at_path(path),
        );
        return;
    }

    // Check references inside each {{ ... }} body.
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}") else {
            break;
        };
        let body = &rest[start + 2..start + end];
        for reference in ROOT_REFERENCE.find_iter(body) {
            let root = reference.as_str();
            if !VALID_ROOTS.contains(&root) {
                findings.push(
                    Finding::error(
                        FindingCategory::Expression,
                        codes::EXPRESSION_INVALID_REFERENCE,
                        format!(
                            "expression in '{node_name}' at {path} references unknown variable '{root}'"
                        ),
                    )
                    .on_node(node_name)
                    .at_path(path)
                    .with_context(json!({ "reference": root, "validRoots": VALID_ROOTS })),
                );
            }
        }
        rest = &rest[start + end + 2..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, ValidateOptions, ValidationResult};
    use crate::workflow::Workflow;
    use n8nctl_kb::StaticCatalog;

    fn check(parameters: Value) -> ValidationResult {
        let workflow: Workflow = serde_json::from_value(json!({
            "name": "Expr",
            "nodes": [
                {"name": "Fetch", "type": "n8n-nodes-base.httpRequest", "typeVersion": 4.2,
                 "position": [0, 0], "parameters": parameters}
            ],
            "connections": {}
        }))
        .unwrap();
        let catalog = StaticCatalog::with_fixtures();
        validate(&workflow, &catalog, &ValidateOptions::default()).unwrap()
    }

    #[test]
    fn missing_prefix_is_fixable_with_expected_value() {
        let result = check(json!({"url": "{{ $json.endpoint }}"}));
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::EXPRESSION_MISSING_PREFIX)
            .expect("missing prefix error");
        assert_eq!(finding.path.as_deref(), Some("url"));
        let context = finding.context.as_ref().unwrap();
        assert_eq!(context["expected"], json!("={{ $json.endpoint }}"));
        assert!(finding.suggestions[0].auto_fixable);
        assert_eq!(result.statistics.expressions_validated, 1);
    }

    #[test]
    fn prefixed_expression_is_clean() {
        let result = check(json!({"url": "={{ $json.endpoint }}"}));
        assert!(!result
            .errors
            .iter()
            .any(|f| f.code == codes::EXPRESSION_MISSING_PREFIX));
    }

    #[test]
    fn unbalanced_braces_are_reported() {
        let result = check(json!({"url": "={{ $json.endpoint }"}));
        assert!(result
            .errors
            .iter()
            .any(|f| f.code == codes::EXPRESSION_UNBALANCED));
    }

    #[test]
    fn unknown_root_reference_is_reported() {
        let result = check(json!({"url": "={{ $input.endpoint }}"}));
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::EXPRESSION_INVALID_REFERENCE)
            .expect("invalid reference error");
        assert_eq!(finding.context.as_ref().unwrap()["reference"], json!("$input"));
    }

    #[test]
    fn known_roots_pass() {
        let result = check(json!({
            "url": "={{ $json.base }}",
            "options": {"headers": {"when": "={{ $now.toISO() }}"}}
        }));
        assert!(!result
            .errors
            .iter()
            .any(|f| f.code == codes::EXPRESSION_INVALID_REFERENCE));
        assert_eq!(result.statistics.expressions_validated, 2);
    }

    #[test]
    fn nested_parameters_are_scanned() {
        let result = check(json!({
            "url": "https://example.com",
            "options": {"queryParameters": {"parameters": [
                {"name": "id", "value": "{{ $json.id }}"}
            ]}}
        }));
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::EXPRESSION_MISSING_PREFIX)
            .expect("nested expression error");
        assert_eq!(
            finding.path.as_deref(),
            Some("options.queryParameters.parameters[0].value")
        );
    }
}
