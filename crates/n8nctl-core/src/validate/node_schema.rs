//! Per-node schema checks against the knowledge base.
//!
//! Resolves each node's type descriptor, determines the property set that is
//! visible under the selected mode and `displayOptions`, and reports missing
//! required parameters with a schema delta and a minimal correct-usage
//! payload for the node's current resource/operation.

use serde_json::{json, Map, Value};

use n8nctl_kb::{NodeTypeRecord, PropertyDescriptor, PropertyKind};

use crate::error::Result;
use crate::validate::{codes, Ctx, Finding, FindingCategory, Mode, RepairHint, Severity};
use crate::workflow::Node;

pub(crate) fn run(ctx: &mut Ctx<'_>, findings: &mut Vec<Finding>) -> Result<()> {
    for node in &ctx.workflow.nodes {
        if node.node_type.trim().is_empty() {
            continue; // structure stage already reported it
        }
        match ctx.record(&node.name) {
            Some(record) => {
                let record = record.clone();
                check_known_node(ctx, node, &record, findings);
            }
            None => report_unknown_type(ctx, node, findings)?,
        }
    }
    Ok(())
}

fn report_unknown_type(ctx: &Ctx<'_>, node: &Node, findings: &mut Vec<Finding>) -> Result<()> {
    let suggestions = ctx.catalog.similar_types(&node.node_type, 5)?;
    let mut finding = Finding::error(
        FindingCategory::Schema,
        codes::INVALID_NODE_TYPE_FORMAT,
        format!(
            "node '{}' has unknown type '{}'",
            node.name, node.node_type
        ),
    )
    .on_node(&node.name);

    for suggestion in &suggestions {
        finding = finding.with_suggestion(RepairHint {
            value: Value::String(suggestion.value.clone()),
            confidence: suggestion.confidence,
            auto_fixable: suggestion.auto_fixable,
            reason: suggestion.reason.clone(),
        });
    }
    if let Some(best) = suggestions.first() {
        finding = finding.with_hint(format!("did you mean '{}'?", best.value));
    }
    findings.push(finding);
    Ok(())
}

fn check_known_node(
    ctx: &Ctx<'_>,
    node: &Node,
    record: &NodeTypeRecord,
    findings: &mut Vec<Finding>,
) {
    if record.deprecated {
        findings.push(
            Finding::warning(
                FindingCategory::Deprecation,
                codes::DEPRECATED_NODE,
                format!(
                    "node '{}' uses deprecated type '{}'",
                    node.name, record.node_type
                ),
            )
            .on_node(&node.name),
        );
    }

    if record.version_ahead(node.type_version) {
        findings.push(
            Finding::error(
                FindingCategory::Schema,
                codes::TYPEVERSION_EXCEEDS_LATEST,
                format!(
                    "node '{}' declares typeVersion {} but the latest known version is {}",
                    node.name, node.type_version, record.latest_version
                ),
            )
            .on_node(&node.name)
            .with_suggestion(RepairHint {
                value: json!(record.latest_version),
                confidence: 0.9,
                auto_fixable: true,
                reason: "clamp to the latest supported version".into(),
            }),
        );
    }

    if node.on_error.is_some() && !record.supports_error_output {
        findings.push(
            Finding::error(
                FindingCategory::Schema,
                codes::UNSUPPORTED_ERROR_OUTPUT,
                format!(
                    "node '{}' sets onError but type '{}' has no error output",
                    node.name, record.node_type
                ),
            )
            .on_node(&node.name)
            .with_suggestion(RepairHint {
                value: Value::Null,
                confidence: 0.7,
                auto_fixable: true,
                reason: "remove the onError setting".into(),
            }),
        );
    }

    let visible = visible_properties(node, record, ctx.options.mode);
    let missing: Vec<&PropertyDescriptor> = visible
        .iter()
        .copied()
        .filter(|p| p.required && !node.parameters.contains_key(&p.name))
        .collect();
    let extra: Vec<String> = node
        .parameters
        .keys()
        .filter(|key| !record.properties.iter().any(|p| p.name == **key))
        .cloned()
        .collect();

    if !missing.is_empty() {
        let delta = json!({
            "missing": missing.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
            "extra": extra,
        });
        let usage = correct_usage(node, record, &visible);
        for property in &missing {
            findings.push(
                Finding::error(
                    FindingCategory::Schema,
                    codes::PARAMETER_VALIDATION,
                    format!(
                        "node '{}' is missing required parameter '{}'",
                        node.name, property.name
                    ),
                )
                .on_node(&node.name)
                .at_path(&property.name)
                .with_context(json!({
                    "schemaDelta": delta.clone(),
                    "correctUsage": usage.clone(),
                })),
            );
        }
    }

    check_enum_values(node, record, &visible, findings);
    strict_extras(ctx, node, record, findings);
}

/// Properties validated for this node under the given mode.
fn visible_properties<'r>(
    node: &Node,
    record: &'r NodeTypeRecord,
    mode: Mode,
) -> Vec<&'r PropertyDescriptor> {
    record
        .properties
        .iter()
        .filter(|property| match mode {
            Mode::Full => true,
            Mode::Minimal => property.required && is_visible(node, record, property),
            Mode::Operation => is_visible(node, record, property),
        })
        .collect()
}

/// Evaluate `displayOptions` against the node's current parameter values,
/// falling back to schema defaults for absent siblings.
fn is_visible(node: &Node, record: &NodeTypeRecord, property: &PropertyDescriptor) -> bool {
    let value_of = |name: &str| -> Option<Value> {
        node.parameters.get(name).cloned().or_else(|| {
            record
                .properties
                .iter()
                .find(|p| p.name == name)
                .and_then(|p| p.default.clone())
        })
    };

    for (sibling, allowed) in &property.display_options.show {
        match value_of(sibling) {
            Some(actual) if allowed.iter().any(|v| json_eq(v, &actual)) => {}
            _ => return false,
        }
    }
    for (sibling, blocked) in &property.display_options.hide {
        if let Some(actual) = value_of(sibling) {
            if blocked.iter().any(|v| json_eq(v, &actual)) {
                return false;
            }
        }
    }
    true
}

/// Loose JSON equality: numbers compare by value, so `1` matches `1.0`.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Minimal valid `parameters` payload for the node's current selectors.
fn correct_usage(
    node: &Node,
    record: &NodeTypeRecord,
    visible: &[&PropertyDescriptor],
) -> Value {
    let mut usage = Map::new();

    // Keep the dispatch selectors the node already chose.
    for selector in ["resource", "operation"] {
        if let Some(value) = node.parameters.get(selector) {
            usage.insert(selector.to_string(), value.clone());
        }
    }

    for property in visible.iter().filter(|p| p.required) {
        let value = node
            .parameters
            .get(&property.name)
            .cloned()
            .or_else(|| property.default.clone())
            .unwrap_or_else(|| placeholder(property));
        usage.insert(property.name.clone(), value);
    }

    // Operation-level requirements may go beyond per-property flags.
    let resource = node
        .parameters
        .get("resource")
        .and_then(Value::as_str)
        .unwrap_or("");
    let operation = node.parameters.get("operation").and_then(Value::as_str);
    if let Some(operation) = operation {
        if let Some(descriptor) = record
            .operations_for_resource(resource)
            .into_iter()
            .find(|op| op.operation == operation)
        {
            for name in &descriptor.required_parameters {
                if !usage.contains_key(name) {
                    let value = record
                        .properties
                        .iter()
                        .find(|p| &p.name == name)
                        .map(|p| p.default.clone().unwrap_or_else(|| placeholder(p)))
                        .unwrap_or(Value::String(String::new()));
                    usage.insert(name.clone(), value);
                }
            }
        }
    }

    Value::Object(usage)
}

fn placeholder(property: &PropertyDescriptor) -> Value {
    match property.kind {
        PropertyKind::Number => json!(0),
        PropertyKind::Boolean => json!(false),
        PropertyKind::Options | PropertyKind::MultiOptions => property
            .options
            .first()
            .map(|o| Value::String(o.clone()))
            .unwrap_or_else(|| Value::String(String::new())),
        PropertyKind::Collection | PropertyKind::FixedCollection => json!({}),
        PropertyKind::Json => json!({}),
        _ => Value::String(String::new()),
    }
}

fn check_enum_values(
    node: &Node,
    _record: &NodeTypeRecord,
    visible: &[&PropertyDescriptor],
    findings: &mut Vec<Finding>,
) {
    for property in visible {
        if property.kind != PropertyKind::Options || property.options.is_empty() {
            continue;
        }
        let Some(value) = node.parameters.get(&property.name).and_then(Value::as_str) else {
            continue;
        };
        // Expressions resolve at runtime; nothing to check statically.
        if value.starts_with('=') {
            continue;
        }
        if !property.options.iter().any(|o| o == value) {
            findings.push(
                Finding::warning(
                    FindingCategory::Schema,
                    codes::PARAMETER_VALUE_NOT_ALLOWED,
                    format!(
                        "node '{}' sets '{}' to '{}', which is not one of the allowed values",
                        node.name, property.name, value
                    ),
                )
                .on_node(&node.name)
                .at_path(&property.name)
                .with_context(json!({ "allowed": property.options })),
            );
        }
    }
}

/// Checks that only surface in the strict profile.
fn strict_extras(
    ctx: &Ctx<'_>,
    node: &Node,
    record: &NodeTypeRecord,
    findings: &mut Vec<Finding>,
) {
    let fallible = matches!(
        n8nctl_kb::short_alias(&record.node_type),
        "httpRequest" | "postgres" | "mySql" | "mongoDb" | "slack" | "googleSheets"
    );
    if fallible && node.on_error.is_none() && !node.retry_on_fail {
        findings.push(
            Finding::warning(
                FindingCategory::ErrorHandling,
                codes::MISSING_ERROR_HANDLING,
                format!(
                    "node '{}' calls an external service without onError or retryOnFail",
                    node.name
                ),
            )
            .on_node(&node.name)
            .with_hint("set onError or retryOnFail so transient failures do not stop the workflow"),
        );
    }

    if node.name == record.display_name && ctx.workflow.nodes.len() > 1 {
        let mut finding = Finding::new(
            Severity::Suggestion,
            FindingCategory::Style,
            codes::DEFAULT_NODE_NAME,
            format!(
                "node '{}' keeps the default display name; a descriptive name helps debugging",
                node.name
            ),
        );
        finding.node_name = Some(node.name.clone());
        findings.push(finding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, Profile, ValidateOptions, ValidationResult};
    use crate::workflow::Workflow;
    use n8nctl_kb::StaticCatalog;

    fn check_with(input: Value, options: ValidateOptions) -> ValidationResult {
        let workflow: Workflow = serde_json::from_value(input).unwrap();
        let catalog = StaticCatalog::with_fixtures();
        validate(&workflow, &catalog, &options).unwrap()
    }

    fn check(input: Value) -> ValidationResult {
        check_with(input, ValidateOptions::default())
    }

    fn node_json(node_type: &str, type_version: f64, parameters: Value) -> Value {
        json!({
            "name": "Test",
            "nodes": [
                {"name": "Webhook In", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "in"}},
                {"name": "Subject", "type": node_type, "typeVersion": type_version,
                 "position": [200, 0], "parameters": parameters}
            ],
            "connections": {}
        })
    }

    #[test]
    fn unknown_type_gets_ranked_suggestions() {
        let result = check(node_json("webhok", 1.0, json!({})));
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::INVALID_NODE_TYPE_FORMAT)
            .expect("unknown type error");
        assert_eq!(finding.node_name.as_deref(), Some("Subject"));
        let best = finding.suggestions.first().expect("suggestion");
        assert_eq!(best.value, json!("n8n-nodes-base.webhook"));
        assert!(best.confidence >= 0.9);
        assert!(best.auto_fixable);
    }

    #[test]
    fn version_ahead_of_catalog_is_correctable() {
        let result = check(node_json("n8n-nodes-base.set", 9.0, json!({})));
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::TYPEVERSION_EXCEEDS_LATEST)
            .expect("version error");
        assert!(finding.suggestions[0].auto_fixable);
        assert_eq!(finding.suggestions[0].value, json!(3.4));
    }

    #[test]
    fn missing_required_parameter_reports_schema_delta() {
        let result = check(node_json("n8n-nodes-base.httpRequest", 4.2, json!({})));
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::PARAMETER_VALIDATION)
            .expect("parameter error");
        assert_eq!(finding.path.as_deref(), Some("url"));
        let context = finding.context.as_ref().unwrap();
        assert_eq!(context["schemaDelta"]["missing"], json!(["url"]));
        assert!(context["correctUsage"].get("url").is_some());
    }

    #[test]
    fn hidden_required_properties_are_not_demanded() {
        // jsCode is required but only visible for javaScript; python selected.
        let result = check(node_json(
            "n8n-nodes-base.code",
            2.0,
            json!({"language": "python", "pythonCode": "return items"}),
        ));
        assert!(
            !result.errors.iter().any(|f| f.path.as_deref() == Some("jsCode")),
            "jsCode must not be required when language=python"
        );
    }

    #[test]
    fn full_mode_demands_hidden_requireds_too() {
        let result = check_with(
            node_json(
                "n8n-nodes-base.code",
                2.0,
                json!({"language": "python", "pythonCode": "return items"}),
            ),
            ValidateOptions {
                mode: Mode::Full,
                ..Default::default()
            },
        );
        assert!(result
            .errors
            .iter()
            .any(|f| f.path.as_deref() == Some("jsCode")));
    }

    #[test]
    fn operation_mode_tracks_selected_operation() {
        // executeQuery requires `query`; insert does not.
        let missing = check(node_json(
            "n8n-nodes-base.postgres",
            2.6,
            json!({"operation": "executeQuery"}),
        ));
        assert!(missing
            .errors
            .iter()
            .any(|f| f.code == codes::PARAMETER_VALIDATION && f.path.as_deref() == Some("query")));

        let ok = check(node_json(
            "n8n-nodes-base.postgres",
            2.6,
            json!({"operation": "executeQuery", "query": "SELECT 1"}),
        ));
        assert!(!ok
            .errors
            .iter()
            .any(|f| f.path.as_deref() == Some("query")));
    }

    #[test]
    fn enum_value_outside_allowed_set_warns() {
        let result = check_with(
            node_json(
                "n8n-nodes-base.httpRequest",
                4.2,
                json!({"url": "https://example.com", "method": "FETCH"}),
            ),
            ValidateOptions {
                profile: Profile::AiFriendly,
                ..Default::default()
            },
        );
        assert!(result
            .warnings
            .iter()
            .any(|f| f.code == codes::PARAMETER_VALUE_NOT_ALLOWED));
    }

    #[test]
    fn on_error_on_unsupported_node_is_an_error() {
        let input = json!({
            "name": "Test",
            "nodes": [
                {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "x"}, "onError": "continueRegularOutput"}
            ],
            "connections": {}
        });
        let result = check(input);
        assert!(result
            .errors
            .iter()
            .any(|f| f.code == codes::UNSUPPORTED_ERROR_OUTPUT));
    }

    #[test]
    fn deprecated_node_warns_even_in_minimal_profile() {
        let input = json!({
            "name": "Old",
            "nodes": [
                {"name": "Start", "type": "n8n-nodes-base.start", "typeVersion": 1,
                 "position": [0, 0], "parameters": {}}
            ],
            "connections": {}
        });
        let result = check_with(
            input,
            ValidateOptions {
                profile: Profile::Minimal,
                ..Default::default()
            },
        );
        assert!(result.warnings.iter().any(|f| f.code == codes::DEPRECATED_NODE));
    }

    #[test]
    fn strict_profile_adds_error_handling_warnings() {
        let input = node_json(
            "n8n-nodes-base.httpRequest",
            4.2,
            json!({"url": "https://example.com"}),
        );
        let strict = check_with(
            input.clone(),
            ValidateOptions {
                profile: Profile::Strict,
                ..Default::default()
            },
        );
        assert!(strict
            .warnings
            .iter()
            .any(|f| f.code == codes::MISSING_ERROR_HANDLING));

        let runtime = check(input);
        assert!(!runtime
            .warnings
            .iter()
            .any(|f| f.code == codes::MISSING_ERROR_HANDLING));
    }
}
