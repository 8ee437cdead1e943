//! Node-family rule dispatchers.
//!
//! Beyond the generic schema checks, certain node families carry their own
//! rules: webhooks need a path, SQL nodes are scanned for injection-prone
//! query construction, code nodes for dangerous evaluation, and messaging
//! nodes for an addressable target.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use n8nctl_kb::short_alias;

use crate::error::Result;
use crate::validate::{codes, Ctx, Finding, FindingCategory, RepairHint};
use crate::workflow::Node;

pub(crate) fn run(ctx: &mut Ctx<'_>, findings: &mut Vec<Finding>) -> Result<()> {
    for node in &ctx.workflow.nodes {
        match short_alias(&node.node_type) {
            "httpRequest" => check_http(node, findings),
            "webhook" => check_webhook(node, findings),
            "code" => check_code(node, findings),
            "postgres" | "mySql" => check_sql(node, findings),
            "mongoDb" => check_mongo(node, findings),
            "slack" => check_messaging(node, findings),
            "googleSheets" => check_sheets(node, findings),
            // Any other node exposing an executeQuery operation gets the
            // same injection scan as the dedicated database clients.
            _ => {
                if param_str(node, "operation") == Some("executeQuery") {
                    check_sql(node, findings);
                }
            }
        }
    }
    Ok(())
}

fn param_str<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    node.parameters.get(name).and_then(Value::as_str)
}

fn check_http(node: &Node, findings: &mut Vec<Finding>) {
    if let Some(url) = param_str(node, "url") {
        let is_expression = url.starts_with('=') || url.contains("{{");
        if !is_expression && !url.starts_with("http://") && !url.starts_with("https://") {
            findings.push(
                Finding::warning(
                    FindingCategory::NodeRule,
                    codes::HTTP_INVALID_URL,
                    format!("node '{}' has a URL without an http(s) scheme", node.name),
                )
                .on_node(&node.name)
                .at_path("url"),
            );
        }
    }
}

fn check_webhook(node: &Node, findings: &mut Vec<Finding>) {
    let path = param_str(node, "path").unwrap_or("");
    if path.trim().is_empty() {
        findings.push(
            Finding::error(
                FindingCategory::NodeRule,
                codes::WEBHOOK_MISSING_PATH,
                format!("webhook node '{}' has no path", node.name),
            )
            .on_node(&node.name)
            .at_path("path")
            .with_suggestion(RepairHint {
                value: Value::Null,
                confidence: 0.75,
                auto_fixable: true,
                reason: "generate a unique webhook path".into(),
            }),
        );
    }
}

fn check_code(node: &Node, findings: &mut Vec<Finding>) {
    let language = param_str(node, "language").unwrap_or("javaScript");
    let source_param = if language == "python" { "pythonCode" } else { "jsCode" };
    let source = param_str(node, source_param).unwrap_or("");

    if source.trim().is_empty() {
        findings.push(
            Finding::warning(
                FindingCategory::NodeRule,
                codes::CODE_EMPTY,
                format!("code node '{}' has no source", node.name),
            )
            .on_node(&node.name)
            .at_path(source_param),
        );
        return;
    }

    if source.contains("eval(") || source.contains("exec(") || source.contains("Function(") {
        findings.push(
            Finding::warning(
                FindingCategory::Security,
                codes::CODE_DANGEROUS_EVAL,
                format!(
                    "code node '{}' evaluates dynamic code; this runs with workflow privileges",
                    node.name
                ),
            )
            .on_node(&node.name)
            .at_path(source_param),
        );
    }
}

/// Injection-prone query constructions. Conservative string heuristics: the
/// goal is to flag concatenated or templated SQL, not to parse it.
static SQL_RISKS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\$\{[^}]*\}").expect("static regex"),
            "template interpolation inside SQL",
        ),
        (
            Regex::new(r"\{\{[^}]*\}\}").expect("static regex"),
            "expression syntax inside SQL",
        ),
        (
            Regex::new(r"(?i)\bor\s+1\s*=\s*1\b").expect("static regex"),
            "tautology (OR 1=1)",
        ),
        (
            Regex::new(r"(?i)\bunion\s+select\b").expect("static regex"),
            "UNION SELECT",
        ),
        (
            Regex::new(r"(?i)\bdrop\s+(table|database)\b").expect("static regex"),
            "unguarded DROP",
        ),
        (
            Regex::new(r"(?i)\bdelete\s+from\s+\w+\s*(;|$)").expect("static regex"),
            "DELETE without WHERE",
        ),
    ]
});

static MYSQL_CONCAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bconcat\s*\(").expect("static regex"));

fn check_sql(node: &Node, findings: &mut Vec<Finding>) {
    let Some(query) = param_str(node, "query") else {
        return;
    };
    let body = query.strip_prefix('=').unwrap_or(query);

    if query.contains('`') && query.contains("${") {
        push_sql_risk(node, findings, "raw backtick interpolation");
    }
    for (pattern, label) in SQL_RISKS.iter() {
        if pattern.is_match(body) {
            push_sql_risk(node, findings, label);
        }
    }
    if short_alias(&node.node_type) == "mySql"
        && MYSQL_CONCAT.is_match(body)
        && (body.contains("{{") || body.contains("${"))
    {
        push_sql_risk(node, findings, "CONCAT() with interpolated variables");
    }
}

fn push_sql_risk(node: &Node, findings: &mut Vec<Finding>, label: &str) {
    findings.push(
        Finding::warning(
            FindingCategory::Security,
            codes::SQL_INJECTION_RISK,
            format!("node '{}' builds SQL with {label}", node.name),
        )
        .on_node(&node.name)
        .at_path("query")
        .with_hint("use query parameters instead of interpolating values into SQL"),
    );
}

fn check_mongo(node: &Node, findings: &mut Vec<Finding>) {
    // Mongo queries are JSON documents; templated fragments inside them get
    // the same injection treatment as SQL strings.
    if let Some(query) = param_str(node, "query") {
        if query.contains("{{") || query.contains("${") {
            push_sql_risk(node, findings, "templated query document");
        }
    }
}

fn check_messaging(node: &Node, findings: &mut Vec<Finding>) {
    let resource = param_str(node, "resource").unwrap_or("message");
    if resource != "message" {
        return;
    }
    let target_empty = node
        .parameters
        .get("channelId")
        .map(|v| match v {
            Value::String(s) => s.trim().is_empty(),
            Value::Object(map) => map
                .get("value")
                .and_then(Value::as_str)
                .map(|s| s.trim().is_empty())
                .unwrap_or(false),
            _ => false,
        })
        .unwrap_or(false);
    if target_empty {
        findings.push(
            Finding::error(
                FindingCategory::NodeRule,
                codes::MESSAGE_TARGET_MISSING,
                format!("node '{}' posts a message without a channel", node.name),
            )
            .on_node(&node.name)
            .at_path("channelId"),
        );
    }
}

fn check_sheets(node: &Node, findings: &mut Vec<Finding>) {
    for selector in ["documentId", "sheetName"] {
        if let Some(Value::String(s)) = node.parameters.get(selector) {
            if s.trim().is_empty() {
                findings.push(
                    Finding::error(
                        FindingCategory::NodeRule,
                        codes::PARAMETER_VALIDATION,
                        format!("node '{}' has an empty '{}'", node.name, selector),
                    )
                    .on_node(&node.name)
                    .at_path(selector),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, ValidateOptions, ValidationResult};
    use crate::workflow::Workflow;
    use n8nctl_kb::StaticCatalog;
    use serde_json::json;
    use test_case::test_case;

    fn check(node_type: &str, type_version: f64, parameters: Value) -> ValidationResult {
        let workflow: Workflow = serde_json::from_value(json!({
            "name": "Rules",
            "nodes": [
                {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "in"}},
                {"name": "Subject", "type": node_type, "typeVersion": type_version,
                 "position": [200, 0], "parameters": parameters}
            ],
            "connections": {}
        }))
        .unwrap();
        let catalog = StaticCatalog::with_fixtures();
        validate(&workflow, &catalog, &ValidateOptions::default()).unwrap()
    }

    #[test]
    fn webhook_without_path_is_fixable_error() {
        let workflow: Workflow = serde_json::from_value(json!({
            "name": "Hooks",
            "nodes": [
                {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {}}
            ],
            "connections": {}
        }))
        .unwrap();
        let catalog = StaticCatalog::with_fixtures();
        let result = validate(&workflow, &catalog, &ValidateOptions::default()).unwrap();
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::WEBHOOK_MISSING_PATH)
            .expect("webhook path error");
        assert!(finding.suggestions[0].auto_fixable);
    }

    #[test_case("SELECT * FROM users WHERE id = {{ $json.id }}", "expression syntax" ; "expression in sql")]
    #[test_case("SELECT * FROM t WHERE x = '1' OR 1=1", "tautology" ; "or one equals one")]
    #[test_case("SELECT a FROM t UNION SELECT password FROM users", "UNION SELECT" ; "union select")]
    #[test_case("DROP TABLE users", "unguarded DROP" ; "drop table")]
    #[test_case("DELETE FROM audit_log", "DELETE without WHERE" ; "bare delete")]
    fn sql_heuristics_flag_risky_queries(query: &str, label: &str) {
        let result = check(
            "n8n-nodes-base.postgres",
            2.6,
            json!({"operation": "executeQuery", "query": query}),
        );
        let hits: Vec<&str> = result
            .warnings
            .iter()
            .filter(|f| f.code == codes::SQL_INJECTION_RISK)
            .map(|f| f.message.as_str())
            .collect();
        assert!(
            hits.iter().any(|m| m.contains(label)),
            "expected {label} in {hits:?}"
        );
    }

    #[test]
    fn parameterized_query_is_clean() {
        let result = check(
            "n8n-nodes-base.postgres",
            2.6,
            json!({"operation": "executeQuery", "query": "SELECT * FROM users WHERE id = $1"}),
        );
        assert!(!result
            .warnings
            .iter()
            .any(|f| f.code == codes::SQL_INJECTION_RISK));
    }

    #[test]
    fn mysql_concat_with_variables_is_flagged() {
        let result = check(
            "n8n-nodes-base.mySql",
            2.4,
            json!({"operation": "executeQuery",
                   "query": "=SELECT CONCAT('user-', {{ $json.name }}) FROM users"}),
        );
        assert!(result
            .warnings
            .iter()
            .any(|f| f.code == codes::SQL_INJECTION_RISK && f.message.contains("CONCAT")));
    }

    #[test]
    fn generic_execute_query_nodes_get_the_sql_scan() {
        // A type outside the dispatch list still gets the injection scan
        // when it executes a query.
        let generic: Workflow = serde_json::from_value(json!({
            "name": "Generic",
            "nodes": [
                {"name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "in"}},
                {"name": "Query", "type": "n8n-nodes-base.googleBigQuery", "typeVersion": 2,
                 "position": [200, 0],
                 "parameters": {"operation": "executeQuery",
                                "query": "SELECT a FROM t UNION SELECT password FROM users"}}
            ],
            "connections": {}
        }))
        .unwrap();
        let catalog = StaticCatalog::with_fixtures();
        let generic_result = validate(&generic, &catalog, &ValidateOptions::default()).unwrap();
        assert!(generic_result
            .warnings
            .iter()
            .any(|f| f.code == codes::SQL_INJECTION_RISK));
    }

    #[test]
    fn code_eval_is_a_security_warning() {
        let result = check(
            "n8n-nodes-base.code",
            2.0,
            json!({"jsCode": "return eval($json.body.script)"}),
        );
        assert!(result
            .warnings
            .iter()
            .any(|f| f.code == codes::CODE_DANGEROUS_EVAL));
    }

    #[test]
    fn http_url_without_scheme_warns_in_default_profile() {
        // NodeRule warnings are hidden in runtime profile; errors only.
        let result = check(
            "n8n-nodes-base.httpRequest",
            4.2,
            json!({"url": "example.com/api"}),
        );
        assert!(!result
            .warnings
            .iter()
            .any(|f| f.code == codes::HTTP_INVALID_URL));

        let workflow: Workflow = serde_json::from_value(json!({
            "name": "Rules",
            "nodes": [
                {"name": "Fetch", "type": "n8n-nodes-base.httpRequest", "typeVersion": 4.2,
                 "position": [0, 0], "parameters": {"url": "example.com/api"}}
            ],
            "connections": {}
        }))
        .unwrap();
        let catalog = StaticCatalog::with_fixtures();
        let ai = validate(
            &workflow,
            &catalog,
            &ValidateOptions {
                profile: crate::validate::Profile::AiFriendly,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(ai.warnings.iter().any(|f| f.code == codes::HTTP_INVALID_URL));
    }
}
