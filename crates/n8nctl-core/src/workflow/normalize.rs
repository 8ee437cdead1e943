//! Workflow normalization.
//!
//! Runs after parsing and before validation: trims node names (rewriting
//! connection references to match), expands short node types against the
//! knowledge base, and sanitizes the legacy option quirks conditional nodes
//! accumulated across schema generations.

use serde_json::Value;

use n8nctl_kb::{short_alias, NodeCatalog};

use crate::error::Result;
use crate::workflow::Workflow;

/// Conditional node aliases whose `options` carry legacy quirks.
const CONDITIONAL_ALIASES: &[&str] = &["if", "switch"];

pub fn normalize(workflow: &mut Workflow, catalog: &dyn NodeCatalog) -> Result<()> {
    trim_node_names(workflow);
    expand_short_types(workflow, catalog)?;
    sanitize_conditional_options(workflow);
    Ok(())
}

/// Trim whitespace around node names, keeping connection endpoints in sync.
fn trim_node_names(workflow: &mut Workflow) {
    let mut renames: Vec<(String, String)> = Vec::new();
    for node in &mut workflow.nodes {
        let trimmed = node.name.trim();
        if trimmed != node.name {
            renames.push((node.name.clone(), trimmed.to_string()));
            node.name = trimmed.to_string();
        }
    }
    for (old, new) in renames {
        if let Some(ports) = workflow.connections.remove(&old) {
            workflow.connections.insert(new.clone(), ports);
        }
        for ports in workflow.connections.values_mut() {
            for slots in ports.values_mut() {
                for endpoints in slots.iter_mut() {
                    for endpoint in endpoints {
                        if endpoint.node == old {
                            endpoint.node = new.clone();
                        }
                    }
                }
            }
        }
    }
}

/// Expand `httpRequest` style short types to their qualified form. Unknown
/// types are left alone; the validator reports them with suggestions.
fn expand_short_types(workflow: &mut Workflow, catalog: &dyn NodeCatalog) -> Result<()> {
    for node in &mut workflow.nodes {
        if !node.node_type.contains('.') && !node.node_type.trim().is_empty() {
            if let Some(record) = catalog.lookup(node.node_type.trim())? {
                node.node_type = record.node_type;
            }
        }
    }
    Ok(())
}

/// Conditional nodes went through several option schema generations; older
/// exports carry string booleans and null placeholders inside `options`.
fn sanitize_conditional_options(workflow: &mut Workflow) {
    for node in &mut workflow.nodes {
        if !CONDITIONAL_ALIASES.contains(&short_alias(&node.node_type)) {
            continue;
        }
        for key in ["options", "conditions"] {
            if let Some(container) = node.parameters.get_mut(key) {
                sanitize_options_value(container);
            }
        }
    }
}

fn sanitize_options_value(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };
    let keys: Vec<String> = map.keys().cloned().collect();
    for key in keys {
        match map.get(&key) {
            Some(Value::Null) => {
                map.remove(&key);
            }
            Some(Value::String(s)) if s == "true" || s == "false" => {
                let flag = s == "true";
                map.insert(key, Value::Bool(flag));
            }
            Some(Value::Object(_)) => {
                if let Some(child) = map.get_mut(&key) {
                    sanitize_options_value(child);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use n8nctl_kb::StaticCatalog;
    use serde_json::json;

    fn normalized(input: Value) -> Workflow {
        let mut workflow: Workflow = serde_json::from_value(input).unwrap();
        let catalog = StaticCatalog::with_fixtures();
        normalize(&mut workflow, &catalog).unwrap();
        workflow
    }

    #[test]
    fn trims_names_and_rewrites_connections() {
        let workflow = normalized(json!({
            "name": "Trim",
            "nodes": [
                {"name": " Webhook ", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {}},
                {"name": "Set", "type": "n8n-nodes-base.set", "typeVersion": 3.4,
                 "position": [200, 0], "parameters": {}}
            ],
            "connections": {
                " Webhook ": {"main": [[{"node": "Set", "type": "main", "index": 0}]]},
                "Set": {"main": [[{"node": " Webhook ", "type": "main", "index": 0}]]}
            }
        }));
        assert!(workflow.has_node("Webhook"));
        assert!(workflow.connections.contains_key("Webhook"));
        let endpoints: Vec<_> = workflow.endpoints().collect();
        assert!(endpoints.iter().all(|(_, _, _, e)| e.node != " Webhook "));
    }

    #[test]
    fn expands_short_types() {
        let workflow = normalized(json!({
            "name": "Short",
            "nodes": [
                {"name": "Fetch", "type": "httpRequest", "typeVersion": 4.2,
                 "position": [0, 0], "parameters": {"url": "https://example.com"}},
                {"name": "Agent", "type": "agent", "typeVersion": 2.1,
                 "position": [200, 0], "parameters": {}}
            ],
            "connections": {}
        }));
        assert_eq!(workflow.nodes[0].node_type, "n8n-nodes-base.httpRequest");
        assert_eq!(workflow.nodes[1].node_type, "@n8n/n8n-nodes-langchain.agent");
    }

    #[test]
    fn unknown_short_type_is_left_for_the_validator() {
        let workflow = normalized(json!({
            "name": "Unknown",
            "nodes": [
                {"name": "Odd", "type": "definitelyNotANode", "typeVersion": 1,
                 "position": [0, 0], "parameters": {}}
            ],
            "connections": {}
        }));
        assert_eq!(workflow.nodes[0].node_type, "definitelyNotANode");
    }

    #[test]
    fn sanitizes_legacy_conditional_options() {
        let workflow = normalized(json!({
            "name": "Legacy",
            "nodes": [
                {"name": "IF", "type": "n8n-nodes-base.if", "typeVersion": 2.2,
                 "position": [0, 0],
                 "parameters": {
                     "conditions": {"options": {"caseSensitive": "true", "version": null}},
                     "options": {"looseTypeValidation": "false"}
                 }}
            ],
            "connections": {}
        }));
        let node = workflow.node("IF").unwrap();
        assert_eq!(
            node.parameter("conditions.options.caseSensitive"),
            Some(&json!(true))
        );
        assert_eq!(node.parameter("conditions.options.version"), None);
        assert_eq!(node.parameter("options.looseTypeValidation"), Some(&json!(false)));
    }
}
