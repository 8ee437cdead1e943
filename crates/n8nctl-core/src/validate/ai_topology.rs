//! AI subgraph topology checks.
//!
//! Runs when the workflow contains an agent, a basic LLM chain, a chat
//! trigger, or any `ai_*` connection. Walks the AI connection subgraph and
//! enforces the cardinality rules the platform applies at execution time:
//! language model counts, output parser presence, memory exclusivity,
//! streaming constraints, and tool descriptions.

use serde_json::Value;

use n8nctl_kb::short_alias;

use crate::error::Result;
use crate::validate::{codes, Ctx, Finding, FindingCategory};
use crate::workflow::{ports, Node};

pub(crate) fn run(ctx: &mut Ctx<'_>, findings: &mut Vec<Finding>) -> Result<()> {
    let has_ai_nodes = ctx.workflow.nodes.iter().any(|n| {
        matches!(
            short_alias(&n.node_type),
            "agent" | "chainLlm" | "chatTrigger"
        ) || n.node_type.starts_with("@n8n/n8n-nodes-langchain.")
    });
    let has_ai_connections = ctx
        .workflow
        .endpoints()
        .any(|(_, kind, _, _)| ports::is_ai(kind));
    if !has_ai_nodes && !has_ai_connections {
        return Ok(());
    }

    for node in &ctx.workflow.nodes {
        match short_alias(&node.node_type) {
            "agent" => check_agent(ctx, node, findings),
            "chainLlm" => check_chain(ctx, node, findings),
            _ => {}
        }
    }
    Ok(())
}

/// Incoming `ai_*` sources of a node, by kind.
fn ai_sources<'a>(ctx: &'a Ctx<'_>, target: &str, kind: &str) -> Vec<&'a str> {
    ctx.workflow
        .incoming(target)
        .into_iter()
        .filter(|(_, k, _)| *k == kind)
        .map(|(source, _, _)| source)
        .collect()
}

fn bool_param(node: &Node, name: &str) -> bool {
    node.parameters
        .get(name)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn check_agent(ctx: &Ctx<'_>, node: &Node, findings: &mut Vec<Finding>) {
    let models = ai_sources(ctx, &node.name, ports::AI_LANGUAGE_MODEL);
    let needs_fallback = bool_param(node, "needsFallback");
    let allowed_models = if needs_fallback { 2 } else { 1 };

    if models.is_empty() {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::MISSING_LANGUAGE_MODEL,
                format!(
                    "agent '{}' has no language model connected via {}",
                    node.name,
                    ports::AI_LANGUAGE_MODEL
                ),
            )
            .on_node(&node.name)
            .with_hint("connect a chat model node to the agent's language model inlet"),
        );
    } else if models.len() > allowed_models {
        let detail = if needs_fallback {
            "needsFallback allows at most two"
        } else {
            "exactly one is required"
        };
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::MULTIPLE_LANGUAGE_MODELS,
                format!(
                    "agent '{}' has {} language models connected; {detail}",
                    node.name,
                    models.len()
                ),
            )
            .on_node(&node.name),
        );
    }

    if bool_param(node, "hasOutputParser")
        && ai_sources(ctx, &node.name, ports::AI_OUTPUT_PARSER).is_empty()
    {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::MISSING_OUTPUT_PARSER,
                format!(
                    "agent '{}' sets hasOutputParser but no output parser is connected",
                    node.name
                ),
            )
            .on_node(&node.name)
            .at_path("hasOutputParser"),
        );
    }

    if ai_sources(ctx, &node.name, ports::AI_MEMORY).len() > 1 {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::MULTIPLE_MEMORY_CONNECTIONS,
                format!("agent '{}' has more than one memory connected", node.name),
            )
            .on_node(&node.name),
        );
    }

    check_streaming(ctx, node, findings);
    check_tools(ctx, &node.name, findings);
    check_prompt(node, findings);
}

/// Streaming agents respond through the chat channel: they must be fed by a
/// chat trigger and must not fan out through `main`.
fn check_streaming(ctx: &Ctx<'_>, node: &Node, findings: &mut Vec<Finding>) {
    let streaming = node
        .parameters
        .get("options")
        .and_then(|o| o.get("streaming"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !streaming {
        return;
    }

    let has_main_output = ctx
        .workflow
        .connections
        .get(&node.name)
        .and_then(|ports_map| ports_map.get(ports::MAIN))
        .map(|slots| slots.iter().any(|endpoints| !endpoints.is_empty()))
        .unwrap_or(false);
    if has_main_output {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::STREAMING_WITH_MAIN_OUTPUT,
                format!(
                    "agent '{}' streams its response and cannot also have main outputs",
                    node.name
                ),
            )
            .on_node(&node.name),
        );
    }

    let fed_by_chat_trigger = ctx
        .workflow
        .incoming(&node.name)
        .into_iter()
        .filter(|(_, kind, _)| *kind == ports::MAIN)
        .any(|(source, _, _)| ctx.alias(source) == Some("chatTrigger"));
    if !fed_by_chat_trigger {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::STREAMING_REQUIRES_CHAT_TRIGGER,
                format!(
                    "agent '{}' streams its response but is not fed by a chat trigger",
                    node.name
                ),
            )
            .on_node(&node.name),
        );
    }
}

fn check_tools(ctx: &Ctx<'_>, agent: &str, findings: &mut Vec<Finding>) {
    for tool in ai_sources(ctx, agent, ports::AI_TOOL) {
        let Some(tool_node) = ctx.workflow.node(tool) else {
            continue; // connection stage reports missing nodes
        };
        let description = tool_node
            .parameters
            .get("toolDescription")
            .and_then(Value::as_str)
            .unwrap_or("");
        if description.trim().is_empty() {
            findings.push(
                Finding::error(
                    FindingCategory::AiTopology,
                    codes::TOOL_MISSING_DESCRIPTION,
                    format!(
                        "tool '{}' connected to agent '{agent}' has no toolDescription",
                        tool_node.name
                    ),
                )
                .on_node(&tool_node.name)
                .at_path("toolDescription")
                .with_hint("the model chooses tools by their descriptions; describe what this tool does"),
            );
        }
    }
}

fn check_prompt(node: &Node, findings: &mut Vec<Finding>) {
    let prompt_type = node
        .parameters
        .get("promptType")
        .and_then(Value::as_str)
        .unwrap_or("auto");
    if prompt_type == "define" {
        let text = node
            .parameters
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("");
        if text.trim().is_empty() {
            findings.push(
                Finding::error(
                    FindingCategory::AiTopology,
                    codes::PROMPT_TEXT_MISSING,
                    format!(
                        "node '{}' uses promptType=define with empty prompt text",
                        node.name
                    ),
                )
                .on_node(&node.name)
                .at_path("text"),
            );
        }
    }
}

/// Basic LLM chains are single-model, tool-free constructs.
fn check_chain(ctx: &Ctx<'_>, node: &Node, findings: &mut Vec<Finding>) {
    let models = ai_sources(ctx, &node.name, ports::AI_LANGUAGE_MODEL);
    if models.is_empty() {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::MISSING_LANGUAGE_MODEL,
                format!("LLM chain '{}' has no language model connected", node.name),
            )
            .on_node(&node.name),
        );
    } else if models.len() > 1 {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::CHAIN_MULTIPLE_MODELS,
                format!(
                    "LLM chain '{}' has {} language models; chains take exactly one",
                    node.name,
                    models.len()
                ),
            )
            .on_node(&node.name),
        );
    }

    if !ai_sources(ctx, &node.name, ports::AI_TOOL).is_empty() {
        findings.push(
            Finding::error(
                FindingCategory::AiTopology,
                codes::CHAIN_WITH_TOOLS,
                format!(
                    "LLM chain '{}' has tools connected; only agents can use tools",
                    node.name
                ),
            )
            .on_node(&node.name),
        );
    }

    check_prompt(node, findings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, Profile, ValidateOptions, ValidationResult};
    use crate::workflow::Workflow;
    use n8nctl_kb::StaticCatalog;
    use serde_json::json;

    fn check(input: Value) -> ValidationResult {
        let workflow: Workflow = serde_json::from_value(input).unwrap();
        let catalog = StaticCatalog::with_fixtures();
        validate(
            &workflow,
            &catalog,
            &ValidateOptions {
                profile: Profile::AiFriendly,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn agent_workflow(agent_params: Value, connections: Value) -> Value {
        json!({
            "name": "AI",
            "nodes": [
                {"name": "Chat", "type": "@n8n/n8n-nodes-langchain.chatTrigger",
                 "typeVersion": 1.1, "position": [0, 0], "parameters": {}},
                {"name": "Agent", "type": "@n8n/n8n-nodes-langchain.agent",
                 "typeVersion": 2.1, "position": [200, 0], "parameters": agent_params},
                {"name": "Model", "type": "@n8n/n8n-nodes-langchain.lmChatOpenAi",
                 "typeVersion": 1.2, "position": [200, 200], "parameters": {}},
                {"name": "Model B", "type": "@n8n/n8n-nodes-langchain.lmChatOpenAi",
                 "typeVersion": 1.2, "position": [320, 200], "parameters": {}},
                {"name": "Tool", "type": "@n8n/n8n-nodes-langchain.toolHttpRequest",
                 "typeVersion": 1.1, "position": [440, 200],
                 "parameters": {"toolDescription": "", "url": "https://api.example.com"}},
                {"name": "Out", "type": "n8n-nodes-base.set", "typeVersion": 3.4,
                 "position": [400, 0], "parameters": {}}
            ],
            "connections": connections
        })
    }

    #[test]
    fn agent_without_model_is_missing_language_model() {
        let result = check(agent_workflow(
            json!({}),
            json!({
                "Chat": {"main": [[{"node": "Agent", "type": "main", "index": 0}]]}
            }),
        ));
        assert!(result
            .errors
            .iter()
            .any(|f| f.code == codes::MISSING_LANGUAGE_MODEL));
    }

    #[test]
    fn two_models_require_needs_fallback() {
        let connections = json!({
            "Chat": {"main": [[{"node": "Agent", "type": "main", "index": 0}]]},
            "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]},
            "Model B": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]}
        });

        let strict_one = check(agent_workflow(json!({}), connections.clone()));
        assert!(strict_one
            .errors
            .iter()
            .any(|f| f.code == codes::MULTIPLE_LANGUAGE_MODELS));

        let with_fallback = check(agent_workflow(json!({"needsFallback": true}), connections));
        assert!(!with_fallback
            .errors
            .iter()
            .any(|f| f.code == codes::MULTIPLE_LANGUAGE_MODELS));
    }

    #[test]
    fn output_parser_required_when_declared() {
        let result = check(agent_workflow(
            json!({"hasOutputParser": true}),
            json!({
                "Chat": {"main": [[{"node": "Agent", "type": "main", "index": 0}]]},
                "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]}
            }),
        ));
        assert!(result
            .errors
            .iter()
            .any(|f| f.code == codes::MISSING_OUTPUT_PARSER));
    }

    #[test]
    fn tool_without_description_is_an_error() {
        let result = check(agent_workflow(
            json!({}),
            json!({
                "Chat": {"main": [[{"node": "Agent", "type": "main", "index": 0}]]},
                "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]},
                "Tool": {"ai_tool": [[{"node": "Agent", "type": "ai_tool", "index": 0}]]}
            }),
        ));
        let finding = result
            .errors
            .iter()
            .find(|f| f.code == codes::TOOL_MISSING_DESCRIPTION)
            .expect("tool description error");
        assert_eq!(finding.node_name.as_deref(), Some("Tool"));
    }

    #[test]
    fn streaming_forbids_main_output_and_requires_chat_trigger() {
        // Streaming with a main outlet and no chat trigger: both errors.
        let result = check(agent_workflow(
            json!({"options": {"streaming": true}}),
            json!({
                "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]},
                "Agent": {"main": [[{"node": "Out", "type": "main", "index": 0}]]}
            }),
        ));
        assert!(result
            .errors
            .iter()
            .any(|f| f.code == codes::STREAMING_WITH_MAIN_OUTPUT));
        assert!(result
            .errors
            .iter()
            .any(|f| f.code == codes::STREAMING_REQUIRES_CHAT_TRIGGER));

        // Chat-fed, no main outlet: clean.
        let ok = check(agent_workflow(
            json!({"options": {"streaming": true}}),
            json!({
                "Chat": {"main": [[{"node": "Agent", "type": "main", "index": 0}]]},
                "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]}
            }),
        ));
        assert!(!ok.errors.iter().any(|f| {
            f.code == codes::STREAMING_WITH_MAIN_OUTPUT
                || f.code == codes::STREAMING_REQUIRES_CHAT_TRIGGER
        }));
    }

    #[test]
    fn define_prompt_requires_text() {
        let result = check(agent_workflow(
            json!({"promptType": "define", "text": "  "}),
            json!({
                "Chat": {"main": [[{"node": "Agent", "type": "main", "index": 0}]]},
                "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]}
            }),
        ));
        assert!(result
            .errors
            .iter()
            .any(|f| f.code == codes::PROMPT_TEXT_MISSING));
    }

    #[test]
    fn chain_rejects_tools() {
        let result = check(json!({
            "name": "Chain",
            "nodes": [
                {"name": "Chain", "type": "@n8n/n8n-nodes-langchain.chainLlm",
                 "typeVersion": 1.6, "position": [0, 0], "parameters": {}},
                {"name": "Model", "type": "@n8n/n8n-nodes-langchain.lmChatOpenAi",
                 "typeVersion": 1.2, "position": [0, 200], "parameters": {}},
                {"name": "Tool", "type": "@n8n/n8n-nodes-langchain.toolHttpRequest",
                 "typeVersion": 1.1, "position": [200, 200],
                 "parameters": {"toolDescription": "lookup", "url": "https://x.example"}}
            ],
            "connections": {
                "Model": {"ai_languageModel": [[{"node": "Chain", "type": "ai_languageModel", "index": 0}]]},
                "Tool": {"ai_tool": [[{"node": "Chain", "type": "ai_tool", "index": 0}]]}
            }
        }));
        assert!(result.errors.iter().any(|f| f.code == codes::CHAIN_WITH_TOOLS));
    }
}
