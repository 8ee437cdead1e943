//! Connection graph integrity.
//!
//! Every endpoint must resolve to an existing node, `main` self-loops are
//! rejected, and conditional/switch outlet indices must stay inside the
//! node's declared outlet count. Cycles through AI connections are valid in
//! this domain and are not flagged here.

use serde_json::Value;

use n8nctl_kb::short_alias;

use crate::error::Result;
use crate::validate::{codes, Ctx, Finding, FindingCategory};
use crate::workflow::{ports, Node};

pub(crate) fn run(ctx: &mut Ctx<'_>, findings: &mut Vec<Finding>) -> Result<()> {
    let workflow = ctx.workflow;
    let mut valid = 0usize;
    let mut invalid = 0usize;
    let mut stale = 0usize;

    for (source, ports_map) in &workflow.connections {
        let source_exists = workflow.has_node(source);
        if !source_exists {
            stale += 1;
            findings.push(
                Finding::error(
                    FindingCategory::Connections,
                    codes::CONNECTION_UNKNOWN_SOURCE,
                    format!("connections reference unknown source node '{source}'"),
                ),
            );
        }

        for (kind, slots) in ports_map {
            if !ports::is_known(kind) {
                findings.push(
                    Finding::warning(
                        FindingCategory::Connections,
                        codes::UNKNOWN_CONNECTION_KIND,
                        format!("source '{source}' uses unknown connection kind '{kind}'"),
                    )
                    .on_node(source.clone()),
                );
            }

            if kind == ports::MAIN && source_exists {
                check_outlet_range(ctx, source, slots.len(), findings);
            }

            for endpoints in slots.iter() {
                for endpoint in endpoints {
                    if !workflow.has_node(&endpoint.node) {
                        invalid += 1;
                        stale += 1;
                        findings.push(
                            Finding::error(
                                FindingCategory::Connections,
                                codes::CONNECTION_UNKNOWN_TARGET,
                                format!(
                                    "connection from '{source}' targets unknown node '{}'",
                                    endpoint.node
                                ),
                            )
                            .on_node(source.clone()),
                        );
                        continue;
                    }
                    if kind == ports::MAIN && endpoint.node == *source {
                        invalid += 1;
                        findings.push(
                            Finding::error(
                                FindingCategory::Connections,
                                codes::SELF_LOOP_MAIN,
                                format!("node '{source}' connects its main output to itself"),
                            )
                            .on_node(source.clone()),
                        );
                        continue;
                    }
                    valid += 1;
                }
            }
        }
    }

    if stale > 0 {
        findings.push(
            Finding::warning(
                FindingCategory::Connections,
                codes::STALE_CONNECTIONS,
                format!("{stale} connection entr(ies) reference nodes that no longer exist"),
            )
            .with_hint("apply a cleanStaleConnections diff operation to drop them"),
        );
    }

    ctx.statistics.valid_connections = valid;
    ctx.statistics.invalid_connections = invalid;
    Ok(())
}

/// Outlet count limit for conditional and switch sources.
fn check_outlet_range(ctx: &Ctx<'_>, source: &str, used_slots: usize, findings: &mut Vec<Finding>) {
    let Some(node) = ctx.workflow.node(source) else {
        return;
    };
    let Some(limit) = declared_outlets(ctx, node) else {
        return;
    };
    if used_slots > limit {
        findings.push(
            Finding::error(
                FindingCategory::Connections,
                codes::OUTLET_INDEX_OUT_OF_RANGE,
                format!(
                    "node '{source}' uses {used_slots} main outlets but declares only {limit}"
                ),
            )
            .on_node(source),
        );
    }
}

/// How many `main` outlets a node exposes, when statically known.
pub(crate) fn declared_outlets(ctx: &Ctx<'_>, node: &Node) -> Option<usize> {
    if let Some(count) = ctx.record(&node.name).and_then(|r| r.output_count) {
        return Some(count as usize);
    }
    if short_alias(&node.node_type) == "switch" {
        return Some(switch_case_count(node));
    }
    None
}

/// Case count a switch node is configured for: its rules (plus a fallback
/// output when enabled), or the explicit output count in expression mode.
pub(crate) fn switch_case_count(node: &Node) -> usize {
    let mode = node
        .parameters
        .get("mode")
        .and_then(Value::as_str)
        .unwrap_or("rules");
    if mode == "expression" {
        return node
            .parameters
            .get("numberOutputs")
            .and_then(Value::as_u64)
            .unwrap_or(4) as usize;
    }

    let rule_count = node
        .parameters
        .get("rules")
        .and_then(|rules| rules.get("values"))
        .and_then(Value::as_array)
        .map(|values| values.len())
        .unwrap_or(0);
    let fallback = node
        .parameters
        .get("options")
        .and_then(|o| o.get("fallbackOutput"))
        .and_then(Value::as_str)
        .map(|v| v == "extra")
        .unwrap_or(false);
    rule_count.max(1) + usize::from(fallback)
}
