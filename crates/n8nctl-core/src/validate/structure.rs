//! Structural checks: workflow metadata, node identity, trigger presence.

use std::collections::HashSet;

use crate::error::Result;
use crate::validate::{codes, Ctx, Finding, FindingCategory};

pub(crate) fn run(ctx: &mut Ctx<'_>, findings: &mut Vec<Finding>) -> Result<()> {
    let workflow = ctx.workflow;

    if workflow.name.trim().is_empty() {
        findings.push(Finding::error(
            FindingCategory::Structure,
            codes::MISSING_WORKFLOW_NAME,
            "workflow has no name",
        ));
    }

    if workflow.nodes.is_empty() {
        findings.push(Finding::error(
            FindingCategory::Structure,
            codes::EMPTY_WORKFLOW,
            "workflow contains no nodes",
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if node.name.trim().is_empty() {
            findings.push(Finding::error(
                FindingCategory::Structure,
                codes::MISSING_NODE_NAME,
                "node has an empty name",
            ));
            continue;
        }
        if !seen.insert(node.name.as_str()) {
            findings.push(
                Finding::error(
                    FindingCategory::Structure,
                    codes::DUPLICATE_NODE_NAME,
                    format!("node name '{}' is used more than once", node.name),
                )
                .on_node(&node.name),
            );
        }
        if node.node_type.trim().is_empty() {
            findings.push(
                Finding::error(
                    FindingCategory::Structure,
                    codes::MISSING_NODE_TYPE,
                    format!("node '{}' has no type", node.name),
                )
                .on_node(&node.name),
            );
        }
        if node.position.is_none() {
            findings.push(
                Finding::error(
                    FindingCategory::Structure,
                    codes::MISSING_NODE_POSITION,
                    format!("node '{}' has no canvas position", node.name),
                )
                .on_node(&node.name),
            );
        }
    }

    // Statistics gathered here so every later stage can rely on them.
    ctx.statistics.total_nodes = workflow.nodes.len();
    ctx.statistics.enabled_nodes = workflow.nodes.iter().filter(|n| !n.disabled).count();
    ctx.statistics.trigger_nodes = workflow
        .nodes
        .iter()
        .filter(|n| {
            ctx.record(&n.name)
                .map(|r| r.is_trigger)
                .unwrap_or_else(|| n.node_type.to_ascii_lowercase().contains("trigger"))
        })
        .count();

    if !workflow.nodes.is_empty() && ctx.statistics.trigger_nodes == 0 {
        findings.push(
            Finding::warning(
                FindingCategory::Structure,
                codes::MISSING_TRIGGER,
                "workflow has no trigger node and can only be run manually",
            )
            .with_hint("add a trigger (webhook, schedule, chat) as the entry point"),
        );
    }

    Ok(())
}
