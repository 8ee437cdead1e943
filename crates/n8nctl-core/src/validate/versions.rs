//! typeVersion currency checks.
//!
//! Nodes behind the catalog's latest version get an advisory finding; known
//! breaking changes between the node's version and the latest are surfaced
//! with severity mapped low/medium/high → info/warning/error.

use serde_json::json;

use n8nctl_kb::ChangeSeverity;

use crate::error::Result;
use crate::validate::{codes, Ctx, Finding, FindingCategory, Severity};

pub(crate) fn run(ctx: &mut Ctx<'_>, findings: &mut Vec<Finding>) -> Result<()> {
    for node in &ctx.workflow.nodes {
        let Some(record) = ctx.record(&node.name) else {
            continue;
        };
        if node.type_version >= record.latest_version {
            continue;
        }

        let changes =
            ctx.catalog
                .breaking_changes(&record.node_type, node.type_version, record.latest_version)?;

        if changes.is_empty() {
            findings.push(
                Finding::info(
                    FindingCategory::Version,
                    codes::TYPEVERSION_OUTDATED,
                    format!(
                        "node '{}' is on typeVersion {} (latest is {}); the upgrade has no known breaking changes",
                        node.name, node.type_version, record.latest_version
                    ),
                )
                .on_node(&node.name),
            );
            continue;
        }

        for change in &changes {
            if change.severity < ctx.options.version_severity_floor {
                continue;
            }
            let severity = match change.severity {
                ChangeSeverity::Low => Severity::Info,
                ChangeSeverity::Medium => Severity::Warning,
                ChangeSeverity::High => Severity::Error,
            };
            let mut finding = Finding::new(
                severity,
                FindingCategory::Version,
                codes::BREAKING_CHANGE_PENDING,
                format!(
                    "node '{}' upgrade {} -> {} changes behavior: {}",
                    node.name, node.type_version, record.latest_version, change.description
                ),
            )
            .on_node(&node.name)
            .with_context(json!({
                "fromVersion": change.from_version,
                "toVersion": change.to_version,
                "severity": change.severity,
                "autoMigratable": change.auto_migratable,
            }));
            if !change.migration_hint.is_empty() {
                finding = finding.with_hint(&change.migration_hint);
            }
            findings.push(finding);
        }
    }
    Ok(())
}
