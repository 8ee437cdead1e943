//! # Autofix Engine
//!
//! Converts validation findings into concrete, confidence-ranked fix
//! operations. Fixes are previewable; applying them routes through the diff
//! engine so repairs share the same atomic path as explicit mutations, and
//! running autofix on an already-fixed workflow yields zero operations.

mod generators;

use serde::Serialize;
use serde_json::Value;

use n8nctl_kb::NodeCatalog;

use crate::diff::{self, DiffOperation, DiffOptions, DiffResult};
use crate::error::Result;
use crate::validate::ValidationResult;
use crate::workflow::Workflow;

/// The fix families the engine can produce, in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixType {
    ExpressionFormat,
    NodeTypeCorrection,
    WebhookMissingPath,
    SwitchOptions,
    TypeversionCorrection,
    ErrorOutputConfig,
    TypeversionUpgrade,
    VersionMigration,
}

impl FixType {
    pub const ALL: &'static [FixType] = &[
        FixType::ExpressionFormat,
        FixType::NodeTypeCorrection,
        FixType::WebhookMissingPath,
        FixType::SwitchOptions,
        FixType::TypeversionCorrection,
        FixType::ErrorOutputConfig,
        FixType::TypeversionUpgrade,
        FixType::VersionMigration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FixType::ExpressionFormat => "expression-format",
            FixType::NodeTypeCorrection => "node-type-correction",
            FixType::WebhookMissingPath => "webhook-missing-path",
            FixType::SwitchOptions => "switch-options",
            FixType::TypeversionCorrection => "typeversion-correction",
            FixType::ErrorOutputConfig => "error-output-config",
            FixType::TypeversionUpgrade => "typeversion-upgrade",
            FixType::VersionMigration => "version-migration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        FixType::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

/// Discrete confidence class; the numeric score stays on the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Score thresholds: >= 85 high, >= 60 medium, else low.
    pub fn from_score(score: u8) -> Self {
        if score >= 85 {
            Confidence::High
        } else if score >= 60 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

/// One concrete repair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixOperation {
    pub fix_type: FixType,
    pub confidence: Confidence,
    /// Numeric confidence 0–100
    pub score: u8,
    pub node_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub before: Value,
    pub after: Value,
    pub description: String,
}

/// Overall guidance status after a set of fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuidanceStatus {
    Complete,
    Partial,
    ManualOnly,
}

/// Manual follow-up guidance for a node whose type or version changed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdateGuidance {
    pub node_name: String,
    pub required_actions: Vec<String>,
    pub behavior_changes: Vec<String>,
    pub estimated_minutes: u32,
    pub status: GuidanceStatus,
}

/// Filters for a fix run.
#[derive(Debug, Clone)]
pub struct AutofixOptions {
    /// Minimum accepted confidence class
    pub min_confidence: Confidence,
    /// When set, only these generators contribute
    pub fix_types: Option<Vec<FixType>>,
    /// Cap on applied fixes; the rest are reported as skipped
    pub max_fixes: Option<usize>,
}

impl Default for AutofixOptions {
    fn default() -> Self {
        Self {
            min_confidence: Confidence::High,
            fix_types: None,
            max_fixes: None,
        }
    }
}

/// Planned repairs, before any mutation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofixPlan {
    pub operations: Vec<FixOperation>,
    pub skipped: Vec<FixOperation>,
    pub guidance: Vec<PostUpdateGuidance>,
}

/// Result of applying a plan.
#[derive(Debug)]
pub struct AutofixOutcome {
    pub workflow: Workflow,
    pub plan: AutofixPlan,
    pub diff: DiffResult,
}

/// Produce the fix plan for a validated workflow. Deterministic: generators
/// run in fixed order, candidates keep generation order.
pub fn plan(
    workflow: &Workflow,
    validation: &ValidationResult,
    catalog: &dyn NodeCatalog,
    options: &AutofixOptions,
) -> Result<AutofixPlan> {
    let mut candidates = Vec::new();
    let mut guidance = Vec::new();
    generators::run_all(workflow, validation, catalog, &mut candidates, &mut guidance)?;

    if let Some(enabled) = &options.fix_types {
        candidates.retain(|fix| enabled.contains(&fix.fix_type));
        guidance.retain(|g| {
            // Migration guidance follows its generator's enablement.
            g.status != GuidanceStatus::ManualOnly
                || enabled.contains(&FixType::VersionMigration)
        });
    }

    let (mut accepted, mut skipped): (Vec<FixOperation>, Vec<FixOperation>) = candidates
        .into_iter()
        .partition(|fix| fix.confidence >= options.min_confidence);

    if let Some(cap) = options.max_fixes {
        if accepted.len() > cap {
            let overflow = accepted.split_off(cap);
            skipped.extend(overflow);
        }
    }

    // Guidance only matters for fixes that will actually land.
    guidance.retain(|g| {
        g.status == GuidanceStatus::ManualOnly
            || accepted.iter().any(|fix| fix.node_name == g.node_name)
    });

    Ok(AutofixPlan {
        operations: accepted,
        skipped,
        guidance,
    })
}

/// Plan and apply in one step. Mutations route through the diff engine in
/// strict mode, so a failing fix leaves the workflow untouched.
pub fn apply(
    workflow: &Workflow,
    validation: &ValidationResult,
    catalog: &dyn NodeCatalog,
    options: &AutofixOptions,
) -> Result<AutofixOutcome> {
    let plan = plan(workflow, validation, catalog, options)?;
    let operations: Vec<DiffOperation> = plan.operations.iter().map(to_diff_operation).collect();
    let outcome = diff::apply(workflow, &operations, catalog, DiffOptions::default())?;
    Ok(AutofixOutcome {
        workflow: outcome.workflow,
        plan,
        diff: outcome.result,
    })
}

/// Every fix is expressible as a diff operation; this is the mapping.
pub fn to_diff_operation(fix: &FixOperation) -> DiffOperation {
    let mut updates = serde_json::Map::new();
    match fix.fix_type {
        FixType::ExpressionFormat | FixType::WebhookMissingPath | FixType::SwitchOptions => {
            let path = fix.path.clone().unwrap_or_default();
            updates.insert(format!("parameters.{path}"), fix.after.clone());
        }
        FixType::NodeTypeCorrection => {
            updates.insert("type".to_string(), fix.after.clone());
        }
        FixType::TypeversionCorrection | FixType::TypeversionUpgrade => {
            updates.insert("typeVersion".to_string(), fix.after.clone());
        }
        FixType::ErrorOutputConfig => {
            updates.insert("onError".to_string(), Value::Null);
        }
        FixType::VersionMigration => {
            // Guidance-only; produces no mutation.
        }
    }
    DiffOperation::UpdateNode {
        name: fix.node_name.clone(),
        updates,
    }
}
