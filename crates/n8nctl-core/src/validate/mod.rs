//! # Validation Engine
//!
//! Multi-pass static checker for workflow documents. The pipeline is a fixed
//! sequence of pure stage functions that accumulate [`Finding`]s; a profile
//! selects which findings surface and a mode selects which properties each
//! node is validated against. Output ordering is deterministic: node
//! declaration order, then property path, then code.

pub mod ai_topology;
pub mod codes;
pub mod connections;
pub mod expressions;
pub mod node_rules;
pub mod node_schema;
pub mod structure;
pub mod versions;

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use n8nctl_kb::{NodeCatalog, NodeTypeRecord};

use crate::error::Result;
use crate::workflow::Workflow;

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Suggestion,
    Info,
    Warning,
    Error,
}

/// Which subsystem produced a finding; drives profile filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCategory {
    Structure,
    Schema,
    NodeRule,
    Security,
    Deprecation,
    AiTopology,
    Connections,
    Expression,
    Version,
    BestPractice,
    ErrorHandling,
    Style,
}

/// A typed repair hint attached to a finding.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairHint {
    /// Replacement or corrected value
    pub value: Value,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    pub auto_fixable: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

/// One validation finding.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "kind")]
    pub severity: Severity,
    /// Stable machine-readable code (see [`codes`])
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Dot/bracket path into the node's `parameters`
    #[serde(rename = "property", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<RepairHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip)]
    pub category: FindingCategory,
}

impl Finding {
    pub fn new(
        severity: Severity,
        category: FindingCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            node_name: None,
            path: None,
            context: None,
            suggestions: Vec::new(),
            hint: None,
            category,
        }
    }

    pub fn error(category: FindingCategory, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, code, message)
    }

    pub fn warning(
        category: FindingCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, category, code, message)
    }

    pub fn info(category: FindingCategory, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, code, message)
    }

    pub fn on_node(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }

    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: RepairHint) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

/// Validation profile: which findings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Structural errors plus security and deprecation warnings
    Minimal,
    /// Errors that would fail at execution time (default)
    #[default]
    Runtime,
    /// Everything a machine consumer should see, including best practices
    AiFriendly,
    /// Everything, including error-handling and stylistic checks
    Strict,
}

impl Profile {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Some(Profile::Minimal),
            "runtime" => Some(Profile::Runtime),
            "ai-friendly" => Some(Profile::AiFriendly),
            "strict" => Some(Profile::Strict),
            _ => None,
        }
    }

    fn keeps(self, finding: &Finding) -> bool {
        use FindingCategory::*;
        if finding.severity == Severity::Error {
            return match self {
                Profile::Minimal => matches!(finding.category, Structure | Connections),
                Profile::Runtime => !matches!(finding.category, Version | ErrorHandling | Style),
                Profile::AiFriendly => !matches!(finding.category, ErrorHandling | Style),
                Profile::Strict => true,
            };
        }
        match self {
            Profile::Minimal => matches!(finding.category, Security | Deprecation),
            Profile::Runtime => matches!(finding.category, Security | Deprecation | Structure),
            Profile::AiFriendly => !matches!(finding.category, ErrorHandling | Style),
            Profile::Strict => true,
        }
    }
}

/// Validation mode: which properties each node is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only required properties currently visible under `displayOptions`
    Minimal,
    /// Properties reachable under the selected resource/operation (default)
    #[default]
    Operation,
    /// Every declared property regardless of display conditions
    Full,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Some(Mode::Minimal),
            "operation" => Some(Mode::Operation),
            "full" => Some(Mode::Full),
            _ => None,
        }
    }
}

/// Options for a validation run.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub profile: Profile,
    pub mode: Mode,
    /// Scan parameter strings for expression problems
    pub check_expressions: bool,
    /// Check typeVersion currency against the catalog
    pub check_versions: bool,
    /// Breaking changes below this severity are not reported
    pub version_severity_floor: n8nctl_kb::ChangeSeverity,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            mode: Mode::default(),
            check_expressions: true,
            check_versions: true,
            version_severity_floor: n8nctl_kb::ChangeSeverity::Low,
        }
    }
}

/// Aggregate workflow statistics reported with every validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_nodes: usize,
    pub enabled_nodes: usize,
    pub trigger_nodes: usize,
    pub valid_connections: usize,
    pub invalid_connections: usize,
    pub expressions_validated: usize,
}

/// Result of one validation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub statistics: Statistics,
    /// Human-oriented next steps distilled from the findings
    pub suggestions: Vec<String>,
}

/// Shared state passed to every stage.
pub(crate) struct Ctx<'a> {
    pub workflow: &'a Workflow,
    pub catalog: &'a dyn NodeCatalog,
    pub options: &'a ValidateOptions,
    /// Node name → resolved catalog record (None when unknown)
    pub records: HashMap<String, Option<NodeTypeRecord>>,
    /// Node name → declaration index, for deterministic ordering
    pub node_order: HashMap<String, usize>,
    pub statistics: Statistics,
}

impl<'a> Ctx<'a> {
    pub fn record(&self, node_name: &str) -> Option<&NodeTypeRecord> {
        self.records.get(node_name).and_then(|r| r.as_ref())
    }

    pub fn alias(&self, node_name: &str) -> Option<&str> {
        self.workflow
            .node(node_name)
            .map(|n| n8nctl_kb::short_alias(&n.node_type))
    }
}

/// Run the full validation pipeline.
pub fn validate(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
    options: &ValidateOptions,
) -> Result<ValidationResult> {
    let mut records = HashMap::new();
    let mut node_order = HashMap::new();
    for (index, node) in workflow.nodes.iter().enumerate() {
        node_order.insert(node.name.clone(), index);
        let record = if node.node_type.trim().is_empty() {
            None
        } else {
            catalog.lookup(&node.node_type)?
        };
        records.insert(node.name.clone(), record);
    }

    let mut ctx = Ctx {
        workflow,
        catalog,
        options,
        records,
        node_order,
        statistics: Statistics::default(),
    };

    let mut findings = Vec::new();
    structure::run(&mut ctx, &mut findings)?;
    node_schema::run(&mut ctx, &mut findings)?;
    node_rules::run(&mut ctx, &mut findings)?;
    ai_topology::run(&mut ctx, &mut findings)?;
    connections::run(&mut ctx, &mut findings)?;
    if options.check_expressions {
        expressions::run(&mut ctx, &mut findings)?;
    }
    if options.check_versions {
        versions::run(&mut ctx, &mut findings)?;
    }

    Ok(assemble(ctx, findings))
}

fn assemble(ctx: Ctx<'_>, mut findings: Vec<Finding>) -> ValidationResult {
    let profile = ctx.options.profile;
    findings.retain(|f| profile.keeps(f));

    // Deterministic order: declaration index, then path, then code.
    let order = &ctx.node_order;
    findings.sort_by(|a, b| {
        let ia = a
            .node_name
            .as_deref()
            .and_then(|n| order.get(n))
            .copied()
            .unwrap_or(usize::MAX);
        let ib = b
            .node_name
            .as_deref()
            .and_then(|n| order.get(n))
            .copied()
            .unwrap_or(usize::MAX);
        ia.cmp(&ib)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.code.cmp(b.code))
    });

    // Exact duplicates add no signal; distinct messages on one path stay.
    let mut seen = std::collections::HashSet::new();
    findings.retain(|f| seen.insert((f.code, f.node_name.clone(), f.path.clone(), f.message.clone())));

    let mut suggestions: Vec<String> = Vec::new();
    let fixable = findings
        .iter()
        .filter(|f| f.suggestions.iter().any(|s| s.auto_fixable))
        .count();
    if fixable > 0 {
        suggestions.push(format!(
            "{fixable} finding(s) are auto-fixable; run autofix to apply them"
        ));
    }
    if findings.iter().any(|f| f.code == codes::MISSING_TRIGGER) {
        suggestions.push("add a trigger node so the workflow can start".to_string());
    }

    let (errors, warnings): (Vec<Finding>, Vec<Finding>) = findings
        .into_iter()
        .partition(|f| f.severity == Severity::Error);

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
        statistics: ctx.statistics,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_parsing() {
        assert_eq!(Profile::parse("ai-friendly"), Some(Profile::AiFriendly));
        assert_eq!(Profile::parse("RUNTIME"), Some(Profile::Runtime));
        assert_eq!(Profile::parse("nope"), None);
        assert_eq!(Mode::parse("full"), Some(Mode::Full));
    }

    #[test]
    fn minimal_profile_keeps_security_warnings_only() {
        let security = Finding::warning(FindingCategory::Security, codes::SQL_INJECTION_RISK, "x");
        let style = Finding::warning(FindingCategory::Style, codes::DEFAULT_NODE_NAME, "x");
        assert!(Profile::Minimal.keeps(&security));
        assert!(!Profile::Minimal.keeps(&style));
    }

    #[test]
    fn runtime_profile_drops_version_errors() {
        let version = Finding::error(FindingCategory::Version, codes::TYPEVERSION_OUTDATED, "x");
        assert!(!Profile::Runtime.keeps(&version));
        assert!(Profile::AiFriendly.keeps(&version));
    }
}
