//! Record types stored in the node knowledge base.
//!
//! These mirror the node type descriptors the platform publishes: identity,
//! versioning, property schemas with conditional visibility, credential
//! requirements, the resource/operation taxonomy, and breaking-change
//! history. Records are read-only at runtime; the bundled database is built
//! ahead of time and shipped with the binary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag of a node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
    String,
    Number,
    Boolean,
    Options,
    MultiOptions,
    Collection,
    FixedCollection,
    ResourceLocator,
    Json,
    Expression,
    Notice,
}

impl PropertyKind {
    /// Whether the property carries user data (notices are display-only).
    pub fn holds_value(self) -> bool {
        !matches!(self, PropertyKind::Notice)
    }
}

/// Conditional-visibility predicate over sibling property values.
///
/// A property is visible when every `show` entry matches the current
/// parameter values and no `hide` entry does. Values are compared after
/// JSON normalization, so `1` and `1.0` match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Property is shown only when each named sibling has one of the values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub show: BTreeMap<String, Vec<Value>>,
    /// Property is hidden when any named sibling has one of the values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hide: BTreeMap<String, Vec<Value>>,
}

impl DisplayOptions {
    /// True when no predicate is configured.
    pub fn is_empty(&self) -> bool {
        self.show.is_empty() && self.hide.is_empty()
    }
}

/// Schema of a single node parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Parameter name as it appears under `parameters`
    pub name: String,
    /// Human-facing label
    #[serde(default)]
    pub display_name: String,
    /// Type tag
    pub kind: PropertyKind,
    /// Whether the platform requires a value when the property is visible
    #[serde(default)]
    pub required: bool,
    /// Default applied by the platform when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Conditional visibility predicate
    #[serde(default, skip_serializing_if = "DisplayOptions::is_empty")]
    pub display_options: DisplayOptions,
    /// Allowed values for `options` / `multiOptions` properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Short description from the node documentation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl PropertyDescriptor {
    /// Minimal descriptor used by fixtures and ingestion tools.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            kind,
            required: false,
            default: None,
            display_options: DisplayOptions::default(),
            options: Vec::new(),
            description: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn shown_when(mut self, sibling: impl Into<String>, values: Vec<Value>) -> Self {
        self.display_options.show.insert(sibling.into(), values);
        self
    }

    pub fn hidden_when(mut self, sibling: impl Into<String>, values: Vec<Value>) -> Self {
        self.display_options.hide.insert(sibling.into(), values);
        self
    }
}

/// One resource/operation pair a node dispatches on, with the parameters the
/// platform requires for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Resource selector value (empty for nodes without resources)
    #[serde(default)]
    pub resource: String,
    /// Operation selector value
    pub operation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Parameter names required for this operation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_parameters: Vec<String>,
}

/// Credential kind a node accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequirement {
    /// Credential type name, e.g. `httpBasicAuth`
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// Severity of a breaking change between two type versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSeverity {
    Low,
    Medium,
    High,
}

/// A recorded behavioral change between two versions of a node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingChange {
    /// Version the change applies from (exclusive lower bound)
    pub from_version: f64,
    /// Version the change lands in (inclusive upper bound)
    pub to_version: f64,
    pub severity: ChangeSeverity,
    pub description: String,
    /// Whether the autofix engine can migrate the node automatically
    #[serde(default)]
    pub auto_migratable: bool,
    /// Manual migration instructions when not auto-migratable
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub migration_hint: String,
}

/// Full descriptor of a node type as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeRecord {
    /// Fully qualified type, e.g. `n8n-nodes-base.httpRequest`
    pub node_type: String,
    /// Short alias, e.g. `httpRequest`
    pub alias: String,
    pub display_name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subcategory: String,
    #[serde(default)]
    pub description: String,
    pub latest_version: f64,
    /// All versions the platform still accepts
    pub supported_versions: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OperationDescriptor>,
    /// True for trigger nodes (webhook, schedule, chat trigger, ...)
    #[serde(default)]
    pub is_trigger: bool,
    /// Whether the node schema accepts the `onError` setting
    #[serde(default)]
    pub supports_error_output: bool,
    /// Declared number of `main` outlets; `None` means determined by
    /// configuration (switch) or the default single outlet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_count: Option<u32>,
    /// Marked deprecated by the platform
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docs: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breaking_changes: Vec<BreakingChange>,
}

impl NodeTypeRecord {
    /// Whether `version` is newer than anything the catalog knows about.
    pub fn version_ahead(&self, version: f64) -> bool {
        version > self.latest_version
    }

    /// Operations filtered to a resource selector (empty matches all).
    pub fn operations_for_resource(&self, resource: &str) -> Vec<&OperationDescriptor> {
        self.operations
            .iter()
            .filter(|op| op.resource.is_empty() || op.resource == resource)
            .collect()
    }

    /// Breaking changes crossing the `(from, to]` version range, ordered by
    /// target version.
    pub fn changes_between(&self, from: f64, to: f64) -> Vec<&BreakingChange> {
        let mut hits: Vec<&BreakingChange> = self
            .breaking_changes
            .iter()
            .filter(|c| c.from_version >= from && c.to_version <= to && c.to_version > from)
            .collect();
        hits.sort_by(|a, b| {
            a.to_version
                .partial_cmp(&b.to_version)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.severity.cmp(&a.severity))
        });
        hits
    }
}

/// A node search result with its ranking score (higher is better).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSearchHit {
    pub node_type: String,
    pub display_name: String,
    pub category: String,
    pub description: String,
    pub score: f64,
}

/// A property search result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySearchHit {
    pub node_type: String,
    /// Dot path to the property within `parameters`
    pub path: String,
    pub name: String,
    pub kind: PropertyKind,
    pub description: String,
    pub score: f64,
}

/// Suggested replacement for an unknown node type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSuggestion {
    /// Fully qualified suggested type
    pub value: String,
    /// Similarity in `[0, 1]`
    pub confidence: f64,
    /// Why this suggestion ranked (alias match, edit distance, ...)
    pub reason: String,
    /// Confidence at or above the auto-fix threshold
    pub auto_fixable: bool,
}

/// A bundled workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Full workflow JSON ready to import
    pub workflow: Value,
    pub node_count: u32,
    #[serde(default)]
    pub views: u64,
    /// `simple` / `medium` / `complex`
    #[serde(default)]
    pub complexity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default)]
    pub setup_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_options_roundtrip() {
        let mut opts = DisplayOptions::default();
        opts.show
            .insert("resource".into(), vec![json!("message")]);
        let encoded = serde_json::to_string(&opts).unwrap();
        let decoded: DisplayOptions = serde_json::from_str(&encoded).unwrap();
        assert_eq!(opts, decoded);
    }

    #[test]
    fn changes_between_filters_and_orders() {
        let record = NodeTypeRecord {
            node_type: "n8n-nodes-base.switch".into(),
            alias: "switch".into(),
            display_name: "Switch".into(),
            category: "Core Nodes".into(),
            subcategory: String::new(),
            description: String::new(),
            latest_version: 3.2,
            supported_versions: vec![1.0, 2.0, 3.0, 3.1, 3.2],
            properties: vec![],
            credentials: vec![],
            operations: vec![],
            is_trigger: false,
            supports_error_output: true,
            output_count: None,
            deprecated: false,
            docs: String::new(),
            breaking_changes: vec![
                BreakingChange {
                    from_version: 2.0,
                    to_version: 3.0,
                    severity: ChangeSeverity::High,
                    description: "rules schema replaced".into(),
                    auto_migratable: false,
                    migration_hint: String::new(),
                },
                BreakingChange {
                    from_version: 1.0,
                    to_version: 2.0,
                    severity: ChangeSeverity::Low,
                    description: "output naming".into(),
                    auto_migratable: true,
                    migration_hint: String::new(),
                },
            ],
        };

        let hits = record.changes_between(1.0, 3.2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].to_version, 2.0);
        assert_eq!(hits[1].to_version, 3.0);

        let hits = record.changes_between(2.0, 3.2);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, ChangeSeverity::High);
    }
}
