//! The [`NodeCatalog`] trait and node type name resolution.
//!
//! Callers address nodes either by fully qualified type
//! (`n8n-nodes-base.httpRequest`) or by short alias (`httpRequest`). Aliases
//! resolve through a fixed set of recognized package prefixes; anything with
//! a dot is treated as already qualified.

use crate::error::Result;
use crate::types::{
    BreakingChange, NodeSearchHit, NodeTypeRecord, PropertySearchHit, TemplateRecord,
    TypeSuggestion,
};

/// Package prefixes a short alias may resolve against, in probe order.
pub const RECOGNIZED_PREFIXES: &[&str] = &["n8n-nodes-base", "@n8n/n8n-nodes-langchain"];

/// How a search query is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Any term may match (ranked)
    #[default]
    Or,
    /// All terms must match
    And,
    /// Edit-distance match against type, alias, and display name
    Fuzzy,
}

impl SearchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "or" => Some(SearchMode::Or),
            "and" => Some(SearchMode::And),
            "fuzzy" => Some(SearchMode::Fuzzy),
            _ => None,
        }
    }
}

/// Read-only access to the bundled node and template catalog.
///
/// The catalog handle is created once per process and shared; implementations
/// must be `Send + Sync`.
pub trait NodeCatalog: Send + Sync {
    /// Look up a node type by qualified name or short alias.
    fn lookup(&self, type_name: &str) -> Result<Option<NodeTypeRecord>>;

    /// Ranked search over display name, description, category, alias, type.
    fn search(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<NodeSearchHit>>;

    /// Search a node's property schemas.
    fn search_properties(
        &self,
        type_name: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PropertySearchHit>>;

    /// Suggestions for an unknown node type, best first.
    fn similar_types(&self, bad_type: &str, limit: usize) -> Result<Vec<TypeSuggestion>>;

    /// Breaking changes for a node crossing `(from, to]`.
    fn breaking_changes(&self, type_name: &str, from: f64, to: f64) -> Result<Vec<BreakingChange>>;

    /// Ranked search over the bundled workflow templates.
    fn search_templates(&self, query: &str, limit: usize) -> Result<Vec<TemplateRecord>>;

    /// Fetch one template by id.
    fn get_template(&self, id: i64) -> Result<Option<TemplateRecord>>;
}

/// Candidate qualified names for a user-supplied type string.
///
/// A name containing a dot is returned as-is; a bare alias expands to one
/// candidate per recognized prefix, probe order preserved.
pub fn qualified_candidates(type_name: &str) -> Vec<String> {
    let trimmed = type_name.trim();
    if trimmed.contains('.') {
        vec![trimmed.to_string()]
    } else {
        RECOGNIZED_PREFIXES
            .iter()
            .map(|prefix| format!("{prefix}.{trimmed}"))
            .collect()
    }
}

/// The short alias portion of a qualified type name.
pub fn short_alias(type_name: &str) -> &str {
    type_name
        .rsplit_once('.')
        .map(|(_, alias)| alias)
        .unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_passes_through() {
        assert_eq!(
            qualified_candidates("n8n-nodes-base.webhook"),
            vec!["n8n-nodes-base.webhook".to_string()]
        );
    }

    #[test]
    fn alias_expands_against_prefixes() {
        let candidates = qualified_candidates("webhook");
        assert_eq!(candidates.len(), RECOGNIZED_PREFIXES.len());
        assert_eq!(candidates[0], "n8n-nodes-base.webhook");
        assert_eq!(candidates[1], "@n8n/n8n-nodes-langchain.webhook");
    }

    #[test]
    fn short_alias_strips_package() {
        assert_eq!(short_alias("n8n-nodes-base.if"), "if");
        assert_eq!(short_alias("@n8n/n8n-nodes-langchain.agent"), "agent");
        assert_eq!(short_alias("bare"), "bare");
    }

    #[test]
    fn search_mode_parsing() {
        assert_eq!(SearchMode::parse("OR"), Some(SearchMode::Or));
        assert_eq!(SearchMode::parse("fuzzy"), Some(SearchMode::Fuzzy));
        assert_eq!(SearchMode::parse("bogus"), None);
    }
}
