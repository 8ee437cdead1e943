//! # n8nctl Knowledge Base
//!
//! Read-only catalog of node type definitions and workflow templates,
//! bundled with the binary as a SQLite database and queried with ranked
//! (BM25), boolean, and fuzzy search.
//!
//! ## Core Concepts
//!
//! - [`NodeCatalog`]: the trait every engine component programs against
//! - [`SqliteCatalog`]: the production implementation over `nodes.db`
//! - [`StaticCatalog`]: in-memory implementation for tests and tooling
//! - [`similarity`]: edit-distance scoring behind node-type suggestions
//!
//! The catalog handle is created once per process and shared. FTS5
//! availability is detected on first use; substring search is the fallback
//! when the index is unavailable or a query trips FTS syntax.

pub mod catalog;
pub mod error;
pub mod similarity;
pub mod sqlite;
pub mod static_catalog;
pub mod types;

pub use catalog::{qualified_candidates, short_alias, NodeCatalog, SearchMode, RECOGNIZED_PREFIXES};
pub use error::{KbError, Result};
pub use similarity::{AUTO_FIX_THRESHOLD, SUGGESTION_FLOOR};
pub use sqlite::SqliteCatalog;
pub use static_catalog::{fixture_records, fixture_templates, StaticCatalog};
pub use types::{
    BreakingChange, ChangeSeverity, CredentialRequirement, DisplayOptions, NodeSearchHit,
    NodeTypeRecord, OperationDescriptor, PropertyDescriptor, PropertyKind, PropertySearchHit,
    TemplateRecord, TypeSuggestion,
};
