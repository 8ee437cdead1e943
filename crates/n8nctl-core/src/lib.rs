//! # n8nctl Core
//!
//! The offline workflow engines: data model and parser, validation, autofix,
//! and surgical diff mutations. Everything here is synchronous and pure with
//! respect to process state; I/O lives in the store, api, and app crates.
//!
//! ## Components
//!
//! - [`workflow`]: typed workflow model, parser with repair, normalizer
//! - [`validate`]: profile/mode-driven multi-pass validation pipeline
//! - [`autofix`]: confidence-ranked repairs expressed as diff operations
//! - [`diff`]: the 17-operation mutation engine with atomic semantics
//! - [`error`]: engine error taxonomy with stable codes and sysexits classes
//!
//! ## Example
//!
//! ```rust
//! use n8nctl_core::workflow::parser::{parse, ParseOptions};
//! use n8nctl_core::validate::{validate, ValidateOptions};
//! use n8nctl_kb::StaticCatalog;
//!
//! let bytes = br#"{"name": "Demo", "nodes": [], "connections": {}}"#;
//! let parsed = parse(bytes, ParseOptions::default()).unwrap();
//! let catalog = StaticCatalog::with_fixtures();
//! let report = validate(&parsed.workflow, &catalog, &ValidateOptions::default()).unwrap();
//! assert!(!report.valid); // empty workflows fail structural checks
//! ```

pub mod autofix;
pub mod diff;
pub mod error;
pub mod validate;
pub mod workflow;

pub use error::{EngineError, ErrorClass, Result};
pub use workflow::{Endpoint, Node, Workflow};

/// Current version of the engine crates.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for the common engine types.
pub mod prelude {
    pub use crate::autofix::{AutofixOptions, Confidence, FixType};
    pub use crate::diff::{DiffOperation, DiffOptions, DiffResult};
    pub use crate::error::{EngineError, ErrorClass, Result};
    pub use crate::validate::{Mode, Profile, ValidateOptions, ValidationResult};
    pub use crate::workflow::{Endpoint, Node, Workflow};
    pub use serde_json::{json, Value};
}
