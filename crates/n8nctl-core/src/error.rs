//! # Engine Error Handling
//!
//! All engine operations return [`EngineError`]. Every error carries a stable
//! string code for machine consumers and maps to a POSIX `sysexits` class so
//! the command layer can derive process exit codes from the most severe
//! failure.
//!
//! ## Error Classes
//!
//! | Class | Exit | Meaning |
//! |-------|------|---------|
//! | Usage | 64 | Bad invocation, unknown operation |
//! | Data | 65 | Validation failures, malformed workflow JSON |
//! | NoInput | 66 | Input file missing |
//! | Unavailable | 69 | Remote instance unreachable |
//! | Software | 70 | Internal engine fault |
//! | Temporary | 71/75 | Rate limits and other transient failures |
//! | Protocol | 72 | Unexpected remote payloads |
//! | Permission | 73/77 | Auth failures, refused file permissions |
//! | Io | 74 | Filesystem and database faults |
//! | Config | 78 | Invalid configuration |

use thiserror::Error;

/// Coarse classification used for exit codes and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Usage,
    Data,
    NoInput,
    Unavailable,
    Software,
    Temporary,
    Protocol,
    CantCreate,
    Io,
    TempFail,
    Permission,
    Config,
    Cancelled,
}

impl ErrorClass {
    /// POSIX `sysexits` code for the class.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorClass::Usage => 64,
            ErrorClass::Data => 65,
            ErrorClass::NoInput => 66,
            ErrorClass::Unavailable => 69,
            ErrorClass::Software => 70,
            ErrorClass::Temporary => 71,
            ErrorClass::Protocol => 72,
            ErrorClass::CantCreate => 73,
            ErrorClass::Io => 74,
            ErrorClass::TempFail => 75,
            ErrorClass::Permission => 77,
            ErrorClass::Config => 78,
            ErrorClass::Cancelled => 1,
        }
    }

    /// Transient classes may succeed when the operation is retried.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorClass::Temporary | ErrorClass::TempFail | ErrorClass::Unavailable
        )
    }
}

/// Errors produced by the offline engines (parser, validator, autofix, diff,
/// version store plumbing).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Workflow JSON could not be parsed, even after repair when requested.
    #[error("failed to parse workflow JSON: {message}")]
    Parse {
        /// Parser diagnostic, with line/column where available
        message: String,
    },

    /// A workflow violated a structural invariant that prevents processing.
    #[error("invalid workflow: {message}")]
    InvalidWorkflow { message: String },

    /// A diff operation could not be applied.
    #[error("diff operation {index} ({operation}) failed: {message}")]
    DiffRejected {
        /// Zero-based position in the submitted operation list
        index: usize,
        /// Operation type name
        operation: String,
        message: String,
    },

    /// A referenced node does not exist in the workflow.
    #[error("node not found: {name}")]
    NodeNotFound { name: String },

    /// Input file is missing.
    #[error("no such file: {path}")]
    FileNotFound { path: String },

    /// Filesystem or database fault.
    #[error("I/O failure: {message}")]
    Io { message: String },

    /// Refused because of filesystem permissions (strict mode).
    #[error("permission check failed: {message}")]
    Permission { message: String },

    /// Knowledge base fault.
    #[error(transparent)]
    Kb(#[from] n8nctl_kb::KbError),

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// Operation aborted by a cancellation signal.
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Parse { .. } => "PARSE_ERROR",
            EngineError::InvalidWorkflow { .. } => "INVALID_WORKFLOW",
            EngineError::DiffRejected { .. } => "DIFF_OPERATION_FAILED",
            EngineError::NodeNotFound { .. } => "NODE_NOT_FOUND",
            EngineError::FileNotFound { .. } => "ENOENT",
            EngineError::Io { .. } => "IO_ERROR",
            EngineError::Permission { .. } => "PERMISSION_DENIED",
            EngineError::Kb(n8nctl_kb::KbError::MissingDatabase { .. }) => "CONFIG_INVALID",
            EngineError::Kb(_) => "KB_ERROR",
            EngineError::Config { .. } => "CONFIG_INVALID",
            EngineError::Cancelled => "CANCELLED",
        }
    }

    /// Exit-code class of the error.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Parse { .. }
            | EngineError::InvalidWorkflow { .. }
            | EngineError::DiffRejected { .. }
            | EngineError::NodeNotFound { .. } => ErrorClass::Data,
            EngineError::FileNotFound { .. } => ErrorClass::NoInput,
            EngineError::Io { .. } => ErrorClass::Io,
            EngineError::Permission { .. } => ErrorClass::Permission,
            EngineError::Kb(n8nctl_kb::KbError::MissingDatabase { .. }) => ErrorClass::Config,
            EngineError::Kb(_) => ErrorClass::Io,
            EngineError::Config { .. } => ErrorClass::Config,
            EngineError::Cancelled => ErrorClass::Cancelled,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => EngineError::FileNotFound {
                path: err.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => EngineError::Permission {
                message: err.to_string(),
            },
            _ => EngineError::Io {
                message: err.to_string(),
            },
        }
    }
}

/// Convenience alias used throughout the engine crates.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_map_to_sysexits() {
        assert_eq!(ErrorClass::Usage.exit_code(), 64);
        assert_eq!(ErrorClass::Data.exit_code(), 65);
        assert_eq!(ErrorClass::NoInput.exit_code(), 66);
        assert_eq!(ErrorClass::Unavailable.exit_code(), 69);
        assert_eq!(ErrorClass::Io.exit_code(), 74);
        assert_eq!(ErrorClass::Permission.exit_code(), 77);
        assert_eq!(ErrorClass::Config.exit_code(), 78);
    }

    #[test]
    fn missing_kb_is_a_config_error() {
        let err = EngineError::Kb(n8nctl_kb::KbError::MissingDatabase {
            path: "/tmp/nodes.db".into(),
        });
        assert_eq!(err.class(), ErrorClass::Config);
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[test]
    fn io_not_found_becomes_noinput() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: EngineError = io.into();
        assert_eq!(err.class(), ErrorClass::NoInput);
        assert_eq!(err.code(), "ENOENT");
    }
}
