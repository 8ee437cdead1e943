//! Stable finding codes.
//!
//! These strings are a machine contract: agents key retry and repair logic
//! off them, so existing codes never change meaning.

// Structure
pub const MISSING_WORKFLOW_NAME: &str = "MISSING_WORKFLOW_NAME";
pub const EMPTY_WORKFLOW: &str = "EMPTY_WORKFLOW";
pub const DUPLICATE_NODE_NAME: &str = "DUPLICATE_NODE_NAME";
pub const MISSING_NODE_NAME: &str = "MISSING_NODE_NAME";
pub const MISSING_NODE_TYPE: &str = "MISSING_NODE_TYPE";
pub const MISSING_NODE_POSITION: &str = "MISSING_NODE_POSITION";
pub const MISSING_TRIGGER: &str = "MISSING_TRIGGER";

// Per-node schema
pub const INVALID_NODE_TYPE_FORMAT: &str = "INVALID_NODE_TYPE_FORMAT";
pub const PARAMETER_VALIDATION: &str = "N8N_PARAMETER_VALIDATION_ERROR";
pub const PARAMETER_VALUE_NOT_ALLOWED: &str = "PARAMETER_VALUE_NOT_ALLOWED";
pub const TYPEVERSION_EXCEEDS_LATEST: &str = "TYPEVERSION_EXCEEDS_LATEST";
pub const UNSUPPORTED_ERROR_OUTPUT: &str = "UNSUPPORTED_ERROR_OUTPUT";
pub const DEPRECATED_NODE: &str = "DEPRECATED_NODE";

// Node-specific rules
pub const WEBHOOK_MISSING_PATH: &str = "WEBHOOK_MISSING_PATH";
pub const HTTP_INVALID_URL: &str = "HTTP_INVALID_URL";
pub const CODE_EMPTY: &str = "CODE_EMPTY";
pub const CODE_DANGEROUS_EVAL: &str = "CODE_DANGEROUS_EVAL";
pub const SQL_INJECTION_RISK: &str = "SQL_INJECTION_RISK";
pub const MESSAGE_TARGET_MISSING: &str = "MESSAGE_TARGET_MISSING";

// AI topology
pub const MISSING_LANGUAGE_MODEL: &str = "MISSING_LANGUAGE_MODEL";
pub const MULTIPLE_LANGUAGE_MODELS: &str = "MULTIPLE_LANGUAGE_MODELS";
pub const MISSING_OUTPUT_PARSER: &str = "MISSING_OUTPUT_PARSER";
pub const MULTIPLE_MEMORY_CONNECTIONS: &str = "MULTIPLE_MEMORY_CONNECTIONS";
pub const STREAMING_WITH_MAIN_OUTPUT: &str = "STREAMING_WITH_MAIN_OUTPUT";
pub const STREAMING_REQUIRES_CHAT_TRIGGER: &str = "STREAMING_REQUIRES_CHAT_TRIGGER";
pub const TOOL_MISSING_DESCRIPTION: &str = "TOOL_MISSING_DESCRIPTION";
pub const PROMPT_TEXT_MISSING: &str = "PROMPT_TEXT_MISSING";
pub const CHAIN_WITH_TOOLS: &str = "CHAIN_WITH_TOOLS";
pub const CHAIN_MULTIPLE_MODELS: &str = "CHAIN_MULTIPLE_MODELS";

// Connection integrity
pub const CONNECTION_UNKNOWN_SOURCE: &str = "CONNECTION_UNKNOWN_SOURCE";
pub const CONNECTION_UNKNOWN_TARGET: &str = "CONNECTION_UNKNOWN_TARGET";
pub const UNKNOWN_CONNECTION_KIND: &str = "UNKNOWN_CONNECTION_KIND";
pub const SELF_LOOP_MAIN: &str = "SELF_LOOP_MAIN";
pub const OUTLET_INDEX_OUT_OF_RANGE: &str = "OUTLET_INDEX_OUT_OF_RANGE";
pub const STALE_CONNECTIONS: &str = "STALE_CONNECTIONS";

// Expressions
pub const EXPRESSION_MISSING_PREFIX: &str = "EXPRESSION_MISSING_PREFIX";
pub const EXPRESSION_UNBALANCED: &str = "EXPRESSION_UNBALANCED";
pub const EXPRESSION_INVALID_REFERENCE: &str = "EXPRESSION_INVALID_REFERENCE";

// Version currency
pub const TYPEVERSION_OUTDATED: &str = "TYPEVERSION_OUTDATED";
pub const BREAKING_CHANGE_PENDING: &str = "BREAKING_CHANGE_PENDING";

// Strict-profile extras
pub const MISSING_ERROR_HANDLING: &str = "MISSING_ERROR_HANDLING";
pub const DEFAULT_NODE_NAME: &str = "DEFAULT_NODE_NAME";
