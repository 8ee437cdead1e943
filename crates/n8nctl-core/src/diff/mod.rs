//! # Diff Engine
//!
//! Seventeen typed mutation operations applied to a workflow either
//! atomically (default: any failure leaves the input untouched) or
//! best-effort. Connection operations accept smart parameters for
//! conditional branches (`branch`), switch cases (`case`), and AI connection
//! kinds (`aiConnectionType`).

pub mod engine;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::workflow::ConnectionMap;

pub use engine::{apply, DiffOptions, DiffOutcome};

/// Node payload for `addNode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNodePayload {
    pub name: String,
    /// Qualified type or short alias (resolved against the catalog)
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_version: Option<f64>,
    pub position: [f64; 2],
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Smart selectors shared by the connection operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_index: Option<u32>,
    /// `"true"` / `"false"`, valid only on conditional (`if`) sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Case index, valid only on switch sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<u32>,
    /// Selects a non-`main` outlet/inlet kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_connection_type: Option<String>,
}

/// One surgical mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiffOperation {
    AddNode {
        node: AddNodePayload,
    },
    RemoveNode {
        name: String,
    },
    UpdateNode {
        name: String,
        /// Keys: `nodeName` (rename), `type`, `typeVersion`, `disabled`,
        /// `onError`, `notes`, `credentials`, `position`, `parameters`
        /// (deep-merged), or `parameters.<path>` leaf assignments.
        updates: Map<String, Value>,
    },
    MoveNode {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<[f64; 2]>,
        /// Relative move, applied when `position` is absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<[f64; 2]>,
    },
    EnableNode {
        name: String,
    },
    DisableNode {
        name: String,
    },
    AddConnection {
        source: String,
        target: String,
        #[serde(flatten)]
        selector: ConnectionSelector,
    },
    RemoveConnection {
        source: String,
        target: String,
        #[serde(flatten)]
        selector: ConnectionSelector,
    },
    RewireConnection {
        source: String,
        from: String,
        to: String,
        #[serde(flatten)]
        selector: ConnectionSelector,
    },
    CleanStaleConnections {},
    ReplaceConnections {
        connections: ConnectionMap,
    },
    UpdateSettings {
        settings: Map<String, Value>,
    },
    UpdateName {
        name: String,
    },
    AddTag {
        tag: String,
    },
    RemoveTag {
        tag: String,
    },
    ActivateWorkflow {},
    DeactivateWorkflow {},
}

impl DiffOperation {
    /// Operation type name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            DiffOperation::AddNode { .. } => "addNode",
            DiffOperation::RemoveNode { .. } => "removeNode",
            DiffOperation::UpdateNode { .. } => "updateNode",
            DiffOperation::MoveNode { .. } => "moveNode",
            DiffOperation::EnableNode { .. } => "enableNode",
            DiffOperation::DisableNode { .. } => "disableNode",
            DiffOperation::AddConnection { .. } => "addConnection",
            DiffOperation::RemoveConnection { .. } => "removeConnection",
            DiffOperation::RewireConnection { .. } => "rewireConnection",
            DiffOperation::CleanStaleConnections {} => "cleanStaleConnections",
            DiffOperation::ReplaceConnections { .. } => "replaceConnections",
            DiffOperation::UpdateSettings { .. } => "updateSettings",
            DiffOperation::UpdateName { .. } => "updateName",
            DiffOperation::AddTag { .. } => "addTag",
            DiffOperation::RemoveTag { .. } => "removeTag",
            DiffOperation::ActivateWorkflow {} => "activateWorkflow",
            DiffOperation::DeactivateWorkflow {} => "deactivateWorkflow",
        }
    }

    /// Whether the operation rewrites the workflow's connection map.
    pub fn touches_connections(&self) -> bool {
        matches!(
            self,
            DiffOperation::AddConnection { .. }
                | DiffOperation::RemoveConnection { .. }
                | DiffOperation::RewireConnection { .. }
                | DiffOperation::CleanStaleConnections {}
                | DiffOperation::ReplaceConnections { .. }
                | DiffOperation::RemoveNode { .. }
        )
    }
}

/// Failure detail for one rejected operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    pub index: usize,
    pub operation: String,
    pub message: String,
}

/// Outcome summary of a diff run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub applied: usize,
    pub failed: usize,
    pub errors: Vec<OperationError>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operations_deserialize_from_wire_shape() {
        let ops: Vec<DiffOperation> = serde_json::from_value(json!([
            {"type": "addNode", "node": {"name": "Set", "type": "n8n-nodes-base.set",
             "position": [100, 200]}},
            {"type": "addConnection", "source": "IF", "target": "Success", "branch": "true"},
            {"type": "updateName", "name": "Renamed"},
            {"type": "cleanStaleConnections"},
            {"type": "activateWorkflow"}
        ]))
        .unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[0].kind(), "addNode");
        assert_eq!(ops[1].kind(), "addConnection");
        assert!(ops[1].touches_connections());
        assert!(!ops[2].touches_connections());
    }

    #[test]
    fn unknown_operation_type_fails_to_parse() {
        let result: Result<DiffOperation, _> =
            serde_json::from_value(json!({"type": "explodeNode", "name": "X"}));
        assert!(result.is_err());
    }

    #[test]
    fn selector_rejects_nothing_at_parse_time() {
        // branch/case conflicts are an apply-time error, not a parse error.
        let op: DiffOperation = serde_json::from_value(json!({
            "type": "addConnection", "source": "S", "target": "T",
            "branch": "true", "case": 2
        }))
        .unwrap();
        match op {
            DiffOperation::AddConnection { selector, .. } => {
                assert!(selector.branch.is_some());
                assert!(selector.case.is_some());
            }
            _ => panic!("wrong variant"),
        }
    }
}
