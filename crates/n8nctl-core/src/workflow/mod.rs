//! # Workflow Data Model
//!
//! Typed view of the platform's workflow JSON: an ordered node list, a
//! connection map keyed by source node name, and workflow metadata.
//! Connections live outside the nodes (the graph may contain cycles), and
//! node parameters stay as dynamic JSON; validators address into them with
//! dot/bracket paths.

pub mod normalize;
pub mod parser;
pub mod paths;

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Outlet kind names used in connection maps.
pub mod ports {
    pub const MAIN: &str = "main";
    pub const AI_LANGUAGE_MODEL: &str = "ai_languageModel";
    pub const AI_TOOL: &str = "ai_tool";
    pub const AI_MEMORY: &str = "ai_memory";
    pub const AI_OUTPUT_PARSER: &str = "ai_outputParser";
    pub const AI_EMBEDDING: &str = "ai_embedding";
    pub const AI_TEXT_SPLITTER: &str = "ai_textSplitter";
    pub const AI_VECTOR_STORE: &str = "ai_vectorStore";

    /// Every non-`main` outlet kind.
    pub const AI_KINDS: &[&str] = &[
        AI_LANGUAGE_MODEL,
        AI_TOOL,
        AI_MEMORY,
        AI_OUTPUT_PARSER,
        AI_EMBEDDING,
        AI_TEXT_SPLITTER,
        AI_VECTOR_STORE,
    ];

    pub fn is_ai(kind: &str) -> bool {
        AI_KINDS.contains(&kind)
    }

    pub fn is_known(kind: &str) -> bool {
        kind == MAIN || is_ai(kind)
    }
}

/// One endpoint of a directed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Target node name
    pub node: String,
    /// Target inlet kind (`main` or an `ai_*` kind)
    #[serde(rename = "type")]
    pub kind: String,
    /// Target inlet index
    pub index: u32,
}

impl Endpoint {
    pub fn main(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            kind: ports::MAIN.to_string(),
            index: 0,
        }
    }
}

/// Ordered outlet slots for one outlet kind of one source node.
///
/// The platform serializes absent slots as `null`; those decode as empty
/// endpoint sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Slots(pub Vec<Vec<Endpoint>>);

impl<'de> Deserialize<'de> for Slots {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Vec<Option<Vec<Endpoint>>> = Deserialize::deserialize(deserializer)?;
        Ok(Slots(raw.into_iter().map(Option::unwrap_or_default).collect()))
    }
}

impl Deref for Slots {
    type Target = Vec<Vec<Endpoint>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Slots {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Outlet kind → ordered outlet slots, for one source node.
pub type PortMap = BTreeMap<String, Slots>;

/// Source node name → its outgoing ports.
pub type ConnectionMap = BTreeMap<String, PortMap>;

/// A single workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable node id assigned by the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-visible, case-sensitive identity; unique within the workflow
    #[serde(default)]
    pub name: String,
    /// Schema key, e.g. `n8n-nodes-base.httpRequest`
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default = "default_type_version")]
    pub type_version: f64,
    /// Canvas position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retry_on_fail: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_between_tries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields the model does not interpret, preserved for round-trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_type_version() -> f64 {
    1.0
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>, type_version: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            node_type: node_type.into(),
            type_version,
            position: Some([0.0, 0.0]),
            parameters: Map::new(),
            credentials: None,
            disabled: false,
            on_error: None,
            retry_on_fail: false,
            max_tries: None,
            wait_between_tries: None,
            notes: None,
            extra: Map::new(),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some([x, y]);
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Read a parameter by dot/bracket path.
    pub fn parameter(&self, path: &str) -> Option<&Value> {
        paths::get_in_map(&self.parameters, path)
    }
}

/// A complete workflow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Server-assigned id; absent for local-only documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: ConnectionMap,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    /// Push a connection endpoint, growing outlet slots as needed.
    pub fn add_endpoint(
        &mut self,
        source: &str,
        outlet_kind: &str,
        outlet_index: usize,
        endpoint: Endpoint,
    ) {
        let ports = self.connections.entry(source.to_string()).or_default();
        let slots = ports.entry(outlet_kind.to_string()).or_default();
        while slots.len() <= outlet_index {
            slots.push(Vec::new());
        }
        slots[outlet_index].push(endpoint);
    }

    /// Every `(source, kind, outlet_index, endpoint)` tuple in the map.
    pub fn endpoints(&self) -> impl Iterator<Item = (&str, &str, usize, &Endpoint)> {
        self.connections.iter().flat_map(|(source, ports)| {
            ports.iter().flat_map(move |(kind, slots)| {
                slots.iter().enumerate().flat_map(move |(index, endpoints)| {
                    endpoints
                        .iter()
                        .map(move |e| (source.as_str(), kind.as_str(), index, e))
                })
            })
        })
    }

    /// Incoming connections of `target`, as `(source, kind, endpoint)`.
    pub fn incoming(&self, target: &str) -> Vec<(&str, &str, &Endpoint)> {
        self.endpoints()
            .filter(|(_, _, _, e)| e.node == target)
            .map(|(source, kind, _, e)| (source, kind, e))
            .collect()
    }

    /// Serialize to a JSON value. When `full` is false, server-assigned
    /// fields (id, createdAt, updatedAt, versionId) are stripped.
    pub fn to_value(&self, full: bool) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if !full {
            if let Value::Object(map) = &mut value {
                for key in ["id", "createdAt", "updatedAt", "versionId"] {
                    map.remove(key);
                }
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Workflow {
        serde_json::from_value(json!({
            "name": "Sample",
            "nodes": [
                {"name": "Webhook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "in"}},
                {"name": "IF", "type": "n8n-nodes-base.if", "typeVersion": 2.2,
                 "position": [200, 0], "parameters": {}}
            ],
            "connections": {
                "Webhook": {"main": [[{"node": "IF", "type": "main", "index": 0}]]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn deserializes_platform_shape() {
        let workflow = sample();
        assert_eq!(workflow.nodes.len(), 2);
        assert_eq!(workflow.nodes[0].node_type, "n8n-nodes-base.webhook");
        assert_eq!(workflow.nodes[1].type_version, 2.2);
        let endpoints: Vec<_> = workflow.endpoints().collect();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].3.node, "IF");
    }

    #[test]
    fn null_slots_decode_as_empty() {
        let workflow: Workflow = serde_json::from_value(json!({
            "name": "Nulls",
            "nodes": [],
            "connections": {
                "IF": {"main": [null, [{"node": "X", "type": "main", "index": 0}]]}
            }
        }))
        .unwrap();
        let slots = &workflow.connections["IF"]["main"];
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_empty());
        assert_eq!(slots[1][0].node, "X");
    }

    #[test]
    fn to_value_strips_server_fields_unless_full() {
        let mut workflow = sample();
        workflow.id = Some("w1".into());
        workflow.version_id = Some("v9".into());
        workflow.updated_at = Some("2025-05-01T00:00:00Z".into());

        let partial = workflow.to_value(false);
        assert!(partial.get("id").is_none());
        assert!(partial.get("versionId").is_none());
        assert!(partial.get("updatedAt").is_none());

        let full = workflow.to_value(true);
        assert_eq!(full["id"], json!("w1"));
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let input = json!({
            "name": "Extra",
            "nodes": [],
            "connections": {},
            "meta": {"instanceId": "abc"},
            "pinData": {}
        });
        let workflow: Workflow = serde_json::from_value(input.clone()).unwrap();
        let output = workflow.to_value(true);
        assert_eq!(output["meta"], input["meta"]);
    }

    #[test]
    fn add_endpoint_grows_slots() {
        let mut workflow = sample();
        workflow.add_endpoint("IF", ports::MAIN, 1, Endpoint::main("Webhook"));
        let slots = &workflow.connections["IF"][ports::MAIN];
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_empty());
        assert_eq!(slots[1][0].node, "Webhook");
    }
}
