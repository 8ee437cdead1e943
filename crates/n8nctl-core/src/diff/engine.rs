//! Diff application engine.
//!
//! Strict mode validates the whole sequence against a deep clone first and
//! returns the input untouched on any failure. `continue_on_error` applies
//! what it can and records the rest. Renames performed by earlier operations
//! are visible to later ones through a rename map, and are applied to the
//! connection map before the workflow is returned.

use std::collections::HashMap;

use serde_json::Value;

use n8nctl_kb::{short_alias, NodeCatalog};

use crate::diff::{
    AddNodePayload, ConnectionSelector, DiffOperation, DiffResult, OperationError,
};
use crate::error::{EngineError, Result};
use crate::workflow::{paths, ports, Endpoint, Node, Workflow};

/// Engine options.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Apply what succeeds and record failures instead of aborting.
    pub continue_on_error: bool,
}

/// The applied workflow plus the outcome summary.
#[derive(Debug)]
pub struct DiffOutcome {
    pub workflow: Workflow,
    pub result: DiffResult,
}

/// Apply a sequence of operations.
///
/// In strict mode (default) the returned workflow is bit-identical to the
/// input whenever `result.failed > 0`.
pub fn apply(
    workflow: &Workflow,
    operations: &[DiffOperation],
    catalog: &dyn NodeCatalog,
    options: DiffOptions,
) -> Result<DiffOutcome> {
    let mut working = workflow.clone();
    let mut state = ApplyState::default();
    let mut result = DiffResult::default();

    for (index, operation) in operations.iter().enumerate() {
        match apply_one(&mut working, operation, catalog, &mut state) {
            Ok(()) => result.applied += 1,
            Err(err) => {
                result.failed += 1;
                result.errors.push(OperationError {
                    index,
                    operation: operation.kind().to_string(),
                    message: err.to_string(),
                });
                if !options.continue_on_error {
                    result.applied = 0;
                    result.warnings = Vec::new();
                    return Ok(DiffOutcome {
                        workflow: workflow.clone(),
                        result,
                    });
                }
            }
        }
    }

    result.warnings.append(&mut state.warnings);
    Ok(DiffOutcome {
        workflow: working,
        result,
    })
}

/// Per-run mutable state.
#[derive(Debug, Default)]
struct ApplyState {
    /// Original name → current name for renames performed this run
    renames: HashMap<String, String>,
    warnings: Vec<String>,
}

impl ApplyState {
    /// Resolve a caller-supplied node name through the rename chain.
    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        let mut hops = 0;
        while let Some(next) = self.renames.get(current) {
            current = next;
            hops += 1;
            if hops > self.renames.len() {
                break; // cycle guard; renames cannot legally cycle
            }
        }
        current
    }
}

fn apply_one(
    workflow: &mut Workflow,
    operation: &DiffOperation,
    catalog: &dyn NodeCatalog,
    state: &mut ApplyState,
) -> Result<()> {
    match operation {
        DiffOperation::AddNode { node } => add_node(workflow, node, catalog),
        DiffOperation::RemoveNode { name } => remove_node(workflow, state.resolve(name)),
        DiffOperation::UpdateNode { name, updates } => {
            update_node(workflow, state.resolve(name).to_string(), updates, state)
        }
        DiffOperation::MoveNode {
            name,
            position,
            offset,
        } => move_node(workflow, state.resolve(name), *position, *offset),
        DiffOperation::EnableNode { name } => set_disabled(workflow, state.resolve(name), false),
        DiffOperation::DisableNode { name } => set_disabled(workflow, state.resolve(name), true),
        DiffOperation::AddConnection {
            source,
            target,
            selector,
        } => add_connection(
            workflow,
            state.resolve(source),
            state.resolve(target),
            selector,
        ),
        DiffOperation::RemoveConnection {
            source,
            target,
            selector,
        } => remove_connection(
            workflow,
            state.resolve(source),
            state.resolve(target),
            selector,
        ),
        DiffOperation::RewireConnection {
            source,
            from,
            to,
            selector,
        } => {
            let source = state.resolve(source).to_string();
            let from = state.resolve(from).to_string();
            let to = state.resolve(to).to_string();
            remove_connection(workflow, &source, &from, selector)?;
            add_connection(workflow, &source, &to, selector)
        }
        DiffOperation::CleanStaleConnections {} => {
            let removed = clean_stale(workflow);
            if removed > 0 {
                state
                    .warnings
                    .push(format!("removed {removed} stale connection endpoint(s)"));
            }
            Ok(())
        }
        DiffOperation::ReplaceConnections { connections } => {
            workflow.connections = connections.clone();
            Ok(())
        }
        DiffOperation::UpdateSettings { settings } => {
            for (key, value) in settings {
                workflow.settings.insert(key.clone(), value.clone());
            }
            Ok(())
        }
        DiffOperation::UpdateName { name } => {
            workflow.name = name.clone();
            Ok(())
        }
        DiffOperation::AddTag { tag } => {
            if !workflow.tags.contains(tag) {
                workflow.tags.push(tag.clone());
            }
            Ok(())
        }
        DiffOperation::RemoveTag { tag } => {
            workflow.tags.retain(|t| t != tag);
            Ok(())
        }
        DiffOperation::ActivateWorkflow {} => {
            workflow.active = true;
            Ok(())
        }
        DiffOperation::DeactivateWorkflow {} => {
            workflow.active = false;
            Ok(())
        }
    }
}

fn add_node(workflow: &mut Workflow, payload: &AddNodePayload, catalog: &dyn NodeCatalog) -> Result<()> {
    if payload.name.trim().is_empty() {
        return Err(EngineError::InvalidWorkflow {
            message: "new node needs a non-empty name".into(),
        });
    }
    if workflow.has_node(&payload.name) {
        return Err(EngineError::InvalidWorkflow {
            message: format!("node '{}' already exists", payload.name),
        });
    }

    let record = catalog.lookup(&payload.node_type)?;
    let (node_type, default_version) = match &record {
        Some(record) => (record.node_type.clone(), record.latest_version),
        None => (payload.node_type.clone(), 1.0),
    };

    let mut node = Node::new(
        &payload.name,
        node_type,
        payload.type_version.unwrap_or(default_version),
    );
    node.position = Some(payload.position);
    node.parameters = payload.parameters.clone();
    workflow.nodes.push(node);
    Ok(())
}

fn remove_node(workflow: &mut Workflow, name: &str) -> Result<()> {
    if !workflow.has_node(name) {
        return Err(EngineError::NodeNotFound { name: name.into() });
    }
    workflow.nodes.retain(|n| n.name != name);
    // Incident connections go with the node.
    workflow.connections.remove(name);
    for ports_map in workflow.connections.values_mut() {
        for slots in ports_map.values_mut() {
            for endpoints in slots.iter_mut() {
                endpoints.retain(|e| e.node != name);
            }
        }
    }
    Ok(())
}

fn update_node(
    workflow: &mut Workflow,
    name: String,
    updates: &serde_json::Map<String, Value>,
    state: &mut ApplyState,
) -> Result<()> {
    if !workflow.has_node(&name) {
        return Err(EngineError::NodeNotFound { name });
    }

    // Renames first so the remaining updates land on the new identity.
    if let Some(new_name) = updates.get("nodeName").and_then(Value::as_str) {
        if new_name.trim().is_empty() {
            return Err(EngineError::InvalidWorkflow {
                message: "nodeName rename target must be non-empty".into(),
            });
        }
        if new_name != name {
            if workflow.has_node(new_name) {
                return Err(EngineError::InvalidWorkflow {
                    message: format!("cannot rename '{name}' to existing node '{new_name}'"),
                });
            }
            rename_node(workflow, &name, new_name);
            state
                .renames
                .insert(name.clone(), new_name.to_string());
            state.warnings.push(format!(
                "node '{name}' renamed to '{new_name}'; connection references updated"
            ));
            return update_node_fields(workflow, new_name, updates);
        }
    }
    update_node_fields(workflow, &name, updates)
}

fn update_node_fields(
    workflow: &mut Workflow,
    name: &str,
    updates: &serde_json::Map<String, Value>,
) -> Result<()> {
    let node = workflow
        .node_mut(name)
        .ok_or_else(|| EngineError::NodeNotFound { name: name.into() })?;

    for (key, value) in updates {
        match key.as_str() {
            "nodeName" => {} // handled by the caller
            "type" => {
                node.node_type = value.as_str().unwrap_or_default().to_string();
            }
            "typeVersion" => {
                node.type_version = value.as_f64().ok_or_else(|| EngineError::InvalidWorkflow {
                    message: "typeVersion must be numeric".into(),
                })?;
            }
            "disabled" => node.disabled = value.as_bool().unwrap_or(false),
            "onError" => {
                node.on_error = value.as_str().map(str::to_string);
                if value.is_null() {
                    node.on_error = None;
                }
            }
            "notes" => node.notes = value.as_str().map(str::to_string),
            "position" => {
                let coords: Option<[f64; 2]> =
                    serde_json::from_value(value.clone()).ok();
                node.position = Some(coords.ok_or_else(|| EngineError::InvalidWorkflow {
                    message: "position must be a two-number array".into(),
                })?);
            }
            "credentials" => {
                node.credentials = value.as_object().cloned();
            }
            "parameters" => {
                let Some(patch) = value.as_object() else {
                    return Err(EngineError::InvalidWorkflow {
                        message: "parameters update must be an object".into(),
                    });
                };
                let mut merged = Value::Object(node.parameters.clone());
                deep_merge(&mut merged, patch);
                if let Value::Object(map) = merged {
                    node.parameters = map;
                }
            }
            path if path.starts_with("parameters.") => {
                let leaf = &path["parameters.".len()..];
                let mut merged = Value::Object(std::mem::take(&mut node.parameters));
                let ok = paths::set(&mut merged, leaf, value.clone());
                if let Value::Object(map) = merged {
                    node.parameters = map;
                }
                if !ok {
                    return Err(EngineError::InvalidWorkflow {
                        message: format!("cannot write parameter path '{leaf}'"),
                    });
                }
            }
            other => {
                node.extra.insert(other.to_string(), value.clone());
            }
        }
    }
    Ok(())
}

/// Object-level deep merge: objects merge recursively, everything else
/// replaces. Explicit `null` removes the key.
fn deep_merge(base: &mut Value, patch: &serde_json::Map<String, Value>) {
    let Value::Object(base_map) = base else {
        return;
    };
    for (key, incoming) in patch {
        match incoming {
            Value::Null => {
                base_map.remove(key);
            }
            Value::Object(incoming_map) => {
                let slot = base_map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                if slot.is_object() {
                    deep_merge(slot, incoming_map);
                } else {
                    *slot = incoming.clone();
                }
            }
            other => {
                base_map.insert(key.clone(), other.clone());
            }
        }
    }
}

fn rename_node(workflow: &mut Workflow, old: &str, new: &str) {
    if let Some(node) = workflow.node_mut(old) {
        node.name = new.to_string();
    }
    if let Some(ports_map) = workflow.connections.remove(old) {
        workflow.connections.insert(new.to_string(), ports_map);
    }
    for ports_map in workflow.connections.values_mut() {
        for slots in ports_map.values_mut() {
            for endpoints in slots.iter_mut() {
                for endpoint in endpoints {
                    if endpoint.node == old {
                        endpoint.node = new.to_string();
                    }
                }
            }
        }
    }
}

fn move_node(
    workflow: &mut Workflow,
    name: &str,
    position: Option<[f64; 2]>,
    offset: Option<[f64; 2]>,
) -> Result<()> {
    let node = workflow
        .node_mut(name)
        .ok_or_else(|| EngineError::NodeNotFound { name: name.into() })?;
    match (position, offset) {
        (Some(absolute), _) => {
            node.position = Some(absolute);
            Ok(())
        }
        (None, Some(delta)) => {
            let current = node.position.unwrap_or([0.0, 0.0]);
            node.position = Some([current[0] + delta[0], current[1] + delta[1]]);
            Ok(())
        }
        (None, None) => Err(EngineError::InvalidWorkflow {
            message: "moveNode needs either position or offset".into(),
        }),
    }
}

fn set_disabled(workflow: &mut Workflow, name: &str, disabled: bool) -> Result<()> {
    let node = workflow
        .node_mut(name)
        .ok_or_else(|| EngineError::NodeNotFound { name: name.into() })?;
    node.disabled = disabled;
    Ok(())
}

/// Resolved connection coordinates.
struct ResolvedConnection {
    kind: String,
    source_index: usize,
    target_index: u32,
}

/// Turn smart selectors into concrete outlet coordinates.
fn resolve_selector(
    workflow: &Workflow,
    source: &str,
    selector: &ConnectionSelector,
) -> Result<ResolvedConnection> {
    let source_node = workflow
        .node(source)
        .ok_or_else(|| EngineError::NodeNotFound {
            name: source.into(),
        })?;
    let alias = short_alias(&source_node.node_type);

    if selector.branch.is_some() && selector.case.is_some() {
        return Err(EngineError::InvalidWorkflow {
            message: "specify either branch or case, not both".into(),
        });
    }

    let mut kind = ports::MAIN.to_string();
    if let Some(ai_kind) = &selector.ai_connection_type {
        if !ports::is_ai(ai_kind) {
            return Err(EngineError::InvalidWorkflow {
                message: format!("unknown aiConnectionType '{ai_kind}'"),
            });
        }
        kind = ai_kind.clone();
    }

    let mut source_index = selector.source_index.unwrap_or(0) as usize;
    if let Some(branch) = &selector.branch {
        if alias != "if" {
            return Err(EngineError::InvalidWorkflow {
                message: format!("branch is only valid on conditional nodes, '{source}' is {alias}"),
            });
        }
        source_index = match branch.as_str() {
            "true" => 0,
            "false" => 1,
            other => {
                return Err(EngineError::InvalidWorkflow {
                    message: format!("branch must be \"true\" or \"false\", got '{other}'"),
                })
            }
        };
    }
    if let Some(case) = selector.case {
        if alias != "switch" {
            return Err(EngineError::InvalidWorkflow {
                message: format!("case is only valid on switch nodes, '{source}' is {alias}"),
            });
        }
        source_index = case as usize;
    }

    Ok(ResolvedConnection {
        kind,
        source_index,
        target_index: selector.target_index.unwrap_or(0),
    })
}

fn add_connection(
    workflow: &mut Workflow,
    source: &str,
    target: &str,
    selector: &ConnectionSelector,
) -> Result<()> {
    if !workflow.has_node(target) {
        return Err(EngineError::NodeNotFound {
            name: target.into(),
        });
    }
    let resolved = resolve_selector(workflow, source, selector)?;

    // AI connections flow from the provider node into the consumer, with the
    // provider as the map key; the caller names the consumer as target.
    let endpoint = Endpoint {
        node: target.to_string(),
        kind: resolved.kind.clone(),
        index: resolved.target_index,
    };

    let duplicate = workflow
        .connections
        .get(source)
        .and_then(|ports_map| ports_map.get(&resolved.kind))
        .and_then(|slots| slots.get(resolved.source_index))
        .map(|endpoints| endpoints.contains(&endpoint))
        .unwrap_or(false);
    if duplicate {
        return Err(EngineError::InvalidWorkflow {
            message: format!("connection {source} -> {target} already exists"),
        });
    }

    workflow.add_endpoint(source, &resolved.kind, resolved.source_index, endpoint);
    Ok(())
}

fn remove_connection(
    workflow: &mut Workflow,
    source: &str,
    target: &str,
    selector: &ConnectionSelector,
) -> Result<()> {
    let resolved = resolve_selector(workflow, source, selector)?;
    let Some(slots) = workflow
        .connections
        .get_mut(source)
        .and_then(|ports_map| ports_map.get_mut(&resolved.kind))
    else {
        return Err(EngineError::InvalidWorkflow {
            message: format!("no {} connections from '{source}'", resolved.kind),
        });
    };

    let mut removed = false;
    if let Some(endpoints) = slots.get_mut(resolved.source_index) {
        let before = endpoints.len();
        endpoints.retain(|e| !(e.node == target && e.kind == resolved.kind));
        removed = endpoints.len() < before;
    }
    if !removed {
        return Err(EngineError::InvalidWorkflow {
            message: format!(
                "no connection from '{source}' outlet {} to '{target}'",
                resolved.source_index
            ),
        });
    }
    Ok(())
}

/// Drop endpoints and source entries whose nodes no longer exist.
fn clean_stale(workflow: &mut Workflow) -> usize {
    let node_names: std::collections::HashSet<String> =
        workflow.nodes.iter().map(|n| n.name.clone()).collect();
    let mut removed = 0;

    let sources: Vec<String> = workflow.connections.keys().cloned().collect();
    for source in sources {
        if !node_names.contains(&source) {
            if let Some(ports_map) = workflow.connections.remove(&source) {
                removed += ports_map
                    .values()
                    .flat_map(|slots| slots.iter())
                    .map(Vec::len)
                    .sum::<usize>();
            }
            continue;
        }
        if let Some(ports_map) = workflow.connections.get_mut(&source) {
            for slots in ports_map.values_mut() {
                for endpoints in slots.iter_mut() {
                    let before = endpoints.len();
                    endpoints.retain(|e| node_names.contains(&e.node));
                    removed += before - endpoints.len();
                }
            }
        }
    }
    removed
}
