//! # Workflow Parser
//!
//! Bytes in, [`Workflow`] out. Strict JSON by default; with repair enabled
//! the parser fixes the syntax slips agents most often produce (trailing
//! commas, bare keys, single-quoted strings, missing separators) and records
//! each edit as a breadcrumb so callers can surface what changed.

use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::workflow::Workflow;

/// One textual repair applied before parsing succeeded.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairNote {
    /// Repair pass that fired
    pub action: RepairAction,
    /// Number of edits the pass made
    pub edits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepairAction {
    StripTrailingCommas,
    QuoteBareKeys,
    DoubleQuoteStrings,
    InsertMissingSeparators,
}

/// Parse options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Attempt textual repair when strict parsing fails.
    pub repair: bool,
}

/// Parse result: the workflow plus any repair breadcrumbs.
#[derive(Debug)]
pub struct Parsed {
    pub workflow: Workflow,
    pub repairs: Vec<RepairNote>,
}

/// Parse workflow JSON.
pub fn parse(bytes: &[u8], options: ParseOptions) -> Result<Parsed> {
    let text = std::str::from_utf8(bytes).map_err(|e| EngineError::Parse {
        message: format!("input is not valid UTF-8: {e}"),
    })?;

    match parse_strict(text) {
        Ok(workflow) => Ok(Parsed {
            workflow,
            repairs: Vec::new(),
        }),
        Err(strict_err) if options.repair => {
            let (repaired, repairs) = repair_text(text);
            if repairs.is_empty() {
                return Err(strict_err);
            }
            let workflow = parse_strict(&repaired).map_err(|_| strict_err)?;
            Ok(Parsed { workflow, repairs })
        }
        Err(err) => Err(err),
    }
}

/// Serialize a workflow to pretty-printed JSON bytes.
///
/// When `full` is false, server-assigned fields are stripped (the shape used
/// when pushing updates to the platform).
pub fn serialize(workflow: &Workflow, full: bool) -> Result<Vec<u8>> {
    let value = workflow.to_value(full);
    let mut bytes = serde_json::to_vec_pretty(&value).map_err(|e| EngineError::Io {
        message: format!("failed to serialize workflow: {e}"),
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn parse_strict(text: &str) -> Result<Workflow> {
    let mut value: Value = serde_json::from_str(text).map_err(|e| EngineError::Parse {
        message: format!("{e}"),
    })?;
    coerce_decode_quirks(&mut value);
    serde_json::from_value(value).map_err(|e| EngineError::Parse {
        message: format!("workflow shape invalid: {e}"),
    })
}

/// Tolerate type quirks the platform's own exports contain: numeric
/// `typeVersion` encoded as a string, and string coordinates in `position`.
fn coerce_decode_quirks(value: &mut Value) {
    let Some(nodes) = value.get_mut("nodes").and_then(Value::as_array_mut) else {
        return;
    };
    for node in nodes {
        if let Some(tv) = node.get_mut("typeVersion") {
            if let Some(parsed) = tv.as_str().and_then(|s| s.parse::<f64>().ok()) {
                *tv = Value::from(parsed);
            }
        }
        if let Some(position) = node.get_mut("position").and_then(Value::as_array_mut) {
            for coordinate in position {
                if let Some(parsed) = coordinate.as_str().and_then(|s| s.parse::<f64>().ok()) {
                    *coordinate = Value::from(parsed);
                }
            }
        }
    }
}

/// Apply the repair passes in fixed order, accumulating breadcrumbs.
fn repair_text(text: &str) -> (String, Vec<RepairNote>) {
    let mut repaired = text.to_string();
    let mut notes = Vec::new();

    let passes: [(RepairAction, fn(&str) -> (String, usize)); 4] = [
        (RepairAction::StripTrailingCommas, strip_trailing_commas),
        (RepairAction::QuoteBareKeys, quote_bare_keys),
        (RepairAction::DoubleQuoteStrings, double_quote_strings),
        (RepairAction::InsertMissingSeparators, insert_missing_separators),
    ];

    for (action, pass) in passes {
        let (next, edits) = pass(&repaired);
        if edits > 0 {
            notes.push(RepairNote { action, edits });
            repaired = next;
        }
    }

    (repaired, notes)
}

/// Character classes for the string-aware scanners below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    DoubleString,
    SingleString,
}

fn scan_step(state: ScanState, prev_escape: bool, c: char) -> (ScanState, bool) {
    if prev_escape {
        return (state, false);
    }
    match (state, c) {
        (ScanState::Code, '"') => (ScanState::DoubleString, false),
        (ScanState::Code, '\'') => (ScanState::SingleString, false),
        (ScanState::DoubleString, '"') => (ScanState::Code, false),
        (ScanState::DoubleString, '\\') => (ScanState::DoubleString, true),
        (ScanState::SingleString, '\'') => (ScanState::Code, false),
        (ScanState::SingleString, '\\') => (ScanState::SingleString, true),
        (s, _) => (s, false),
    }
}

/// Remove commas that directly precede `}` or `]`.
fn strip_trailing_commas(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut edits = 0;
    let mut state = ScanState::Code;
    let mut escape = false;
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        let (next_state, next_escape) = scan_step(state, escape, c);
        if state == ScanState::Code && c == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                edits += 1;
                state = next_state;
                escape = next_escape;
                continue;
            }
        }
        out.push(c);
        state = next_state;
        escape = next_escape;
    }
    (out, edits)
}

/// Quote bare object keys: `{name: 1}` becomes `{"name": 1}`.
fn quote_bare_keys(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut edits = 0;
    let mut state = ScanState::Code;
    let mut escape = false;
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if state == ScanState::Code && (c.is_ascii_alphabetic() || c == '_' || c == '$') {
            // A bare identifier is a key when the previous non-space
            // character opens an object or separates members, and the next
            // non-space character after it is a colon.
            let prev = out.chars().rev().find(|ch| !ch.is_whitespace());
            if matches!(prev, Some('{') | Some(',')) {
                let start = i;
                let mut j = i;
                while j < chars.len()
                    && (chars[j].is_ascii_alphanumeric() || chars[j] == '_' || chars[j] == '$')
                {
                    j += 1;
                }
                let mut k = j;
                while k < chars.len() && chars[k].is_whitespace() {
                    k += 1;
                }
                if k < chars.len() && chars[k] == ':' {
                    out.push('"');
                    out.extend(&chars[start..j]);
                    out.push('"');
                    edits += 1;
                    i = j;
                    continue;
                }
            }
        }
        let (next_state, next_escape) = scan_step(state, escape, c);
        out.push(c);
        state = next_state;
        escape = next_escape;
        i += 1;
    }
    (out, edits)
}

/// Convert single-quoted strings to double-quoted, escaping embedded quotes.
fn double_quote_strings(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut edits = 0;
    let mut state = ScanState::Code;
    let mut escape = false;

    for c in text.chars() {
        let (next_state, next_escape) = scan_step(state, escape, c);
        match (state, next_state, c) {
            (ScanState::Code, ScanState::SingleString, '\'') => {
                out.push('"');
                edits += 1;
            }
            (ScanState::SingleString, ScanState::Code, '\'') => out.push('"'),
            (ScanState::SingleString, _, '"') => out.push_str("\\\""),
            _ => out.push(c),
        }
        state = next_state;
        escape = next_escape;
    }
    (out, edits)
}

/// Insert a comma between a closing value and the `"` that opens the next
/// member on a following line.
fn insert_missing_separators(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut edits = 0;
    let mut state = ScanState::Code;
    let mut escape = false;
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        let (next_state, next_escape) = scan_step(state, escape, c);
        out.push(c);

        let value_end = state == ScanState::DoubleString && next_state == ScanState::Code
            || (state == ScanState::Code && matches!(c, '}' | ']' | '0'..='9'));
        if value_end {
            let mut j = i + 1;
            let mut saw_newline = false;
            while j < chars.len() && chars[j].is_whitespace() {
                saw_newline |= chars[j] == '\n';
                j += 1;
            }
            if saw_newline && j < chars.len() && chars[j] == '"' {
                out.push(',');
                edits += 1;
            }
        }

        state = next_state;
        escape = next_escape;
    }
    (out, edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strict(text: &str) -> Result<Parsed> {
        parse(text.as_bytes(), ParseOptions::default())
    }

    fn lenient(text: &str) -> Result<Parsed> {
        parse(text.as_bytes(), ParseOptions { repair: true })
    }

    #[test]
    fn strict_parse_rejects_trailing_comma() {
        let err = strict(r#"{"name": "A", "nodes": [],}"#).unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }

    #[test]
    fn repair_strips_trailing_commas() {
        let parsed = lenient(r#"{"name": "A", "nodes": [], "connections": {},}"#).unwrap();
        assert_eq!(parsed.workflow.name, "A");
        assert_eq!(parsed.repairs.len(), 1);
        assert_eq!(parsed.repairs[0].action, RepairAction::StripTrailingCommas);
    }

    #[test]
    fn repair_quotes_bare_keys() {
        let parsed = lenient(r#"{name: "A", nodes: [], connections: {}}"#).unwrap();
        assert_eq!(parsed.workflow.name, "A");
        assert!(parsed
            .repairs
            .iter()
            .any(|n| n.action == RepairAction::QuoteBareKeys));
    }

    #[test]
    fn repair_converts_single_quotes() {
        let parsed = lenient(r#"{'name': 'A', 'nodes': [], 'connections': {}}"#).unwrap();
        assert_eq!(parsed.workflow.name, "A");
        assert!(parsed
            .repairs
            .iter()
            .any(|n| n.action == RepairAction::DoubleQuoteStrings));
    }

    #[test]
    fn repair_inserts_missing_separators() {
        let text = "{\"name\": \"A\"\n\"nodes\": [], \"connections\": {}}";
        let parsed = lenient(text).unwrap();
        assert_eq!(parsed.workflow.name, "A");
        assert!(parsed
            .repairs
            .iter()
            .any(|n| n.action == RepairAction::InsertMissingSeparators));
    }

    #[test]
    fn repair_leaves_string_contents_alone() {
        let text = r#"{"name": "A,}", "nodes": [], "connections": {},}"#;
        let parsed = lenient(text).unwrap();
        assert_eq!(parsed.workflow.name, "A,}");
    }

    #[test]
    fn string_type_version_is_coerced() {
        let text = r#"{"name": "A", "nodes": [{"name": "N", "type": "n8n-nodes-base.set",
            "typeVersion": "3.4", "position": [0, 0], "parameters": {}}], "connections": {}}"#;
        let parsed = strict(text).unwrap();
        assert_eq!(parsed.workflow.nodes[0].type_version, 3.4);
    }

    #[test]
    fn serialize_then_parse_roundtrips() {
        let original: Workflow = serde_json::from_value(json!({
            "name": "Round",
            "active": true,
            "nodes": [
                {"name": "Webhook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [10, 20], "parameters": {"path": "in"}}
            ],
            "connections": {},
            "settings": {"executionOrder": "v1"},
            "tags": ["ops"]
        }))
        .unwrap();

        let bytes = serialize(&original, true).unwrap();
        let reparsed = parse(&bytes, ParseOptions::default()).unwrap();
        assert_eq!(original, reparsed.workflow);
    }

    #[test]
    fn unrepairable_input_reports_original_error() {
        let err = lenient("{{{{").unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }
}
