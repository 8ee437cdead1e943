//! Dot/bracket path addressing into dynamic parameter JSON.
//!
//! Paths look like `options.queryParameters.parameters[0].name`. Validators
//! report findings against these paths and the autofix/diff engines write
//! through them, creating intermediate objects and growing arrays on demand.

use serde_json::{Map, Value};

/// One parsed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Parse a dot/bracket path into segments. Returns `None` on malformed
/// bracket syntax.
pub fn parse(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }
        let mut rest = part;
        // Leading key portion, then any number of [idx] suffixes.
        if let Some(bracket) = rest.find('[') {
            if bracket > 0 {
                segments.push(Segment::Key(rest[..bracket].to_string()));
            }
            rest = &rest[bracket..];
            while !rest.is_empty() {
                if !rest.starts_with('[') {
                    return None;
                }
                let close = rest.find(']')?;
                let index: usize = rest[1..close].parse().ok()?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
            }
        } else {
            segments.push(Segment::Key(rest.to_string()));
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

/// Read a value by path.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path)?;
    let mut current = root;
    for segment in &segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Read a value by path from a parameter map.
pub fn get_in_map<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let segments = parse(path)?;
    let (first, rest) = segments.split_first()?;
    let mut current = match first {
        Segment::Key(key) => map.get(key)?,
        Segment::Index(_) => return None,
    };
    for segment in rest {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(inner)) => inner.get(key)?,
            (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write a value by path, creating intermediate objects and extending arrays
/// with `null` as needed. Returns `false` when the path is malformed or a
/// segment type conflicts with existing data.
pub fn set(root: &mut Value, path: &str, value: Value) -> bool {
    let Some(segments) = parse(path) else {
        return false;
    };
    let mut current = root;
    for (position, segment) in segments.iter().enumerate() {
        let last = position + 1 == segments.len();
        match segment {
            Segment::Key(key) => {
                if current.is_null() {
                    *current = Value::Object(Map::new());
                }
                let Value::Object(map) = current else {
                    return false;
                };
                if last {
                    map.insert(key.clone(), value);
                    return true;
                }
                current = map.entry(key.clone()).or_insert(Value::Null);
            }
            Segment::Index(index) => {
                if current.is_null() {
                    *current = Value::Array(Vec::new());
                }
                let Value::Array(items) = current else {
                    return false;
                };
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                if last {
                    items[*index] = value;
                    return true;
                }
                current = &mut items[*index];
            }
        }
    }
    false
}

/// Remove the value at `path`. Returns the removed value when present.
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let segments = parse(path)?;
    let (last, parents) = segments.split_last()?;
    let mut current = root;
    for segment in parents {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (Segment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    match (last, current) {
        (Segment::Key(key), Value::Object(map)) => map.remove(key),
        (Segment::Index(index), Value::Array(items)) => {
            if *index < items.len() {
                Some(items.remove(*index))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Walk every string leaf under `root`, yielding `(path, value)` pairs in
/// deterministic order (object key order, then array index).
pub fn walk_strings<'a>(root: &'a Value, base: &str, out: &mut Vec<(String, &'a str)>) {
    match root {
        Value::String(s) => out.push((base.to_string(), s.as_str())),
        Value::Object(map) => {
            for (key, child) in map {
                let path = if base.is_empty() {
                    key.clone()
                } else {
                    format!("{base}.{key}")
                };
                walk_strings(child, &path, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let path = format!("{base}[{index}]");
                walk_strings(child, &path, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mixed_segments() {
        let segments = parse("options.values[2].name").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Key("options".into()),
                Segment::Key("values".into()),
                Segment::Index(2),
                Segment::Key("name".into()),
            ]
        );
        assert!(parse("a..b").is_none());
        assert!(parse("a[x]").is_none());
    }

    #[test]
    fn get_reads_nested_values() {
        let value = json!({"a": {"b": [{"c": 7}]}});
        assert_eq!(get(&value, "a.b[0].c"), Some(&json!(7)));
        assert_eq!(get(&value, "a.b[1].c"), None);
    }

    #[test]
    fn set_creates_intermediate_structure() {
        let mut value = json!({});
        assert!(set(&mut value, "options.retry[1].delay", json!(250)));
        assert_eq!(value, json!({"options": {"retry": [null, {"delay": 250}]}}));
    }

    #[test]
    fn set_refuses_type_conflicts() {
        let mut value = json!({"a": "scalar"});
        assert!(!set(&mut value, "a.b", json!(1)));
    }

    #[test]
    fn remove_deletes_leaf() {
        let mut value = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove(&mut value, "a.b"), Some(json!(1)));
        assert_eq!(value, json!({"a": {"c": 2}}));
    }

    #[test]
    fn walk_strings_is_deterministic() {
        let value = json!({"b": "two", "a": ["one", {"x": "three"}]});
        let mut leaves = Vec::new();
        walk_strings(&value, "", &mut leaves);
        let paths: Vec<&str> = leaves.iter().map(|(p, _)| p.as_str()).collect();
        // preserve_order keeps object insertion order.
        assert_eq!(paths, vec!["b", "a[0]", "a[1].x"]);
    }
}
