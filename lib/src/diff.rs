//! Structural comparison of JSON documents.
//!
//! Two questions get asked of an old/new document pair: "what changed?"
//! (for rejection messages) and "is anything different apart from these
//! paths?" (for the star exception and the per-version change tolerance).

use serde_json::Value;
use std::fmt;

/// One difference between two documents, keyed by a dotted path such as
/// `versions.1.0.0.dist`.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Added { path: String },
    Deleted { path: String },
    Changed { path: String, old: Value, new: Value },
    ChangedType { path: String },
    Nulled { path: String },
    Unnulled { path: String },
}

impl Change {
    pub fn path(&self) -> &str {
        match *self {
            Change::Added { ref path }
            | Change::Deleted { ref path }
            | Change::Changed { ref path, .. }
            | Change::ChangedType { ref path }
            | Change::Nulled { ref path }
            | Change::Unnulled { ref path } => path,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Change::Added { ref path } => write!(f, "Added: {}", path),
            Change::Deleted { ref path } => write!(f, "Deleted: {}", path),
            Change::Changed {
                ref path,
                ref old,
                ref new,
            } => write!(f, "Changed: {} {} -> {}", path, old, new),
            Change::ChangedType { ref path } => write!(f, "Changed Type: {}", path),
            Change::Nulled { ref path } => write!(f, "Nulled: {}", path),
            Change::Unnulled { ref path } => write!(f, "Un-nulled: {}", path),
        }
    }
}

/// The coarse kinds the diff distinguishes. Containers and `null` share a
/// kind, so `{} -> null` is reported as nulled rather than as a type change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Container,
    Boolean,
    Number,
    String,
}

fn kind(v: &Value) -> Kind {
    match *v {
        Value::Null | Value::Array(_) | Value::Object(_) => Kind::Container,
        Value::Bool(_) => Kind::Boolean,
        Value::Number(_) => Kind::Number,
        Value::String(_) => Kind::String,
    }
}

fn entries(v: &Value) -> Vec<(String, &Value)> {
    match *v {
        Value::Object(ref map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(ref items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn child<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    match *v {
        Value::Object(ref map) => map.get(key),
        Value::Array(ref items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (&Value::Number(ref x), &Value::Number(ref y)) => x == y || x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// List every difference between `old` and `new`. Deletions and changes
/// come first in `old`'s key order, then additions in `new`'s.
pub fn describe_diff(old: &Value, new: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_into(old, new, "", &mut changes);
    changes
}

fn diff_into(o: &Value, n: &Value, prefix: &str, out: &mut Vec<Change>) {
    for (key, ov) in entries(o) {
        let path = format!("{}{}", prefix, key);
        let nv = match child(n, &key) {
            None => {
                out.push(Change::Deleted { path });
                continue;
            }
            Some(nv) => nv,
        };
        if kind(ov) != kind(nv) {
            out.push(Change::ChangedType { path });
        } else if kind(ov) == Kind::Container {
            match (ov.is_null(), nv.is_null()) {
                (false, false) => diff_into(ov, nv, &format!("{}.", path), out),
                (false, true) => out.push(Change::Nulled { path }),
                (true, false) => out.push(Change::Unnulled { path }),
                (true, true) => {}
            }
        } else if !scalar_eq(ov, nv) {
            out.push(Change::Changed {
                path,
                old: ov.clone(),
                new: nv.clone(),
            });
        }
    }

    for (key, _) in entries(n) {
        if child(o, &key).is_none() {
            out.push(Change::Added {
                path: format!("{}{}", prefix, key),
            });
        }
    }
}

/// Render a diff one change per line, for rejection messages.
pub fn render_diff(changes: &[Change]) -> String {
    changes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deep equality of `a` and `b`, where anything found at one of the
/// `ignore` paths (keys from the root) counts as equal. A key present on
/// only one side makes the values unequal unless its own path is ignored.
pub fn equal_except(a: &Value, b: &Value, ignore: &[&[&str]]) -> bool {
    let mut path = Vec::new();
    equal_at(a, b, &mut path, ignore)
}

fn is_ignored(path: &[String], ignore: &[&[&str]]) -> bool {
    ignore
        .iter()
        .any(|p| p.len() == path.len() && p.iter().zip(path).all(|(i, k)| *i == k.as_str()))
}

fn equal_at(a: &Value, b: &Value, path: &mut Vec<String>, ignore: &[&[&str]]) -> bool {
    if is_ignored(path, ignore) {
        return true;
    }
    match (a, b) {
        (&Value::Object(ref x), &Value::Object(ref y)) => {
            let keys = x.keys().chain(y.keys().filter(|k| !x.contains_key(*k)));
            for key in keys {
                path.push(key.clone());
                let equal = match (x.get(key), y.get(key)) {
                    (Some(av), Some(bv)) => equal_at(av, bv, path, ignore),
                    _ => is_ignored(path, ignore),
                };
                path.pop();
                if !equal {
                    return false;
                }
            }
            true
        }
        (&Value::Array(ref x), &Value::Array(ref y)) => {
            for i in 0..x.len().max(y.len()) {
                path.push(i.to_string());
                let equal = match (x.get(i), y.get(i)) {
                    (Some(av), Some(bv)) => equal_at(av, bv, path, ignore),
                    _ => is_ignored(path, ignore),
                };
                path.pop();
                if !equal {
                    return false;
                }
            }
            true
        }
        _ => scalar_eq(a, b),
    }
}
