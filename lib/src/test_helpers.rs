#![allow(dead_code)]

use serde_json::{json, Value};

use crate::user::User;
use crate::version::Version;

pub const T0: &str = "2020-01-01T00:00:00Z";
pub const T1: &str = "2020-02-01T00:00:00Z";
pub const T2: &str = "2020-03-01T00:00:00Z";

pub fn ver(s: &str) -> Version {
    Version::parse_strict(s).unwrap()
}

pub fn user(name: &str) -> User {
    User::new(name)
}

/// A freshly published package with a single `1.0.0` release by `owner`.
pub fn package(name: &str, owner: &str) -> Value {
    json!({
        "_id": name,
        "name": name,
        "versions": {
            "1.0.0": {
                "name": name,
                "version": "1.0.0",
                "dist": {"tarball": "t", "shasum": "s"},
                "_npmUser": {"name": owner, "email": format!("{}@x.com", owner)},
            }
        },
        "dist-tags": {"latest": "1.0.0"},
        "maintainers": [{"name": owner, "email": format!("{}@x.com", owner)}],
        "time": {"created": T0, "modified": T0, "1.0.0": T0},
    })
}

/// Add `version` to `doc` as a new release by `publisher` at `at`, moving
/// `latest` along with it.
pub fn publish(doc: &mut Value, version: &str, publisher: &str, at: &str) {
    let name = doc["name"].clone();
    set(
        doc,
        &["versions", version],
        json!({
            "name": name,
            "version": version,
            "dist": {"tarball": "t", "shasum": "s"},
            "_npmUser": {"name": publisher, "email": format!("{}@x.com", publisher)},
        }),
    );
    set(doc, &["dist-tags", "latest"], json!(version));
    set(doc, &["time", version], json!(at));
    set(doc, &["time", "modified"], json!(at));
}

/// Set a nested field, creating intermediate objects. Path segments are
/// taken literally, so `"1.0.0"` is one key.
pub fn set(doc: &mut Value, path: &[&str], value: Value) {
    let (last, parents) = path.split_last().expect("empty path");
    let mut node = doc;
    for key in parents {
        node = node
            .as_object_mut()
            .expect("not an object")
            .entry(key.to_string())
            .or_insert_with(|| json!({}));
    }
    node.as_object_mut()
        .expect("not an object")
        .insert(last.to_string(), value);
}

pub fn remove(doc: &mut Value, path: &[&str]) -> Option<Value> {
    let (last, parents) = path.split_last().expect("empty path");
    let mut node = doc;
    for key in parents {
        node = node.get_mut(*key)?;
    }
    node.as_object_mut().and_then(|map| map.remove(*last))
}
