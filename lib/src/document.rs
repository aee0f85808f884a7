//! Read-only views over a package document as it sits in the store.
//!
//! Documents arrive as arbitrary JSON, and half of the guard's job is
//! deciding whether they have the right shape, so these accessors never
//! assume one: every getter returns `None` when the field is missing or has
//! the wrong type.

use serde_json::{Map, Value};

pub const DEPENDENCY_FIELDS: &[&str] = &["dependencies", "devDependencies", "optionalDependencies"];

/// How old documents spelled "unset": `null`, `false`, `0` and `""` all
/// count as absent for flag-like fields.
pub fn is_truthy(v: &Value) -> bool {
    match *v {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(ref n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(ref s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a possibly missing value for an error message.
pub fn describe(v: Option<&Value>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "undefined".to_string(),
    }
}

/// Render a value for an error message, leaving strings unquoted.
pub fn describe_value(v: &Value) -> String {
    match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    value: &'a Value,
    map: &'a Map<String, Value>,
}

impl<'a> Document<'a> {
    pub fn new(value: &'a Value) -> Option<Document<'a>> {
        match *value {
            Value::Object(ref map) => Some(Document { value, map }),
            _ => None,
        }
    }

    /// Like `new`, but treats `{}` as "no previous revision", which is what
    /// the store hands over for a first publish.
    pub fn existing(value: &'a Value) -> Option<Document<'a>> {
        Document::new(value).filter(|doc| !doc.map.is_empty())
    }

    pub fn raw(&self) -> &'a Value {
        self.value
    }

    pub fn field(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.field(key).map_or(false, is_truthy)
    }

    pub fn id(&self) -> Option<&'a str> {
        self.field("_id").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.field("name").and_then(Value::as_str)
    }

    /// The name, or the id for tombstones that carry nothing else.
    pub fn display_name(&self) -> &'a str {
        self.name().or_else(|| self.id()).unwrap_or("")
    }

    pub fn is_deleted(&self) -> bool {
        self.is_set("_deleted")
    }

    pub fn time(&self) -> Option<&'a Map<String, Value>> {
        self.field("time").and_then(Value::as_object)
    }

    pub fn time_entry(&self, key: &str) -> Option<&'a Value> {
        self.time().and_then(|time| time.get(key))
    }

    pub fn dist_tags(&self) -> Option<&'a Map<String, Value>> {
        self.field("dist-tags").and_then(Value::as_object)
    }

    pub fn versions(&self) -> Option<&'a Map<String, Value>> {
        self.field("versions").and_then(Value::as_object)
    }

    pub fn version(&self, key: &str) -> Option<VersionRecord<'a>> {
        self.versions()
            .and_then(|versions| versions.get(key))
            .map(VersionRecord::new)
    }

    pub fn has_version(&self, key: &str) -> bool {
        self.version(key).is_some()
    }

    pub fn maintainers(&self) -> Option<&'a Vec<Value>> {
        self.field("maintainers").and_then(Value::as_array)
    }

    pub fn has_maintainer(&self, name: &str) -> bool {
        self.maintainers().map_or(false, |maintainers| {
            maintainers
                .iter()
                .any(|m| m.get("name").and_then(Value::as_str) == Some(name))
        })
    }
}

/// A maintainer entry that passes the schema: both fields present and
/// non-empty. Anything else in the entry is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

impl Maintainer {
    pub fn from_value(v: &Value) -> Option<Maintainer> {
        use serde::Deserialize;

        Maintainer::deserialize(v)
            .ok()
            .filter(|m| !m.name.is_empty() && !m.email.is_empty())
    }
}

/// One entry of a document's `versions` map.
#[derive(Debug, Clone, Copy)]
pub struct VersionRecord<'a> {
    value: &'a Value,
}

impl<'a> VersionRecord<'a> {
    pub fn new(value: &'a Value) -> VersionRecord<'a> {
        VersionRecord { value }
    }

    pub fn raw(&self) -> &'a Value {
        self.value
    }

    pub fn is_object(&self) -> bool {
        self.value.is_object()
    }

    pub fn field(&self, key: &str) -> Option<&'a Value> {
        self.value.get(key)
    }

    pub fn version(&self) -> Option<&'a str> {
        self.field("version").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.field("name").and_then(Value::as_str)
    }

    pub fn dependency_count(&self, field: &str) -> usize {
        match self.field(field) {
            Some(&Value::Object(ref deps)) => deps.len(),
            Some(&Value::Array(ref deps)) => deps.len(),
            _ => 0,
        }
    }

    pub fn dist_field(&self, key: &str) -> Option<&'a Value> {
        self.field("dist").and_then(|dist| dist.get(key))
    }

    /// The publisher stamped on this version, if it is a structured record.
    pub fn npm_user(&self) -> Option<&'a Map<String, Value>> {
        self.field("_npmUser").and_then(Value::as_object)
    }
}
