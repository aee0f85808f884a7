//! Checks on the candidate document by itself: the shape every stored
//! package document must have, whatever came before it.
//!
//! The only use of the previous revision here is to tell which versions
//! are new, since new versions are held to stricter rules than ones
//! published before those rules existed.

use serde_json::Value;

use crate::config::Config;
use crate::document::{
    describe, describe_value, is_truthy, Document, Maintainer, VersionRecord, DEPENDENCY_FIELDS,
};
use crate::error::{ensure, ensure_with, Error, Res};
use crate::name::is_valid_name;
use crate::timestamp::parse_timestamp;
use crate::version::is_valid_version;

pub fn check_document(doc: &Document, old: Option<&Document>, config: &Config) -> Res<()> {
    check_name(doc, old, config)?;
    ensure(!doc.is_set("mtime"), "doc.mtime is deprecated")?;
    ensure(!doc.is_set("ctime"), "doc.ctime is deprecated")?;
    ensure(doc.time().is_some(), "time must be object")?;
    ensure(doc.dist_tags().is_some(), "dist-tags must be object")?;
    let versions = doc.versions().ok_or("versions must be object")?;

    check_latest(doc)?;
    check_dist_tags(doc)?;
    for (key, record) in versions {
        check_version(doc, old, key, VersionRecord::new(record), config)?;
    }

    check_maintainers(doc)?;
    check_times(doc)?;
    ensure(
        !doc.is_set("url"),
        "Package redirection has been removed. Please update your publish scripts.",
    )?;
    check_description(doc)
}

fn check_name(doc: &Document, old: Option<&Document>, config: &Config) -> Res<()> {
    let name = match doc.name() {
        Some(name) if is_valid_name(name) => name,
        Some(name) => return Err(format!("name invalid: {}", name).into()),
        None => return Err(format!("name invalid: {}", describe(doc.field("name"))).into()),
    };
    if old.is_none() {
        ensure(
            name == name.to_lowercase(),
            "New packages must have all-lowercase names",
        )?;
    }
    ensure(doc.id() == Some(name), "name must match _id")?;
    ensure(name.chars().count() <= config.max_name_length, "name is too long")
}

/// `latest` is what installs resolve to, so it has to be downloadable.
fn check_latest(doc: &Document) -> Res<()> {
    let latest = match doc.dist_tags().and_then(|tags| tags.get("latest")) {
        Some(latest) if is_truthy(latest) => latest,
        _ => return Ok(()),
    };
    let record = latest
        .as_str()
        .and_then(|latest| doc.version(latest))
        .ok_or("dist-tags.latest must be valid version")?;
    let latest = describe_value(latest);

    ensure_with(record.field("dist").map_or(false, is_truthy), || {
        format!("no dist object in {} version", latest)
    })?;
    for &field in &["tarball", "shasum"] {
        ensure_with(record.dist_field(field).map_or(false, is_truthy), || {
            format!("no {} in {} version", field, latest)
        })?;
    }
    Ok(())
}

fn check_dist_tags(doc: &Document) -> Res<()> {
    let tags = match doc.dist_tags() {
        Some(tags) => tags,
        None => return Ok(()),
    };
    for (tag, target) in tags {
        let version = match target.as_str() {
            Some(v) if is_valid_version(v, false) => v,
            _ => {
                return Err(Error::Forbidden(format!(
                    "{} version invalid version: {}",
                    tag,
                    describe_value(target)
                )))
            }
        };
        ensure_with(doc.has_version(version), || {
            format!("{} version missing: {}", tag, version)
        })?;
    }
    Ok(())
}

fn check_version(
    doc: &Document,
    old: Option<&Document>,
    key: &str,
    record: VersionRecord,
    config: &Config,
) -> Res<()> {
    ensure_with(is_valid_version(key, false), || format!("invalid version: {}", key))?;
    ensure(record.is_object(), "version entries must be objects")?;
    ensure_with(record.version() == Some(key), || {
        format!("version must match: {}", key)
    })?;
    ensure_with(record.name().is_some() && record.name() == doc.id(), || {
        format!(
            "version {} has incorrect name: {}",
            key,
            describe_value(record.field("name").unwrap_or(&Value::Null))
        )
    })?;

    for field in DEPENDENCY_FIELDS {
        ensure(
            record.dependency_count(field) <= config.max_dependencies,
            "too many deps.  please be less ridiculous.",
        )?;
    }

    // Only versions added to an already published package are held to the
    // strict rules; a first publish may carry legacy keys.
    let is_new = old
        .and_then(|old| old.versions())
        .map_or(false, |versions| !versions.contains_key(key));
    if is_new {
        ensure_with(is_valid_version(key, true), || {
            format!("Invalid SemVer 2.0 version: {}", key)
        })?;
        if let Some(scripts) = record.field("scripts") {
            check_scripts(scripts)?;
        }
    }
    Ok(())
}

fn check_scripts(scripts: &Value) -> Res<()> {
    let scripts = scripts
        .as_object()
        .ok_or("'scripts' field must be an object")?;
    for (name, script) in scripts {
        ensure_with(script.is_string(), || {
            format!("Non-string script field: {}", name)
        })?;
    }
    Ok(())
}

fn check_maintainers(doc: &Document) -> Res<()> {
    let maintainers = doc
        .maintainers()
        .ok_or("maintainers should be a list of owners")?;
    for m in maintainers {
        ensure_with(Maintainer::from_value(m).is_some(), || {
            format!("Maintainer should have name and email: {}", m)
        })?;
    }
    Ok(())
}

fn check_times(doc: &Document) -> Res<()> {
    for &key in &["created", "modified"] {
        let stamp = doc.time_entry(key);
        ensure_with(
            stamp.and_then(Value::as_str).and_then(parse_timestamp).is_some(),
            || format!("invalid {} time: {}", key, describe(stamp)),
        )?;
    }
    Ok(())
}

fn check_description(doc: &Document) -> Res<()> {
    match doc.field("description") {
        None | Some(&Value::Null) | Some(&Value::String(_)) => Ok(()),
        Some(_) => Err("\"description\" field must be a string".into()),
    }
}
