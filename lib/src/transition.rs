//! Checks that depend on the previous revision: what may change between
//! two revisions of the same package, and who may change it.
//!
//! Every version key in the candidate is classified against the stored
//! revision. Added versions were already checked by the schema; unchanged
//! ones must keep their timestamp; modified ones must be republished by a
//! current maintainer. Timestamps are append-only, including those of
//! versions that have since been removed.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::diff::equal_except;
use crate::document::{is_truthy, Document};
use crate::error::{ensure, ensure_with, Res};
use crate::timestamp::parse_timestamp;

/// Version fields that may change without counting as a modification.
const TOLERATED_CHANGES: &[&[&str]] = &[&["directories"], &["deprecated"]];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Added,
    Unchanged,
    Modified,
}

/// A copy of `candidate` carrying `prior`'s `version` field. Publish
/// clients rewrite that field cosmetically when republishing, which is not
/// a change to the release.
fn normalized(candidate: &Value, prior: &Value) -> Value {
    let mut candidate = candidate.clone();
    if let Value::Object(ref mut fields) = candidate {
        match prior.get("version") {
            Some(version) => {
                fields.insert("version".to_string(), version.clone());
            }
            None => {
                fields.remove("version");
            }
        }
    }
    candidate
}

pub fn classify(key: &str, doc: &Document, old: Option<&Document>) -> Transition {
    let prior = old.and_then(|old| old.version(key));
    if let (Some(candidate), Some(prior)) = (doc.version(key), prior) {
        let candidate = normalized(candidate.raw(), prior.raw());
        if !equal_except(&candidate, prior.raw(), TOLERATED_CHANGES) {
            return Transition::Modified;
        }
    }
    if old.and_then(|old| old.time_entry(key)).map_or(false, is_truthy) {
        Transition::Unchanged
    } else {
        Transition::Added
    }
}

pub fn check_transitions(doc: &Document, old: Option<&Document>, requester: &str) -> Res<()> {
    check_frozen_fields(doc, old, requester)?;

    if let Some(versions) = doc.versions() {
        for key in versions.keys() {
            if key.is_empty() {
                continue;
            }
            ensure_with(doc.time_entry(key).map_or(false, is_truthy), || {
                format!("must have time entry for {}", key)
            })?;
            let transition = classify(key, doc, old);
            debug!(version = key.as_str(), ?transition, "classified version");
            match transition {
                Transition::Modified => check_modified(key, doc, requester)?,
                Transition::Unchanged => check_time_kept(key, doc, old)?,
                Transition::Added => {}
            }
        }
    }

    check_removed_versions(doc, old)
}

/// `time.created` and other users' stars are never the requester's to
/// change.
fn check_frozen_fields(doc: &Document, old: Option<&Document>, requester: &str) -> Res<()> {
    let old = match old {
        Some(old) => old,
        None => return Ok(()),
    };

    let created = |d: &Document| {
        d.time_entry("created")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    };
    if let Some(was) = created(old) {
        ensure(created(doc) == Some(was), "created time cannot be changed")?;
    }

    let empty = Value::Object(Map::new());
    let users = doc.field("users").unwrap_or(&empty);
    let old_users = old.field("users").unwrap_or(&empty);
    ensure(
        equal_except(users, old_users, &[&[requester]]),
        "you may only alter your own 'star' setting",
    )
}

fn check_time_kept(key: &str, doc: &Document, old: Option<&Document>) -> Res<()> {
    let was = old.and_then(|old| old.time_entry(key));
    ensure_with(doc.time_entry(key) == was, || {
        format!("{} time should not be modified 1", key)
    })
}

fn check_modified(key: &str, doc: &Document, requester: &str) -> Res<()> {
    let record = match doc.version(key) {
        Some(record) => record,
        None => return Ok(()),
    };
    // Versions published before clients stamped `_npmUser` can't be
    // attributed to anyone. They are let through until those documents
    // have been repaired.
    let npm_user = match record.npm_user() {
        Some(npm_user) => npm_user,
        None => {
            warn!(
                version = key,
                package = doc.display_name(),
                "modified version has no _npmUser, skipping publisher checks"
            );
            return Ok(());
        }
    };

    let publisher = npm_user.get("name").and_then(Value::as_str);
    ensure_with(publisher == Some(requester), || {
        format!(
            "version={}\nuser.name={}\n_npmUser.name={}\n_npmUser.name must === user.name",
            key,
            requester,
            publisher.unwrap_or("undefined")
        )
    })?;
    ensure_with(doc.has_maintainer(requester), || {
        format!(
            "_npmUser must be a current maintainer.\nmaintainers={}\ncurrent user={}",
            doc.field("maintainers").unwrap_or(&Value::Null),
            Value::Object(npm_user.clone())
        )
    })
}

/// A version may be unpublished, but its timestamp stays behind so the
/// same version can't be published again as if it were new.
fn check_removed_versions(doc: &Document, old: Option<&Document>) -> Res<()> {
    let old = match old {
        Some(old) => old,
        None => return Ok(()),
    };
    let old_time = match old.time() {
        Some(time) => time,
        None => return Ok(()),
    };
    for (key, stamp) in old_time {
        if doc.has_version(key) || !old.has_version(key) {
            continue;
        }
        ensure_with(doc.time_entry(key) == Some(stamp), || {
            format!("{} time should not be modified 2", key)
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::test_helpers::{package, publish, remove, set, T1, T2};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn check(new: &Value, old: &Value, requester: &str) -> Res<()> {
        let doc = Document::new(new).unwrap();
        let old = Document::existing(old);
        check_transitions(&doc, old.as_ref(), requester)
    }

    fn reason(result: Res<()>) -> String {
        match result {
            Err(err) => err.reason().to_string(),
            Ok(()) => panic!("transition was accepted"),
        }
    }

    fn class(new: &Value, old: &Value, key: &str) -> Transition {
        let doc = Document::new(new).unwrap();
        classify(key, &doc, Document::existing(old).as_ref())
    }

    #[test]
    fn classification() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        publish(&mut new, "1.1.0", "alice", T1);
        assert_eq!(class(&new, &old, "1.0.0"), Transition::Unchanged);
        assert_eq!(class(&new, &old, "1.1.0"), Transition::Added);
        assert_eq!(class(&new, &json!({}), "1.0.0"), Transition::Added);

        set(&mut new, &["versions", "1.0.0", "dist", "shasum"], json!("other"));
        assert_eq!(class(&new, &old, "1.0.0"), Transition::Modified);
    }

    #[test]
    fn empty_fields_count_as_modifications() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        set(&mut new, &["versions", "1.0.0", "bin"], json!({}));
        assert_eq!(class(&new, &old, "1.0.0"), Transition::Modified);
        assert_eq!(class(&old, &new, "1.0.0"), Transition::Modified);
    }

    #[test]
    fn deprecation_and_directories_are_not_modifications() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        set(&mut new, &["versions", "1.0.0", "deprecated"], json!("use bar"));
        set(&mut new, &["versions", "1.0.0", "directories"], json!({"lib": "src"}));
        assert_eq!(class(&new, &old, "1.0.0"), Transition::Unchanged);
    }

    #[test]
    fn cosmetic_version_rewrite_is_not_a_modification() {
        let mut old = package("foo", "alice");
        set(&mut old, &["versions", "1.0.0", "version"], json!("v1.0.0"));
        let mut new = old.clone();
        set(&mut new, &["versions", "1.0.0", "version"], json!("1.0.0"));
        assert_eq!(class(&new, &old, "1.0.0"), Transition::Unchanged);
        // The caller's document is left as it was.
        assert_eq!(new["versions"]["1.0.0"]["version"], json!("1.0.0"));
    }

    #[test]
    fn publishing_a_version_is_fine() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        publish(&mut new, "1.1.0", "alice", T1);
        assert_eq!(check(&new, &old, "alice"), Ok(()));
    }

    #[test]
    fn every_version_needs_a_time_entry() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        publish(&mut new, "1.1.0", "alice", T1);
        remove(&mut new, &["time", "1.1.0"]);
        assert_eq!(reason(check(&new, &old, "alice")), "must have time entry for 1.1.0");
    }

    #[test]
    fn created_time_is_frozen() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        set(&mut new, &["time", "created"], json!(T1));
        assert_eq!(reason(check(&new, &old, "alice")), "created time cannot be changed");

        // Same instant, different spelling.
        set(&mut new, &["time", "created"], json!("2020-01-01T01:00:00+01:00"));
        assert_eq!(check(&new, &old, "alice"), Ok(()));
    }

    #[test]
    fn only_your_own_star() {
        let mut old = package("foo", "alice");
        set(&mut old, &["users", "carol"], json!(true));
        let mut new = old.clone();
        set(&mut new, &["users", "alice"], json!(true));
        assert_eq!(check(&new, &old, "alice"), Ok(()));

        remove(&mut new, &["users", "carol"]);
        assert_eq!(
            reason(check(&new, &old, "alice")),
            "you may only alter your own 'star' setting"
        );
    }

    #[test]
    fn untouched_version_keeps_its_time() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        set(&mut new, &["time", "1.0.0"], json!(T1));
        assert_eq!(reason(check(&new, &old, "alice")), "1.0.0 time should not be modified 1");
    }

    #[test]
    fn modified_version_must_be_republished_by_requester() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        set(&mut new, &["versions", "1.0.0", "dist", "shasum"], json!("other"));
        set(&mut new, &["time", "1.0.0"], json!(T1));
        assert_eq!(check(&new, &old, "alice"), Ok(()));
        assert_eq!(
            check(&new, &old, "mallory"),
            Err(Error::Forbidden(
                "version=1.0.0\nuser.name=mallory\n_npmUser.name=alice\n_npmUser.name must === user.name"
                    .to_string()
            ))
        );
    }

    #[test]
    fn modified_version_publisher_must_be_a_maintainer() {
        let old = package("foo", "alice");
        let mut new = old.clone();
        set(&mut new, &["versions", "1.0.0", "_npmUser"], json!({"name": "bob", "email": "b@x.com"}));
        let err = reason(check(&new, &old, "bob"));
        assert!(err.starts_with("_npmUser must be a current maintainer.\n"), "{}", err);
        assert!(err.contains("current user={\"email\":\"b@x.com\",\"name\":\"bob\"}"), "{}", err);

        let maintainers = json!([
            {"name": "alice", "email": "alice@x.com"},
            {"name": "bob", "email": "b@x.com"},
        ]);
        set(&mut new, &["maintainers"], maintainers);
        assert_eq!(check(&new, &old, "bob"), Ok(()));
    }

    #[test]
    fn legacy_versions_without_npm_user_are_grandfathered() {
        let mut old = package("foo", "alice");
        remove(&mut old, &["versions", "1.0.0", "_npmUser"]);
        let mut new = old.clone();
        set(&mut new, &["versions", "1.0.0", "dist", "shasum"], json!("other"));
        assert_eq!(class(&new, &old, "1.0.0"), Transition::Modified);
        assert_eq!(check(&new, &old, "mallory"), Ok(()));

        set(&mut new, &["versions", "1.0.0", "_npmUser"], json!("alice <a@x.com>"));
        assert_eq!(check(&new, &old, "mallory"), Ok(()));
    }

    #[test]
    fn removed_versions_keep_their_time() {
        let mut old = package("foo", "alice");
        publish(&mut old, "1.1.0", "alice", T1);
        let mut new = old.clone();
        remove(&mut new, &["versions", "1.1.0"]);
        set(&mut new, &["dist-tags", "latest"], json!("1.0.0"));
        set(&mut new, &["time", "modified"], json!(T2));
        assert_eq!(check(&new, &old, "alice"), Ok(()));

        remove(&mut new, &["time", "1.1.0"]);
        assert_eq!(
            reason(check(&new, &old, "alice")),
            "1.1.0 time should not be modified 2"
        );

        set(&mut new, &["time", "1.1.0"], json!(T2));
        assert_eq!(
            reason(check(&new, &old, "alice")),
            "1.1.0 time should not be modified 2"
        );
    }

    #[test]
    fn first_publish_has_no_history() {
        let new = package("foo", "alice");
        assert_eq!(check(&new, &json!({}), "alice"), Ok(()));
    }
}
