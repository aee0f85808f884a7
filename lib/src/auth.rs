use serde_json::{Map, Value};

use crate::config::Config;
use crate::diff::{describe_diff, equal_except, render_diff};
use crate::document::Document;
use crate::error::{Error, Res};
use crate::user::{DbContext, User};

pub fn is_authenticated(user: Option<&User>) -> bool {
    user.and_then(User::name).is_some()
}

/// Admins may write anything, including documents that would fail every
/// other check.
pub fn is_admin(user: &User, ctx: Option<&DbContext>, config: &Config) -> bool {
    if let Some(ctx) = ctx {
        if let Some(name) = user.name() {
            if ctx.admins.names.iter().any(|n| n == name) {
                return true;
            }
        }
        if user.roles.iter().any(|r| ctx.admins.roles.contains(r)) {
            return true;
        }
    }
    user.has_role(&config.admin_role)
}

/// Whether `requester` may write over `old`.
///
/// A first publish is always allowed here; the schema checks decide the
/// rest. Documents whose `maintainers` predates the list format are open to
/// anyone, since there's no owner to compare against.
pub fn is_authorized_maintainer(requester: &str, old: Option<&Document>) -> bool {
    let old = match old {
        None => return true,
        Some(old) => old,
    };
    match old.field("maintainers") {
        Some(&Value::Array(_)) => old.has_maintainer(requester),
        _ => true,
    }
}

pub fn is_authorized(
    user: Option<&User>,
    ctx: Option<&DbContext>,
    old: Option<&Document>,
    config: &Config,
) -> bool {
    match user {
        Some(user) => match user.name() {
            Some(requester) => {
                is_admin(user, ctx, config) || is_authorized_maintainer(requester, old)
            }
            None => false,
        },
        None => false,
    }
}

/// Anyone may star or unstar any package: a write that touches nothing but
/// the requester's own `users` entry and `time.modified` goes through
/// without a maintainer check. A missing `users` reads as `{}`.
pub fn is_self_star(requester: &str, doc: &Document, old: Option<&Document>) -> bool {
    let old = match old {
        Some(old) if !doc.is_deleted() => old,
        _ => return false,
    };
    let empty = Value::Object(Map::new());
    let users = doc.field("users").unwrap_or(&empty);
    let old_users = old.field("users").unwrap_or(&empty);
    equal_except(users, old_users, &[&[requester]])
        && equal_except(doc.raw(), old.raw(), &[&["users"], &["time", "modified"]])
}

/// The rejection for a non-maintainer, with a diff of what they tried to
/// change so operators can tell what happened.
pub fn unauthorized(requester: &str, doc: &Document, old: &Document) -> Error {
    let changes = describe_diff(old.raw(), doc.raw());
    let mut reason = format!(
        "user: {} not authorized to modify {}",
        requester,
        old.display_name()
    );
    if !changes.is_empty() {
        reason.push('\n');
        reason.push_str(&render_diff(&changes));
    }
    Error::Forbidden(reason)
}

/// Reject unless `user` is an admin or may maintain `old`.
pub fn check_maintainer(
    user: &User,
    ctx: Option<&DbContext>,
    doc: &Document,
    old: Option<&Document>,
    config: &Config,
) -> Res<()> {
    match old {
        Some(old) if !is_authorized(Some(user), ctx, Some(old), config) => {
            Err(unauthorized(user.name().unwrap_or(""), doc, old))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::{package, remove, set};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn admins(names: &[&str], roles: &[&str]) -> DbContext {
        let mut ctx = DbContext::default();
        ctx.admins.names = names.iter().map(|n| n.to_string()).collect();
        ctx.admins.roles = roles.iter().map(|r| r.to_string()).collect();
        ctx
    }

    #[test]
    fn authentication_needs_a_name() {
        assert!(!is_authenticated(None));
        assert!(!is_authenticated(Some(&User::default())));
        assert!(is_authenticated(Some(&User::new("alice"))));
    }

    #[test]
    fn admin_by_name_role_or_builtin_role() {
        let config = Config::default();
        let ctx = admins(&["root"], &["ops"]);
        assert!(is_admin(&User::new("root"), Some(&ctx), &config));
        assert!(is_admin(&User::with_roles("carol", &["ops"]), Some(&ctx), &config));
        assert!(is_admin(&User::with_roles("carol", &["_admin"]), None, &config));
        assert!(!is_admin(&User::new("carol"), Some(&ctx), &config));
        assert!(!is_admin(&User::new("root"), None, &config));
        assert!(!is_admin(&User::with_roles("carol", &["dev"]), Some(&ctx), &config));
    }

    #[test]
    fn admin_role_is_configurable() {
        let config = Config {
            admin_role: "registry-admin".to_string(),
            ..Config::default()
        };
        assert!(is_admin(&User::with_roles("carol", &["registry-admin"]), None, &config));
        assert!(!is_admin(&User::with_roles("carol", &["_admin"]), None, &config));
    }

    #[test]
    fn maintainers_may_write() {
        let raw = package("foo", "alice");
        let old = Document::new(&raw).unwrap();
        assert!(is_authorized_maintainer("alice", Some(&old)));
        assert!(!is_authorized_maintainer("bob", Some(&old)));
        assert!(is_authorized_maintainer("bob", None));
    }

    #[test]
    fn legacy_maintainers_field_is_open() {
        let raw = json!({"_id": "foo", "maintainers": "alice <a@x.com>"});
        let old = Document::new(&raw).unwrap();
        assert!(is_authorized_maintainer("bob", Some(&old)));
        let raw = json!({"_id": "foo"});
        let old = Document::new(&raw).unwrap();
        assert!(is_authorized_maintainer("bob", Some(&old)));
    }

    #[test]
    fn is_authorized_combines_the_checks() {
        let config = Config::default();
        let raw = package("foo", "alice");
        let old = Document::new(&raw).unwrap();
        let ctx = admins(&["root"], &[]);
        assert!(!is_authorized(None, Some(&ctx), Some(&old), &config));
        assert!(is_authorized(Some(&User::new("alice")), None, Some(&old), &config));
        assert!(is_authorized(Some(&User::new("root")), Some(&ctx), Some(&old), &config));
        assert!(!is_authorized(Some(&User::new("bob")), Some(&ctx), Some(&old), &config));
    }

    #[test]
    fn starring_is_self_service() {
        let old_raw = package("foo", "alice");
        let mut new_raw = old_raw.clone();
        set(&mut new_raw, &["users", "bob"], json!(true));
        set(&mut new_raw, &["time", "modified"], json!("2020-02-01T00:00:00Z"));
        let old = Document::new(&old_raw).unwrap();
        let doc = Document::new(&new_raw).unwrap();
        assert!(is_self_star("bob", &doc, Some(&old)));
        assert!(!is_self_star("carol", &doc, Some(&old)));
        assert!(!is_self_star("bob", &doc, None));
    }

    #[test]
    fn starring_does_not_cover_other_edits() {
        let old_raw = package("foo", "alice");
        let mut new_raw = old_raw.clone();
        set(&mut new_raw, &["users", "bob"], json!(true));
        set(&mut new_raw, &["description"], json!("mine now"));
        let old = Document::new(&old_raw).unwrap();
        let doc = Document::new(&new_raw).unwrap();
        assert!(!is_self_star("bob", &doc, Some(&old)));

        let mut deleted_raw = old_raw.clone();
        set(&mut deleted_raw, &["_deleted"], json!(true));
        let deleted = Document::new(&deleted_raw).unwrap();
        assert!(!is_self_star("bob", &deleted, Some(&old)));
    }

    #[test]
    fn starring_does_not_cover_empty_containers() {
        let mut old_raw = package("foo", "alice");
        set(&mut old_raw, &["repository"], json!({}));
        set(&mut old_raw, &["versions", "1.0.0", "dependencies"], json!({}));
        let mut new_raw = old_raw.clone();
        remove(&mut new_raw, &["repository"]);
        let old = Document::new(&old_raw).unwrap();
        let doc = Document::new(&new_raw).unwrap();
        assert!(!is_self_star("bob", &doc, Some(&old)));

        let mut new_raw = old_raw.clone();
        remove(&mut new_raw, &["versions", "1.0.0", "dependencies"]);
        set(&mut new_raw, &["users", "bob"], json!(true));
        let doc = Document::new(&new_raw).unwrap();
        assert!(!is_self_star("bob", &doc, Some(&old)));
    }

    #[test]
    fn rejection_names_the_user_and_includes_the_diff() {
        let old_raw = package("foo", "alice");
        let mut new_raw = old_raw.clone();
        set(&mut new_raw, &["description"], json!("mine now"));
        let old = Document::new(&old_raw).unwrap();
        let doc = Document::new(&new_raw).unwrap();
        let config = Config::default();
        let bob = User::new("bob");
        assert_eq!(
            check_maintainer(&bob, None, &doc, Some(&old), &config),
            Err(Error::Forbidden(
                "user: bob not authorized to modify foo\nAdded: description".to_string()
            ))
        );
        assert_eq!(check_maintainer(&User::new("alice"), None, &doc, Some(&old), &config), Ok(()));
        assert_eq!(check_maintainer(&bob, None, &doc, None, &config), Ok(()));
        let ctx = admins(&["bob"], &[]);
        assert_eq!(check_maintainer(&bob, Some(&ctx), &doc, Some(&old), &config), Ok(()));
    }
}
