use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth;
use crate::config::Config;
use crate::document::{describe_value, Document};
use crate::error::{ensure_with, Error, Res};
use crate::schema;
use crate::transition;
use crate::user::{DbContext, User};

/// Decides whether a proposed revision of a package document may be
/// stored.
///
/// The guard holds no state besides its configuration, so one instance can
/// be shared by every request.
#[derive(Debug, Clone, Default)]
pub struct UpdateGuard {
    config: Config,
}

impl UpdateGuard {
    pub fn new(config: Config) -> UpdateGuard {
        UpdateGuard { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accept or reject `doc` as the next revision after `old`.
    ///
    /// `old` is `None` (or `null`, or `{}`) for a first publish. The
    /// documents are only read; `Ok(())` means the write may go ahead
    /// exactly as submitted.
    pub fn validate(
        &self,
        doc: &Value,
        old: Option<&Value>,
        user: Option<&User>,
        ctx: Option<&DbContext>,
    ) -> Res<()> {
        self.run(doc, old, user, ctx).map_err(|err| {
            let package = doc.get("_id").and_then(|id| id.as_str()).unwrap_or("");
            let requester = user.and_then(|u| u.name()).unwrap_or("");
            info!(
                package,
                user = requester,
                reason = %err,
                "write rejected"
            );
            err
        })
    }

    /// `validate`, for hosts that pass the user and database context
    /// through as raw JSON.
    pub fn validate_raw(
        &self,
        doc: &Value,
        old: Option<&Value>,
        user: Option<&Value>,
        ctx: Option<&Value>,
    ) -> Res<()> {
        let user = match user {
            None | Some(&Value::Null) => None,
            Some(raw) => Some(User::deserialize(raw).map_err(|_| Error::from("failed checking user"))?),
        };
        let ctx = match ctx {
            None | Some(&Value::Null) => None,
            Some(raw) => Some(
                DbContext::deserialize(raw)
                    .map_err(|_| Error::from("failed checking admin-ness"))?,
            ),
        };
        self.validate(doc, old, user.as_ref(), ctx.as_ref())
    }

    fn run(
        &self,
        doc: &Value,
        old: Option<&Value>,
        user: Option<&User>,
        ctx: Option<&DbContext>,
    ) -> Res<()> {
        let user = match user {
            Some(user) if auth::is_authenticated(Some(user)) => user,
            _ => return Err("Please log in before writing to the db".into()),
        };
        let requester = user.name().unwrap_or("");

        if auth::is_admin(user, ctx, &self.config) {
            debug!(user = requester, "admin write, skipping checks");
            return Ok(());
        }

        let doc = Document::new(doc).ok_or("document must be an object")?;
        let old = old.and_then(Document::existing);

        // The update handler in front of the store plants its own
        // rejections in the document.
        if doc.is_set("forbidden") && !doc.is_deleted() {
            let reason = doc.field("forbidden").map(describe_value).unwrap_or_default();
            return Err(Error::Forbidden(reason));
        }

        if auth::is_self_star(requester, &doc, old.as_ref()) {
            debug!(user = requester, package = doc.display_name(), "star toggled");
            return Ok(());
        }

        let reserved = self.config.reserved_name.as_str();
        ensure_with(
            !doc.is_deleted() || (doc.name() != Some(reserved) && doc.id() != Some(reserved)),
            || format!("you may not delete {}!", reserved),
        )?;

        auth::check_maintainer(user, ctx, &doc, old.as_ref(), &self.config)?;

        if doc.is_deleted() {
            debug!(user = requester, package = doc.display_name(), "package deleted");
            return Ok(());
        }

        schema::check_document(&doc, old.as_ref(), &self.config)?;
        transition::check_transitions(&doc, old.as_ref(), requester)
    }
}

/// Validate with the stock registry configuration.
pub fn validate_doc_update(
    doc: &Value,
    old: Option<&Value>,
    user: Option<&User>,
    ctx: Option<&DbContext>,
) -> Res<()> {
    UpdateGuard::default().validate(doc, old, user, ctx)
}
