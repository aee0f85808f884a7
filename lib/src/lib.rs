//! Pre-commit write guard for package registry documents.
//!
//! The store calls [`UpdateGuard::validate`] with every proposed revision of
//! a package document, the revision it replaces, the requesting user and
//! the database's admin list. The write is stored only if that returns
//! `Ok(())`; otherwise the [`Error::Forbidden`] reason goes back to the
//! client.

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate serde_derive;

pub mod auth;
pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod guard;
pub mod name;
pub mod schema;
pub mod timestamp;
pub mod transition;
pub mod user;
pub mod version;
#[doc(hidden)]
pub mod test_helpers;

pub use crate::config::Config;
pub use crate::error::{Error, Res};
pub use crate::guard::{validate_doc_update, UpdateGuard};
pub use crate::user::{Admins, DbContext, User};
pub use crate::version::{is_valid_version, Version};
