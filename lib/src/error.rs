quick_error! {
    /// The one way a write gets refused. The reason is shown to the
    /// submitting client as-is.
    #[derive(Debug, PartialEq, Eq, Clone)]
    pub enum Error {
        Forbidden(reason: String) {
            display("{}", reason)
        }
    }
}

impl Error {
    pub fn reason(&self) -> &str {
        match *self {
            Error::Forbidden(ref reason) => reason,
        }
    }
}

impl From<&str> for Error {
    fn from(reason: &str) -> Error {
        Error::Forbidden(reason.to_string())
    }
}

impl From<String> for Error {
    fn from(reason: String) -> Error {
        Error::Forbidden(reason)
    }
}

pub type Res<A> = Result<A, Error>;

/// Reject with `message` unless `ok` holds.
pub fn ensure<M: Into<Error>>(ok: bool, message: M) -> Res<()> {
    if ok {
        Ok(())
    } else {
        Err(message.into())
    }
}

/// Like `ensure`, for messages that are expensive to build.
pub fn ensure_with<F, M>(ok: bool, message: F) -> Res<()>
where
    F: FnOnce() -> M,
    M: Into<Error>,
{
    if ok {
        Ok(())
    } else {
        Err(message().into())
    }
}
