use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::Status;

/// Returned when a caller breaks the settle-once contract of a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidStateError {
    /// `fulfill` or `fail` on a promise that is no longer pending.
    #[error("promise is already {status}")]
    AlreadySettled { status: Status },
    /// `reset` on a promise that was never settled.
    #[error("cannot reset a pending promise")]
    ResetPending,
}

/// Raised in place of a continuation that panicked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("continuation panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Panicked { message }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

/// The error carried by a rejected promise.
///
/// Cloning is cheap: every error handler on a cell receives the same
/// underlying error.
///
/// ```
/// use promise_chain::Cause;
///
/// let cause = Cause::msg("disk on fire");
/// assert_eq!(cause.to_string(), "disk on fire");
/// ```
#[derive(Clone)]
pub struct Cause {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl Cause {
    /// Wraps any error as a cause.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Cause { inner: Arc::new(err) }
    }

    /// A cause carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Cause::new(Message(message.into()))
    }

    /// Attempts to view the wrapped error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// True when both causes share the same underlying error.
    pub fn ptr_eq(&self, other: &Cause) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl StdError for Cause {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

impl From<Panicked> for Cause {
    fn from(err: Panicked) -> Self {
        Cause::new(err)
    }
}

impl From<InvalidStateError> for Cause {
    fn from(err: InvalidStateError) -> Self {
        Cause::new(err)
    }
}
