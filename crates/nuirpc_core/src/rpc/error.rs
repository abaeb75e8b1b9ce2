//! Call failure values.

use crate::registry::channel::ChannelKey;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Classification tag carried by every [`UnresolvedCallable`].
pub const UNRESOLVED_CALLABLE_KIND: &str = "UnresolvedRemoteCallableError";

/// Returned instead of a value when a backend name cannot be resolved.
///
/// This is a value, not a panic: synchronous call shapes return
/// `Result<Value, UnresolvedCallable>` and the caller decides what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedCallable {
    name: String,
}

impl UnresolvedCallable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name that failed to resolve.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        UNRESOLVED_CALLABLE_KIND
    }
}

impl Display for UnresolvedCallable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Remote callable with name '{}' is undefined", self.name)
    }
}

impl Error for UnresolvedCallable {}

/// Failure settlement of a promise-style call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    Unresolved(UnresolvedCallable),
    /// The channel was released before the host delivered a value.
    Cancelled(ChannelKey),
}

impl Display for CallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved(err) => write!(f, "{err}"),
            Self::Cancelled(key) => write!(f, "backchannel `{key}` was cancelled"),
        }
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unresolved(err) => Some(err),
            Self::Cancelled(_) => None,
        }
    }
}

impl From<UnresolvedCallable> for CallError {
    fn from(err: UnresolvedCallable) -> Self {
        Self::Unresolved(err)
    }
}
