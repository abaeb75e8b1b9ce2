//! Host seam consumed by the bridge.

use crate::registry::callable_registry::CallableRegistry;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Function exposed by the host process.
pub type NativeCallable = Rc<dyn Fn(&[Value]) -> Value>;

/// Outcome of one backend table lookup.
#[derive(Clone)]
pub enum BackendLookup {
    MissingSharedObject,
    MissingBackend,
    /// Absent, or only reachable through inherited members.
    NotOwned,
    Found(NativeCallable),
}

impl BackendLookup {
    /// Stable label used in diagnostic logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSharedObject => "missing_shared_object",
            Self::MissingBackend => "missing_backend",
            Self::NotOwned => "not_owned",
            Self::Found(_) => "found",
        }
    }

    pub fn into_callable(self) -> Option<NativeCallable> {
        match self {
            Self::Found(callable) => Some(callable),
            _ => None,
        }
    }
}

impl Debug for BackendLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access to the shared rpc object, injected into the bridge at construction.
pub trait HostScope {
    /// Looks `name` up among the backend table's own entries.
    fn lookup_backend(&self, name: &str) -> BackendLookup;

    /// Frontend table the host reads from; `None` without a shared object.
    fn frontend(&self) -> Option<Rc<CallableRegistry>>;
}
