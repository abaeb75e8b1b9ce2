//! Backend name resolution.
//!
//! # Invariants
//! - Resolution only reads the host scope; the sole side effect is an
//!   optional debug line.
//! - Same host state gives the same result.

use crate::host::scope::{BackendLookup, HostScope, NativeCallable};
use log::debug;
use std::rc::Rc;

/// Looks up host-exposed callables through an injected [`HostScope`].
#[derive(Clone)]
pub struct Resolver {
    scope: Rc<dyn HostScope>,
    trace: bool,
}

impl Resolver {
    pub fn new(scope: Rc<dyn HostScope>, trace: bool) -> Self {
        Self { scope, trace }
    }

    /// Returns the native callable owned by the backend table under `name`.
    pub fn resolve(&self, name: &str) -> Option<NativeCallable> {
        let lookup = if name.is_empty() {
            BackendLookup::NotOwned
        } else {
            self.scope.lookup_backend(name)
        };
        if self.trace {
            debug!(
                "event=rpc_resolve module=rpc status={} name={name} lookup={}",
                if matches!(lookup, BackendLookup::Found(_)) { "ok" } else { "miss" },
                lookup.as_str()
            );
        }
        lookup.into_callable()
    }

    pub fn scope(&self) -> &Rc<dyn HostScope> {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::Resolver;
    use crate::host::shared_object::{GlobalScope, RpcObject};
    use serde_json::json;
    use std::rc::Rc;

    #[test]
    fn resolves_owned_backend_entries_only() {
        let object = Rc::new(RpcObject::new());
        object
            .register_function("add", |args| json!(args.len()))
            .expect("register");
        object.inherit_function("hasOwnProperty", |_| json!(true));
        let resolver = Resolver::new(object, false);

        let add = resolver.resolve("add").expect("owned entry resolves");
        assert_eq!(add(&[json!(1), json!(2)]), json!(2));
        assert!(resolver.resolve("hasOwnProperty").is_none());
        assert!(resolver.resolve("").is_none());
    }

    #[test]
    fn absent_shared_object_or_backend_resolves_to_none() {
        let scope = Rc::new(GlobalScope::empty());
        let resolver = Resolver::new(scope.clone(), true);
        assert!(resolver.resolve("add").is_none());

        let object = Rc::new(RpcObject::new());
        object
            .register_function("add", |_| json!(0))
            .expect("register");
        object.remove_backend();
        scope.install(object);
        assert!(resolver.resolve("add").is_none());
    }
}
