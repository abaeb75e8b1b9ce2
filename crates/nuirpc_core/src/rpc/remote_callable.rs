//! Bound remote callables.
//!
//! # Responsibility
//! - [`RemoteCallable`]: direct calls with a per-instance resolution cache.
//! - [`BackChannelCallable`]: calls whose result comes back on a one-shot
//!   channel instead of the return value.
//!
//! # Invariants
//! - Resolution happens at invocation time, never at binding time.
//! - Once a [`RemoteCallable`] resolves, it keeps the cached native callable
//!   for its whole lifetime; caches are never shared between instances.
//! - A backchannel's key is allocated before the outbound call that carries
//!   it, and is always the first argument of that call.

use crate::host::scope::NativeCallable;
use crate::registry::channel::{ChannelKey, Continuation};
use crate::rpc::error::UnresolvedCallable;
use crate::rpc::resolver::Resolver;
use log::debug;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Direct-style bound callable.
pub struct RemoteCallable {
    name: String,
    resolver: Resolver,
    cached: RefCell<Option<NativeCallable>>,
}

impl RemoteCallable {
    pub(crate) fn new(name: impl Into<String>, resolver: Resolver) -> Self {
        Self {
            name: name.into(),
            resolver,
            cached: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a previous invocation already resolved the target.
    pub fn is_resolved(&self) -> bool {
        self.cached.borrow().is_some()
    }

    /// Forwards `args` unchanged and returns the native result.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, UnresolvedCallable> {
        let native = self.resolve_cached()?;
        Ok(native(args))
    }

    fn resolve_cached(&self) -> Result<NativeCallable, UnresolvedCallable> {
        if let Some(native) = self.cached.borrow().as_ref() {
            return Ok(Rc::clone(native));
        }
        let native = self
            .resolver
            .resolve(&self.name)
            .ok_or_else(|| UnresolvedCallable::new(self.name.as_str()))?;
        *self.cached.borrow_mut() = Some(Rc::clone(&native));
        Ok(native)
    }
}

/// Backchannel-style bound callable.
///
/// Every invocation allocates a fresh channel bound to the same handler.
pub struct BackChannelCallable {
    name: String,
    resolver: Resolver,
    on_result: Rc<dyn Fn(Value)>,
}

impl BackChannelCallable {
    pub(crate) fn new(
        name: impl Into<String>,
        resolver: Resolver,
        on_result: Rc<dyn Fn(Value)>,
    ) -> Self {
        Self {
            name: name.into(),
            resolver,
            on_result,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the backend with `(channel_key, args...)` and returns the native
    /// call's immediate result; the real answer arrives on the channel.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, UnresolvedCallable> {
        let on_result = Rc::clone(&self.on_result);
        dispatch_back_channel(
            &self.resolver,
            &self.name,
            Box::new(move |value| on_result(value)),
            args,
        )
        .map(|(_, value)| value)
    }
}

/// Allocates a channel for `continuation`, resolves `name` and sends
/// `(key, args...)`.
///
/// When resolution fails the channel is released again; its id stays used.
pub(crate) fn dispatch_back_channel(
    resolver: &Resolver,
    name: &str,
    continuation: Continuation,
    args: Vec<Value>,
) -> Result<(ChannelKey, Value), UnresolvedCallable> {
    let Some(frontend) = resolver.scope().frontend() else {
        debug!(
            "event=rpc_backchannel module=rpc status=miss name={name} reason=missing_shared_object"
        );
        return Err(UnresolvedCallable::new(name));
    };

    let key = frontend.allocate_channel(continuation);
    let Some(native) = resolver.resolve(name) else {
        frontend.release_channel(key);
        debug!("event=rpc_backchannel module=rpc status=miss name={name} channel={key}");
        return Err(UnresolvedCallable::new(name));
    };

    let mut outbound = Vec::with_capacity(args.len() + 1);
    outbound.push(key.to_value());
    outbound.extend(args);
    debug!("event=rpc_backchannel module=rpc status=ok name={name} channel={key}");
    Ok((key, native(&outbound)))
}

#[cfg(test)]
mod tests {
    use super::{BackChannelCallable, RemoteCallable};
    use crate::host::shared_object::RpcObject;
    use crate::rpc::resolver::Resolver;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn resolution_is_deferred_until_first_invoke() {
        let object = Rc::new(RpcObject::new());
        let callable = RemoteCallable::new("late", Resolver::new(object.clone(), false));
        assert!(!callable.is_resolved());
        let err = callable.invoke(&[]).expect_err("not exposed yet");
        assert_eq!(err.name(), callable.name());

        object
            .register_function("late", |_| json!("here"))
            .expect("register");
        assert_eq!(callable.invoke(&[]).expect("resolved"), json!("here"));
        assert!(callable.is_resolved());
    }

    #[test]
    fn separate_instances_keep_separate_caches() {
        let object = Rc::new(RpcObject::new());
        object
            .register_function("version", |_| json!(1))
            .expect("register");
        let first = RemoteCallable::new("version", Resolver::new(object.clone(), false));
        assert_eq!(first.invoke(&[]).expect("first"), json!(1));

        object
            .register_function("version", |_| json!(2))
            .expect("replace");
        let second = RemoteCallable::new("version", Resolver::new(object.clone(), false));
        assert_eq!(first.invoke(&[]).expect("cached"), json!(1));
        assert_eq!(second.invoke(&[]).expect("fresh"), json!(2));
    }

    #[test]
    fn back_channel_reuses_handler_across_invocations() {
        let object = Rc::new(RpcObject::new());
        let captured_keys = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = Rc::clone(&captured_keys);
        object
            .register_function("defer", move |args| {
                if let Some(Value::String(key)) = args.first() {
                    sink.borrow_mut().push(key.clone());
                }
                Value::Null
            })
            .expect("register");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_sink = Rc::clone(&seen);
        let callable = BackChannelCallable::new(
            "defer",
            Resolver::new(object.clone(), false),
            Rc::new(move |value: Value| seen_sink.borrow_mut().push(value)),
        );
        callable.invoke(vec![json!("a")]).expect("first");
        callable.invoke(vec![json!("b")]).expect("second");

        let keys = captured_keys.borrow().clone();
        assert_eq!(keys, vec!["temp_1".to_string(), "temp_2".to_string()]);
        object.call_remote(&keys[1], json!(2)).expect("deliver second");
        object.call_remote(&keys[0], json!(1)).expect("deliver first");
        assert_eq!(*seen.borrow(), vec![json!(2), json!(1)]);
    }

    #[test]
    fn failed_back_channel_dispatch_releases_channel() {
        let object = Rc::new(RpcObject::new());
        let callable = BackChannelCallable::new(
            "absent",
            Resolver::new(object.clone(), false),
            Rc::new(|_: Value| {}),
        );
        let err = callable.invoke(vec![]).expect_err("unresolved");
        assert_eq!(callable.name(), "absent");
        assert_eq!(err.name(), callable.name());
        assert_eq!(object.frontend_registry().pending_count(), 0);
        assert_eq!(object.frontend_registry().last_channel_id(), 1);
    }
}
