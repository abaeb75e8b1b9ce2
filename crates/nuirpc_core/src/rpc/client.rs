//! Public bridge facade.
//!
//! # Responsibility
//! - Offer the four call shapes: bound direct callables, bound backchannel
//!   callables, `call` and `call_async`.
//! - Mutate the frontend table on behalf of front-end code.
//!
//! # Invariants
//! - Unresolved names surface as [`UnresolvedCallable`] values, never panics.
//! - Continuations run at most once; failures inside them are the caller's.
//! - Delivery order across channels is whatever order the host chooses.

use crate::config::BridgeConfig;
use crate::host::scope::HostScope;
use crate::registry::callable_registry::{
    BatchRegisterError, CallableRegistry, FrontendFn, RegistryError,
};
use crate::registry::channel::{ChannelKey, Continuation};
use crate::rpc::error::{CallError, UnresolvedCallable};
use crate::rpc::pending::PendingCall;
use crate::rpc::remote_callable::{dispatch_back_channel, BackChannelCallable, RemoteCallable};
use crate::rpc::resolver::Resolver;
use futures::channel::oneshot;
use log::debug;
use serde_json::Value;
use std::rc::Rc;

/// Arguments of one [`RpcClient::call`].
///
/// A leading continuation selects the backchannel shape; plain values select
/// the direct shape.
pub enum CallArgs {
    Direct(Vec<Value>),
    WithCallback {
        on_result: Continuation,
        args: Vec<Value>,
    },
}

impl CallArgs {
    pub fn direct(args: Vec<Value>) -> Self {
        Self::Direct(args)
    }

    pub fn with_callback<F>(on_result: F, args: Vec<Value>) -> Self
    where
        F: FnOnce(Value) + 'static,
    {
        Self::WithCallback {
            on_result: Box::new(on_result),
            args,
        }
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(args: Vec<Value>) -> Self {
        Self::Direct(args)
    }
}

/// Front-end entry point to the host's callables.
#[derive(Clone)]
pub struct RpcClient {
    resolver: Resolver,
}

impl RpcClient {
    pub fn new(scope: Rc<dyn HostScope>) -> Self {
        Self::with_config(scope, &BridgeConfig::default())
    }

    pub fn with_config(scope: Rc<dyn HostScope>, config: &BridgeConfig) -> Self {
        Self {
            resolver: Resolver::new(scope, config.trace_resolution),
        }
    }

    /// Binds `name` for direct calls. Nothing is resolved until the first
    /// invocation; the first success is cached in the returned instance.
    pub fn get_remote_callable(&self, name: &str) -> RemoteCallable {
        RemoteCallable::new(name, self.resolver.clone())
    }

    /// Binds `name` for backchannel calls answered through `on_result`.
    pub fn get_remote_callable_with_back_channel<F>(
        &self,
        name: &str,
        on_result: F,
    ) -> BackChannelCallable
    where
        F: Fn(Value) + 'static,
    {
        BackChannelCallable::new(name, self.resolver.clone(), Rc::new(on_result))
    }

    /// Direct call, or backchannel call when `args` carries a continuation.
    ///
    /// Either way the returned value is the native callable's immediate
    /// result.
    pub fn call(
        &self,
        name: &str,
        args: impl Into<CallArgs>,
    ) -> Result<Value, UnresolvedCallable> {
        match args.into() {
            CallArgs::Direct(args) => self.get_remote_callable(name).invoke(&args),
            CallArgs::WithCallback { on_result, args } => {
                dispatch_back_channel(&self.resolver, name, on_result, args)
                    .map(|(_, value)| value)
            }
        }
    }

    /// Backchannel call settled through a future.
    ///
    /// Dispatch happens before this returns, so an unresolved name yields an
    /// already-failed future. No timeout applies; see [`RpcClient::cancel`].
    pub fn call_async(&self, name: &str, args: Vec<Value>) -> PendingCall {
        let (sender, receiver) = oneshot::channel();
        let continuation: Continuation = Box::new(move |value| {
            // The receiver may already be gone; nobody is waiting then.
            let _ = sender.send(value);
        });
        match dispatch_back_channel(&self.resolver, name, continuation, args) {
            Ok((channel, _)) => PendingCall::waiting(channel, receiver),
            Err(err) => PendingCall::failed(CallError::Unresolved(err)),
        }
    }

    pub fn register<F>(&self, name: &str, func: F) -> Result<(), RegistryError>
    where
        F: Fn(Value) + 'static,
    {
        self.frontend()?.register(name, Rc::new(func))
    }

    /// Returns whether an entry was present.
    pub fn unregister(&self, name: &str) -> Result<bool, RegistryError> {
        Ok(self.frontend()?.unregister(name))
    }

    /// Registers each entry independently; no rollback on partial failure.
    pub fn register_many<I, S>(&self, entries: I) -> Result<(), BatchRegisterError>
    where
        I: IntoIterator<Item = (S, FrontendFn)>,
        S: AsRef<str>,
    {
        match self.frontend() {
            Ok(frontend) => frontend.register_many(entries),
            Err(err) => Err(BatchRegisterError {
                failures: entries
                    .into_iter()
                    .map(|(name, _)| (name.as_ref().to_string(), err.clone()))
                    .collect(),
            }),
        }
    }

    /// Returns how many listed entries were actually removed.
    pub fn unregister_many<I, S>(&self, names: I) -> Result<usize, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.frontend()?.unregister_many(names))
    }

    /// Drops a pending channel without running its continuation.
    ///
    /// A [`PendingCall`] bound to it settles with [`CallError::Cancelled`].
    pub fn cancel(&self, channel: ChannelKey) -> bool {
        let cancelled = self
            .frontend()
            .is_ok_and(|frontend| frontend.release_channel(channel));
        debug!("event=rpc_cancel module=rpc status=ok channel={channel} cancelled={cancelled}");
        cancelled
    }

    /// Drops every pending channel; returns how many were dropped.
    pub fn cancel_all_pending(&self) -> usize {
        self.frontend()
            .map(|frontend| frontend.release_all_channels())
            .unwrap_or(0)
    }

    pub fn pending_channels(&self) -> Vec<ChannelKey> {
        self.frontend()
            .map(|frontend| frontend.pending_channels())
            .unwrap_or_default()
    }

    fn frontend(&self) -> Result<Rc<CallableRegistry>, RegistryError> {
        self.resolver
            .scope()
            .frontend()
            .ok_or(RegistryError::MissingSharedObject)
    }
}
