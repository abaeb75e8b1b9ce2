//! In-process shared rpc object.
//!
//! # Responsibility
//! - Stand in for the object the host injects into the scripting environment:
//!   a frontend table the host reads and a backend table the bridge reads.
//! - Offer the host-side operations (expose native callables, deliver values
//!   to frontend entries) for embedding and for tests.
//!
//! # Invariants
//! - Only own backend entries resolve; inherited members never do.
//! - No internal borrow is held while a frontend entry runs.

use crate::config::BridgeConfig;
use crate::host::scope::{BackendLookup, HostScope, NativeCallable};
use crate::registry::callable_registry::{CallableRegistry, RegistryError};
use crate::registry::channel::ChannelTable;
use log::debug;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Host-registered callables, split into own and inherited members.
#[derive(Default, Clone)]
pub struct BackendTable {
    own: BTreeMap<String, NativeCallable>,
    inherited: BTreeMap<String, NativeCallable>,
}

impl BackendTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, callable: NativeCallable) {
        self.own.insert(name.into(), callable);
    }

    /// Adds a member reachable only through inheritance.
    pub fn insert_inherited(&mut self, name: impl Into<String>, callable: NativeCallable) {
        self.inherited.insert(name.into(), callable);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.own.remove(name).is_some()
    }

    pub fn get_own(&self, name: &str) -> Option<NativeCallable> {
        self.own.get(name).cloned()
    }
}

/// Shared object holding both tables.
pub struct RpcObject {
    frontend: Rc<CallableRegistry>,
    backend: RefCell<Option<BackendTable>>,
}

impl RpcObject {
    pub fn new() -> Self {
        Self::with_config(&BridgeConfig::default())
    }

    /// Creates an object whose channel counter and leak threshold follow
    /// `config`.
    pub fn with_config(config: &BridgeConfig) -> Self {
        let mut channels = ChannelTable::with_seed(config.channel_seed);
        channels.set_warn_threshold(config.pending_channel_warn_threshold);
        Self {
            frontend: Rc::new(CallableRegistry::with_channel_table(channels)),
            backend: RefCell::new(Some(BackendTable::new())),
        }
    }

    /// Exposes a native callable under `name`, creating the backend table
    /// when it is absent.
    pub fn register_function<F>(&self, name: &str, func: F) -> Result<(), RegistryError>
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        self.backend
            .borrow_mut()
            .get_or_insert_with(BackendTable::new)
            .insert(name, Rc::new(func));
        debug!("event=backend_register module=host status=ok name={name}");
        Ok(())
    }

    /// Withdraws a native callable; returns whether it was exposed.
    pub fn unregister_function(&self, name: &str) -> bool {
        self.backend
            .borrow_mut()
            .as_mut()
            .is_some_and(|table| table.remove(name))
    }

    /// Adds an inherited backend member that must never resolve.
    pub fn inherit_function<F>(&self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        self.backend
            .borrow_mut()
            .get_or_insert_with(BackendTable::new)
            .insert_inherited(name, Rc::new(func));
    }

    pub fn install_backend(&self, table: BackendTable) {
        *self.backend.borrow_mut() = Some(table);
    }

    pub fn remove_backend(&self) -> Option<BackendTable> {
        self.backend.borrow_mut().take()
    }

    pub fn has_backend(&self) -> bool {
        self.backend.borrow().is_some()
    }

    /// Invokes the frontend entry stored under the exact key `name`.
    ///
    /// This is how the host answers a backchannel call: `name` is the
    /// channel key it received as the first argument.
    pub fn call_remote(&self, name: &str, value: Value) -> Result<(), RegistryError> {
        self.frontend.invoke(name, value)
    }

    pub fn frontend_registry(&self) -> Rc<CallableRegistry> {
        Rc::clone(&self.frontend)
    }
}

impl Default for RpcObject {
    fn default() -> Self {
        Self::new()
    }
}

impl HostScope for RpcObject {
    fn lookup_backend(&self, name: &str) -> BackendLookup {
        let backend = self.backend.borrow();
        let Some(table) = backend.as_ref() else {
            return BackendLookup::MissingBackend;
        };
        match table.get_own(name) {
            Some(callable) => BackendLookup::Found(callable),
            None => BackendLookup::NotOwned,
        }
    }

    fn frontend(&self) -> Option<Rc<CallableRegistry>> {
        Some(self.frontend_registry())
    }
}

/// Global slot that may or may not hold the shared object.
#[derive(Default)]
pub struct GlobalScope {
    rpc_object: RefCell<Option<Rc<RpcObject>>>,
}

impl GlobalScope {
    /// A scope where the host has not injected anything yet.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_object(object: Rc<RpcObject>) -> Self {
        Self {
            rpc_object: RefCell::new(Some(object)),
        }
    }

    pub fn install(&self, object: Rc<RpcObject>) {
        *self.rpc_object.borrow_mut() = Some(object);
    }

    pub fn take(&self) -> Option<Rc<RpcObject>> {
        self.rpc_object.borrow_mut().take()
    }

    pub fn object(&self) -> Option<Rc<RpcObject>> {
        self.rpc_object.borrow().clone()
    }
}

impl HostScope for GlobalScope {
    fn lookup_backend(&self, name: &str) -> BackendLookup {
        match self.object() {
            Some(object) => object.lookup_backend(name),
            None => BackendLookup::MissingSharedObject,
        }
    }

    fn frontend(&self) -> Option<Rc<CallableRegistry>> {
        self.object().map(|object| object.frontend_registry())
    }
}
