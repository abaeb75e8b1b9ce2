//! Frontend callable registry (the table the host reads from).
//!
//! # Responsibility
//! - Hold named front-end functions the host may invoke.
//! - Route `temp_<id>` keys to pending one-shot channels.
//!
//! # Invariants
//! - Re-registering a name overwrites the previous entry.
//! - Channel-shaped names are reserved for channels and never registered.
//! - No internal borrow is held while a front-end function or continuation
//!   runs, so handlers may re-enter the registry.

use crate::registry::channel::{ChannelKey, ChannelTable, Continuation};
use log::{debug, warn};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Front-end function invoked by the host with one delivered value.
pub type FrontendFn = Rc<dyn Fn(Value)>;

/// Registration and host-invocation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    EmptyName,
    ReservedName(String),
    MissingSharedObject,
    NotRegistered(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "callable name cannot be empty"),
            Self::ReservedName(name) => {
                write!(f, "callable name is reserved for backchannels: {name}")
            }
            Self::MissingSharedObject => write!(f, "shared rpc object is not available"),
            Self::NotRegistered(name) => write!(f, "frontend callable not registered: {name}"),
        }
    }
}

impl Error for RegistryError {}

/// Per-entry failures collected from one batch registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRegisterError {
    pub failures: Vec<(String, RegistryError)>,
}

impl Display for BatchRegisterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} batch registration(s) failed", self.failures.len())?;
        for (name, err) in &self.failures {
            write!(f, "; `{name}`: {err}")?;
        }
        Ok(())
    }
}

impl Error for BatchRegisterError {}

/// Forward table shared between the bridge and the host.
pub struct CallableRegistry {
    functions: RefCell<BTreeMap<String, FrontendFn>>,
    channels: RefCell<ChannelTable>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::with_channel_table(ChannelTable::default())
    }

    pub fn with_channel_table(channels: ChannelTable) -> Self {
        Self {
            functions: RefCell::new(BTreeMap::new()),
            channels: RefCell::new(channels),
        }
    }

    /// Adds or replaces one named front-end function.
    pub fn register(&self, name: &str, func: FrontendFn) -> Result<(), RegistryError> {
        validate_name(name)?;
        let replaced = self
            .functions
            .borrow_mut()
            .insert(name.to_string(), func)
            .is_some();
        debug!("event=frontend_register module=registry status=ok name={name} replaced={replaced}");
        Ok(())
    }

    /// Removes one entry; channel keys release their pending channel.
    ///
    /// Returns whether an entry was present.
    pub fn unregister(&self, name: &str) -> bool {
        if let Some(key) = ChannelKey::parse(name) {
            return self.release_channel(key);
        }
        let removed = self.functions.borrow_mut().remove(name).is_some();
        debug!("event=frontend_unregister module=registry status=ok name={name} removed={removed}");
        removed
    }

    /// Registers every entry independently; successes are kept even when
    /// other entries fail.
    pub fn register_many<I, S>(&self, entries: I) -> Result<(), BatchRegisterError>
    where
        I: IntoIterator<Item = (S, FrontendFn)>,
        S: AsRef<str>,
    {
        let mut failures = Vec::new();
        for (name, func) in entries {
            if let Err(err) = self.register(name.as_ref(), func) {
                failures.push((name.as_ref().to_string(), err));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BatchRegisterError { failures })
        }
    }

    /// Removes every listed entry; returns how many were actually present.
    pub fn unregister_many<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| self.unregister(name.as_ref()))
            .count()
    }

    /// Whether `key` currently names a function or a pending channel.
    pub fn contains(&self, key: &str) -> bool {
        match ChannelKey::parse(key) {
            Some(channel) => self.channels.borrow().contains(channel),
            None => self.functions.borrow().contains_key(key),
        }
    }

    /// Registered function names, sorted. Pending channels are not listed.
    pub fn names(&self) -> Vec<String> {
        self.functions.borrow().keys().cloned().collect()
    }

    /// Invokes the entry stored under `key` with one delivered value.
    ///
    /// Channel entries are removed before their continuation runs.
    pub fn invoke(&self, key: &str, value: Value) -> Result<(), RegistryError> {
        if let Some(channel) = ChannelKey::parse(key) {
            let continuation = self.channels.borrow_mut().take(channel);
            return match continuation {
                Some(continuation) => {
                    debug!("event=channel_deliver module=registry status=ok channel={channel}");
                    continuation(value);
                    Ok(())
                }
                None => {
                    warn!("event=channel_deliver module=registry status=miss channel={channel}");
                    Err(RegistryError::NotRegistered(key.to_string()))
                }
            };
        }

        let func = self.functions.borrow().get(key).cloned();
        match func {
            Some(func) => {
                func(value);
                Ok(())
            }
            None => {
                warn!("event=frontend_invoke module=registry status=miss name={key}");
                Err(RegistryError::NotRegistered(key.to_string()))
            }
        }
    }

    /// Installs a one-shot continuation and returns its routing key.
    pub fn allocate_channel(&self, continuation: Continuation) -> ChannelKey {
        self.channels.borrow_mut().allocate(continuation)
    }

    /// Drops a pending channel without running its continuation.
    pub fn release_channel(&self, key: ChannelKey) -> bool {
        let released = self.channels.borrow_mut().take(key);
        let removed = released.is_some();
        // Dropped outside the borrow; a continuation may own values whose
        // destructors touch this registry.
        drop(released);
        if removed {
            debug!("event=channel_release module=registry status=ok channel={key}");
        }
        removed
    }

    /// Drops every pending channel; returns how many were dropped.
    pub fn release_all_channels(&self) -> usize {
        let drained = self.channels.borrow_mut().drain();
        let count = drained.len();
        drop(drained);
        count
    }

    pub fn pending_channels(&self) -> Vec<ChannelKey> {
        self.channels.borrow().keys()
    }

    pub fn pending_count(&self) -> usize {
        self.channels.borrow().len()
    }

    /// Last channel id handed out by this registry.
    pub fn last_channel_id(&self) -> u64 {
        self.channels.borrow().last_id()
    }
}

impl Default for CallableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::EmptyName);
    }
    if ChannelKey::parse(name).is_some() {
        return Err(RegistryError::ReservedName(name.to_string()));
    }
    Ok(())
}
