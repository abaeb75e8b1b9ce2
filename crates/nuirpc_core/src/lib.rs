//! Bidirectional RPC bridge between a sandboxed front end and its host.
//!
//! Front-end code calls host-exposed callables through [`RpcClient`] and
//! exposes its own functions through the same client. The host side is
//! reached only through the injected [`HostScope`].

pub mod config;
pub mod host;
pub mod logging;
pub mod registry;
pub mod rpc;

pub use config::{BridgeConfig, ConfigError};
pub use host::scope::{BackendLookup, HostScope, NativeCallable};
pub use host::shared_object::{BackendTable, GlobalScope, RpcObject};
pub use logging::{default_log_level, init_logging, logging_status, LogDestination, LoggingError};
pub use registry::callable_registry::{
    BatchRegisterError, CallableRegistry, FrontendFn, RegistryError,
};
pub use registry::channel::{
    ChannelKey, ChannelTable, Continuation, CHANNEL_KEY_PREFIX, MAX_CHANNEL_SEED,
};
pub use rpc::client::{CallArgs, RpcClient};
pub use rpc::error::{CallError, UnresolvedCallable, UNRESOLVED_CALLABLE_KIND};
pub use rpc::pending::PendingCall;
pub use rpc::remote_callable::{BackChannelCallable, RemoteCallable};
pub use serde_json::Value;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
