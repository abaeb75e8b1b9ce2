//! Host side of the bridge.
//!
//! The bridge only talks to the host through [`scope::HostScope`]; the
//! in-process [`shared_object::RpcObject`] implements it for embedding and
//! tests.

pub mod scope;
pub mod shared_object;
