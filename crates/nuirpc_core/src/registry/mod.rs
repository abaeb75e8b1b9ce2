//! Frontend table and its one-shot backchannels.

pub mod callable_registry;
pub mod channel;
