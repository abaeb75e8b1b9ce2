//! Call resolution, backchannels and the public client.
//!
//! ```text
//! front-end code ──▶ RpcClient ──▶ Resolver ──▶ HostScope (backend table)
//!                        │                             │
//!                        ▼                             ▼
//!               CallableRegistry ◀── temp_<id> ── host delivery
//! ```

pub mod client;
pub mod error;
pub mod pending;
pub mod remote_callable;
pub mod resolver;
