//! One-shot backchannel bookkeeping.
//!
//! # Responsibility
//! - Issue collision-free channel ids from a per-table counter.
//! - Hold the continuation bound to each pending channel until delivery.
//!
//! # Invariants
//! - Issued ids are strictly increasing and never reused, even after release.
//! - A channel is removed before its continuation runs; delivery happens at
//!   most once.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Prefix of the string form the host uses to route a delivery.
pub const CHANNEL_KEY_PREFIX: &str = "temp_";

/// Largest accepted counter seed; leaves at least 2^63 ids before overflow.
pub const MAX_CHANNEL_SEED: u64 = u64::MAX / 2;

static CHANNEL_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^temp_(0|[1-9]\d*)$").expect("valid channel key regex"));

/// One-shot handler bound to a pending channel.
pub type Continuation = Box<dyn FnOnce(Value)>;

/// Identifier of one temporary inbound channel.
///
/// Displays as `temp_<id>`, which is the exact key the host invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelKey(u64);

impl ChannelKey {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }

    /// Parses a frontend table key; returns `None` for anything that is not
    /// exactly `temp_<digits>`.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = CHANNEL_KEY_RE.captures(value)?;
        captures.get(1)?.as_str().parse::<u64>().ok().map(Self)
    }

    /// Routing argument prepended to backchannel calls.
    pub fn to_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl Display for ChannelKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{CHANNEL_KEY_PREFIX}{}", self.0)
    }
}

/// Explicit `id -> continuation` table for pending backchannel calls.
pub struct ChannelTable {
    last_id: u64,
    pending: BTreeMap<u64, Continuation>,
    warn_threshold: usize,
}

impl ChannelTable {
    /// Creates a table whose first issued id is `seed + 1`.
    ///
    /// Seeds above [`MAX_CHANNEL_SEED`] are clamped to it.
    pub fn with_seed(seed: u64) -> Self {
        if seed > MAX_CHANNEL_SEED {
            warn!("event=channel_seed module=registry status=clamped seed={seed}");
        }
        Self {
            last_id: seed.min(MAX_CHANNEL_SEED),
            pending: BTreeMap::new(),
            warn_threshold: 0,
        }
    }

    /// Sets the pending count that triggers a leak warning; `0` disables it.
    pub fn set_warn_threshold(&mut self, threshold: usize) {
        self.warn_threshold = threshold;
    }

    /// Installs `continuation` under the next id and returns its key.
    pub fn allocate(&mut self, continuation: Continuation) -> ChannelKey {
        self.last_id += 1;
        let key = ChannelKey(self.last_id);
        self.pending.insert(key.0, continuation);

        if self.backlog_reached() {
            warn!(
                "event=channel_backlog module=registry status=warn pending={} threshold={}",
                self.pending.len(),
                self.warn_threshold
            );
        }
        key
    }

    /// True exactly when the pending count sits at a non-zero threshold.
    ///
    /// Checked after each allocation, so the warning fires once per crossing.
    fn backlog_reached(&self) -> bool {
        self.warn_threshold > 0 && self.pending.len() == self.warn_threshold
    }

    /// Detaches the continuation for `key`, leaving no entry behind.
    pub fn take(&mut self, key: ChannelKey) -> Option<Continuation> {
        self.pending.remove(&key.0)
    }

    pub fn contains(&self, key: ChannelKey) -> bool {
        self.pending.contains_key(&key.0)
    }

    /// Last id handed out, or the seed when nothing was allocated yet.
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending keys in allocation order.
    pub fn keys(&self) -> Vec<ChannelKey> {
        self.pending.keys().copied().map(ChannelKey).collect()
    }

    /// Detaches every pending continuation, oldest first.
    pub fn drain(&mut self) -> Vec<Continuation> {
        std::mem::take(&mut self.pending).into_values().collect()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::with_seed(0)
    }
}
