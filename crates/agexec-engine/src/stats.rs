//! Per-context counter ledger (spec §3, §4.1).
//!
//! Counters live in a single flat namespace per context. "Total" and
//! "consecutive" counters are not distinguished by type here — they are the
//! same storage, the distinction is purely in which caller resets which key
//! on a success event (see `executor.rs`).

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

/// A monotonic (except for explicit `reset`) counter ledger keyed by string.
///
/// Aggregation across a context tree is computed on demand by walking
/// children (spec §9's "prefer on-demand aggregation over eager mirrors" —
/// tree depth is small in practice, so this never needs to be a mirrored
/// cache).
#[derive(Default)]
pub struct StatsStore {
    counters: DashMap<String, AtomicI64>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to `key`, creating it at zero first if unknown.
    pub fn incr(&self, key: &str, delta: i64) {
        self.counters
            .entry(key.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::SeqCst);
    }

    /// Set `key` back to zero. Used by consecutive counters on a success
    /// event; never used on total counters.
    pub fn reset(&self, key: &str) {
        self.counters
            .entry(key.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .store(0, Ordering::SeqCst);
    }

    /// This context's own contribution to `key`, excluding any child.
    pub fn get_self(&self, key: &str) -> i64 {
        self.counters
            .get(key)
            .map(|v| v.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Every key this context has ever incremented or reset, in
    /// lexicographic order, restricted to those starting with `prefix`.
    pub fn self_keys_matching(&self, prefix: &str) -> BTreeSet<String> {
        self.counters
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect()
    }
}
