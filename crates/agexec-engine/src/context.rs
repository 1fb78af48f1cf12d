//! The per-loop runtime object (spec §3, §4.3).
//!
//! `ExecutionContext` is a cheaply-cloneable handle (an `Arc` around the
//! actual state): callers pass it by value, clones share the same
//! underlying tree node, and a parent holds strong references to its
//! children while each child holds only a weak reference back.

use agexec_core::types::ContextName;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::events::{Event, EventBus};
use crate::limits::{evaluate, ExceededLimit, LimitSet, StatsView, TerminationReason};
use crate::stats::StatsStore;

struct Inner {
    name: ContextName,
    stats: StatsStore,
    parent: Option<Weak<Inner>>,
    children: RwLock<Vec<ExecutionContext>>,
    /// `Some` only at the root; children reach it through `parent`.
    limits: Option<LimitSet>,
    iteration: AtomicI64,
    cancelled: AtomicBool,
    termination_reason: Mutex<Option<TerminationReason>>,
    /// Set by `publish` whenever a `LimitExceeded` event reaches this
    /// context (as originator or as an ancestor of the originator). Drained
    /// by the executor at the end of the current iteration (spec §4.5).
    pending_limit: Mutex<Option<ExceededLimit>>,
    /// Limit keys already published as `LimitExceeded` on this context
    /// during the current iteration — the tie-break in spec §4.5. Reset at
    /// the start of every iteration.
    published_this_iteration: Mutex<BTreeSet<String>>,
    event_bus: EventBus,
    data: serde_json::Value,
}

/// The per-loop runtime object. Clone is cheap and shares state.
#[derive(Clone)]
pub struct ExecutionContext(Arc<Inner>);

impl ExecutionContext {
    /// Create a root context. Only a root carries a `LimitSet`.
    pub fn new_root(name: impl Into<ContextName>, limits: LimitSet) -> Self {
        Self(Arc::new(Inner {
            name: name.into(),
            stats: StatsStore::new(),
            parent: None,
            children: RwLock::new(Vec::new()),
            limits: Some(limits),
            iteration: AtomicI64::new(0),
            cancelled: AtomicBool::new(false),
            termination_reason: Mutex::new(None),
            pending_limit: Mutex::new(None),
            published_this_iteration: Mutex::new(BTreeSet::new()),
            event_bus: EventBus::new(),
            data: serde_json::Value::Null,
        }))
    }

    /// Spawn a child context attached to this one, in creation order.
    /// Tool handlers call this to run sub-loops (spec §4.3).
    pub fn spawn_child(&self, name: impl Into<ContextName>, data: serde_json::Value) -> Self {
        let child = Self(Arc::new(Inner {
            name: name.into(),
            stats: StatsStore::new(),
            parent: Some(Arc::downgrade(&self.0)),
            children: RwLock::new(Vec::new()),
            limits: None,
            iteration: AtomicI64::new(0),
            cancelled: AtomicBool::new(self.is_cancelled()),
            termination_reason: Mutex::new(None),
            pending_limit: Mutex::new(None),
            published_this_iteration: Mutex::new(BTreeSet::new()),
            event_bus: EventBus::new(),
            data,
        }));
        self.0.children.write().unwrap().push(child.clone());
        child
    }

    pub fn name(&self) -> &ContextName {
        &self.0.name
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.0.data
    }

    pub fn stats(&self) -> &StatsStore {
        &self.0.stats
    }

    pub fn parent(&self) -> Option<ExecutionContext> {
        self.0.parent.as_ref().and_then(Weak::upgrade).map(Self)
    }

    pub fn children(&self) -> Vec<ExecutionContext> {
        self.0.children.read().unwrap().clone()
    }

    /// The `LimitSet` declared at this context's root, reached by walking
    /// the parent chain.
    pub fn root_limits(&self) -> LimitSet {
        let mut cur = self.clone();
        loop {
            if let Some(limits) = &cur.0.limits {
                return limits.clone();
            }
            match cur.parent() {
                Some(p) => cur = p,
                None => return LimitSet::default(),
            }
        }
    }

    /// Aggregated value of `key`: this context's own counter plus the
    /// (recursively aggregated) value from every direct child (Invariant A).
    pub fn get_aggregated(&self, key: &str) -> i64 {
        let mut total = self.0.stats.get_self(key);
        for child in self.0.children.read().unwrap().iter() {
            total += child.get_aggregated(key);
        }
        total
    }

    /// Every counter key known anywhere in this subtree starting with
    /// `prefix`, in lexicographic order.
    pub fn known_keys_matching(&self, prefix: &str) -> BTreeSet<String> {
        let mut keys = self.0.stats.self_keys_matching(prefix);
        for child in self.0.children.read().unwrap().iter() {
            keys.extend(child.known_keys_matching(prefix));
        }
        keys
    }

    /// Increment the iteration counter and return the new 1-based iteration
    /// number, resetting this iteration's limit-publish dedup set.
    pub fn begin_iteration(&self) -> i64 {
        self.0.published_this_iteration.lock().unwrap().clear();
        self.0.stats.incr("iterations", 1);
        self.0.iteration.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn iteration(&self) -> i64 {
        self.0.iteration.load(Ordering::SeqCst)
    }

    /// Mark this context, and its entire subtree, cancelled (spec §4.3,
    /// §5). Children are visited in creation order. Idempotent.
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        for child in self.0.children.read().unwrap().iter() {
            child.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// First writer wins; later calls are ignored (spec §4.3).
    pub fn set_termination_reason(&self, reason: TerminationReason) -> bool {
        let mut guard = self.0.termination_reason.lock().unwrap();
        if guard.is_some() {
            return false;
        }
        *guard = Some(reason);
        true
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.0.termination_reason.lock().unwrap().clone()
    }

    pub fn exceeded_limit(&self) -> Option<ExceededLimit> {
        match self.termination_reason() {
            Some(TerminationReason::LimitExceeded(e)) => Some(e),
            _ => None,
        }
    }

    /// Evaluate the root `LimitSet` against this context's current stats.
    /// Publishes a `LimitExceeded` event the first time a given *declared*
    /// limit is found exceeded during the current iteration (the §4.5
    /// tie-break is per `Limit`, not per matched key — a prefix limit
    /// tripped by "alpha" at one checkpoint and by "beta" at a later
    /// checkpoint in the same iteration is still one declaration, so it
    /// publishes once); returns the exceeded limit, if any, on every call
    /// regardless of whether it published.
    pub fn evaluate_limits(&self) -> Option<ExceededLimit> {
        let limits = self.root_limits();
        if limits.is_empty() {
            return None;
        }
        let exceeded = evaluate(&limits, self)?;
        let limit_identity = format!("{:?}#{}#{}", exceeded.limit.kind, exceeded.limit.key, exceeded.limit.max);
        let first_this_iteration = self
            .0
            .published_this_iteration
            .lock()
            .unwrap()
            .insert(limit_identity);
        if first_this_iteration {
            self.publish(Event::LimitExceeded {
                limit: exceeded.limit.clone(),
                observed: exceeded.observed,
                matched_key: exceeded.matched_key.clone(),
            });
        }
        Some(exceeded)
    }

    /// Drain the limit-exceeded state recorded on this context by
    /// `publish` (self-originated or propagated from a descendant).
    pub fn take_pending_limit(&self) -> Option<ExceededLimit> {
        self.0.pending_limit.lock().unwrap().take()
    }

    /// Deliver `event` to this context's subscribers, then to every
    /// ancestor's subscribers in turn (spec §4.4). A `LimitExceeded` event
    /// also records pending-limit state on this context and every ancestor,
    /// which is how a descendant's limit overage reaches a parent's
    /// executor (spec §4.5's propagation rule).
    pub fn publish(&self, event: Event) {
        if let Event::LimitExceeded {
            limit,
            observed,
            matched_key,
        } = &event
        {
            self.record_pending_limit(ExceededLimit {
                limit: limit.clone(),
                matched_key: matched_key.clone(),
                observed: *observed,
            });
        }
        let envelope = self.0.event_bus.publish_origin(self.0.name.as_str(), event);
        let mut cur = self.parent();
        while let Some(ancestor) = cur {
            if let Event::LimitExceeded {
                limit,
                observed,
                matched_key,
            } = &envelope.event
            {
                ancestor.record_pending_limit(ExceededLimit {
                    limit: limit.clone(),
                    matched_key: matched_key.clone(),
                    observed: *observed,
                });
            }
            ancestor.0.event_bus.forward(envelope.clone());
            cur = ancestor.parent();
        }
    }

    fn record_pending_limit(&self, exceeded: ExceededLimit) {
        *self.0.pending_limit.lock().unwrap() = Some(exceeded);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::events::Envelope> {
        self.0.event_bus.subscribe()
    }
}

impl StatsView for ExecutionContext {
    fn get_self(&self, key: &str) -> i64 {
        self.0.stats.get_self(key)
    }

    fn get_aggregated(&self, key: &str) -> i64 {
        ExecutionContext::get_aggregated(self, key)
    }

    fn known_keys_matching(&self, prefix: &str) -> BTreeSet<String> {
        ExecutionContext::known_keys_matching(self, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agexec_core::types::Limit;

    #[test]
    fn aggregation_includes_children() {
        let root = ExecutionContext::new_root("root", LimitSet::default());
        let child = root.spawn_child("child", serde_json::Value::Null);
        root.stats().incr("iterations", 2);
        child.stats().incr("iterations", 3);
        assert_eq!(root.get_aggregated("iterations"), 5);
        assert_eq!(child.get_aggregated("iterations"), 3);
    }

    #[test]
    fn cancel_cascades_to_children() {
        let root = ExecutionContext::new_root("root", LimitSet::default());
        let child = root.spawn_child("child", serde_json::Value::Null);
        let grandchild = child.spawn_child("grandchild", serde_json::Value::Null);
        root.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn termination_reason_first_writer_wins() {
        let root = ExecutionContext::new_root("root", LimitSet::default());
        assert!(root.set_termination_reason(TerminationReason::Success));
        assert!(!root.set_termination_reason(TerminationReason::Cancelled));
        assert_eq!(root.termination_reason(), Some(TerminationReason::Success));
    }

    #[test]
    fn child_limit_exceeded_propagates_to_root_pending() {
        let root = ExecutionContext::new_root(
            "root",
            LimitSet::new(vec![Limit::prefix("input_tokens_for:", 10)]),
        );
        let child = root.spawn_child("child", serde_json::Value::Null);
        child.stats().incr("input_tokens_for:beta", 11);
        let exceeded = child.evaluate_limits().expect("child should see overage");
        assert_eq!(exceeded.matched_key, "input_tokens_for:beta");
        assert!(root.take_pending_limit().is_some());
    }
}
