//! LimitSet and the LimitEvaluator rule (spec §3, §4.2).

use agexec_core::types::{Limit, LimitKind};
use std::collections::BTreeSet;

/// An ordered, immutable list of limit declarations, attached only to a
/// root `ExecutionContext`.
#[derive(Clone, Debug, Default)]
pub struct LimitSet {
    limits: Vec<Limit>,
}

impl LimitSet {
    pub fn new(limits: Vec<Limit>) -> Self {
        Self { limits }
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Limit> {
        self.limits.iter()
    }
}

/// The final disposition of an execution (spec §7).
#[derive(Clone, Debug, PartialEq)]
pub enum TerminationReason {
    Success,
    LimitExceeded(ExceededLimit),
    Cancelled,
    Error(String),
}

/// The specific limit, matched key, and observed value that tripped a
/// `TerminationReason::LimitExceeded`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExceededLimit {
    pub limit: Limit,
    pub matched_key: String,
    pub observed: i64,
}

/// Anything a `Limit` can be evaluated against: a context's own counters
/// plus the aggregated view across its subtree. Implemented by
/// `ExecutionContext` in `context.rs`; kept as a trait here so this module
/// has no dependency on the context tree's ownership structure.
pub trait StatsView {
    fn get_self(&self, key: &str) -> i64;
    fn get_aggregated(&self, key: &str) -> i64;
    /// All keys known anywhere in this context's subtree that start with
    /// `prefix`, in lexicographic order.
    fn known_keys_matching(&self, prefix: &str) -> BTreeSet<String>;
}

/// Given the root's `LimitSet` and a stats view, return the first limit (by
/// declaration order) whose observation strictly exceeds its ceiling.
pub fn evaluate(limits: &LimitSet, view: &dyn StatsView) -> Option<ExceededLimit> {
    for limit in limits.iter() {
        match limit.kind {
            LimitKind::ExactKey => {
                let observed = observe_exact(view, &limit.key);
                if observed > limit.max {
                    return Some(ExceededLimit {
                        limit: limit.clone(),
                        matched_key: strip_self_suffix(&limit.key).to_string(),
                        observed,
                    });
                }
            }
            LimitKind::KeyPrefix => {
                if let Some((matched_key, observed)) = observe_prefix(view, &limit.key, limit.max)
                {
                    return Some(ExceededLimit {
                        limit: limit.clone(),
                        matched_key,
                        observed,
                    });
                }
            }
        }
    }
    None
}

const SELF_SUFFIX: &str = "$self";

fn strip_self_suffix(key: &str) -> &str {
    key.strip_suffix(SELF_SUFFIX).unwrap_or(key)
}

fn observe_exact(view: &dyn StatsView, key: &str) -> i64 {
    if let Some(stripped) = key.strip_suffix(SELF_SUFFIX) {
        view.get_self(stripped)
    } else {
        view.get_aggregated(key)
    }
}

/// Iterate known counters starting with `prefix` (in lexicographic order)
/// and return the first whose value strictly exceeds `max`, along with that
/// value. `$self`-suffixed prefixes observe the context's own counters only.
fn observe_prefix(view: &dyn StatsView, raw_prefix: &str, max: i64) -> Option<(String, i64)> {
    let (prefix, self_scoped) = match raw_prefix.strip_suffix(SELF_SUFFIX) {
        Some(stripped) => (stripped, true),
        None => (raw_prefix, false),
    };
    for key in view.known_keys_matching(prefix) {
        let observed = if self_scoped {
            view.get_self(&key)
        } else {
            view.get_aggregated(&key)
        };
        if observed > max {
            return Some((key, observed));
        }
    }
    None
}
