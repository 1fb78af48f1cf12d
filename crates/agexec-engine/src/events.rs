//! EventBus and the closed set of lifecycle events (spec §4.4).

use agexec_core::types::{Limit, ParseErrorKind};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::limits::TerminationReason;

/// One of the fixed event kinds an `ExecutionContext` can publish.
#[derive(Clone, Debug)]
pub enum Event {
    BeforeExecution,
    AfterExecution(TerminationReason),
    BeforeIteration(u64),
    AfterIteration { iteration: u64, continued: bool },
    BeforeModelCall { model: String },
    AfterModelCall {
        model: String,
        input_tokens: i64,
        output_tokens: i64,
    },
    BeforeToolCall { name: String, args: serde_json::Value },
    AfterToolCall {
        name: String,
        args: serde_json::Value,
        result: String,
        error: bool,
    },
    ParseError { kind: ParseErrorKind, raw_text: String },
    ValidatorCalled { validator: String, answer: String },
    ValidatorResult {
        validator: String,
        answer: String,
        accepted: bool,
        feedback: Option<String>,
    },
    LimitExceeded {
        limit: Limit,
        observed: i64,
        matched_key: String,
    },
}

/// An event stamped with the name of the context that originated it and a
/// per-origin-context sequence number, so a subscriber several ancestors up
/// can still recover per-context ordering. Mirrors the `seq`-stamped
/// envelope idiom used for agent event logs in the wider ecosystem.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub origin: String,
    pub seq: u64,
    pub event: Event,
}

/// Per-context publish/subscribe. Delivery is synchronous on the publishing
/// thread: a subscriber that needs heavy work must hand off to its own
/// queue rather than block here (spec §5, §9).
pub struct EventBus {
    seq: AtomicU64,
    sender: broadcast::Sender<Envelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        // Generous lag buffer: subscribers that fall behind lose the
        // oldest unread event rather than blocking the publisher.
        let (sender, _) = broadcast::channel(1024);
        Self {
            seq: AtomicU64::new(0),
            sender,
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Stamp `event` as originating from `origin` and deliver it to this
    /// bus's own subscribers. Returns the envelope so the caller can
    /// forward the exact same envelope up the parent chain.
    pub fn publish_origin(&self, origin: &str, event: Event) -> Envelope {
        let envelope = Envelope {
            origin: origin.to_string(),
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            event,
        };
        self.forward(envelope.clone());
        envelope
    }

    /// Deliver an envelope that originated elsewhere (a descendant) to this
    /// bus's subscribers, without altering its origin or sequence number.
    pub fn forward(&self, envelope: Envelope) {
        // A broadcast channel with no receivers errors; that's expected
        // when nobody is listening and is not a fault.
        let _ = self.sender.send(envelope);
    }
}
