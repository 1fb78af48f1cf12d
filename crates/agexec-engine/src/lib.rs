//! agexec-engine — the Executor + ExecutionContext + Stats + Limits core.
//!
//! This crate is the "hard part" named in the specification: the iteration
//! state machine, the counter model, the limit-evaluation rule, and the
//! propagation of counters and limit-exceeded events between parent and
//! child execution contexts. Everything else — prompt rendering, the
//! wire-format codec, tool implementations, the LLM transport, the CLI — is
//! an external collaborator reached through the traits in `model`,
//! `textformat`, `toolchain`, `termination`, and `agent_loop`.

pub mod agent_loop;
pub mod config;
pub mod context;
pub mod events;
pub mod executor;
pub mod instrumentation;
pub mod limits;
pub mod model;
pub mod stats;
pub mod termination;
pub mod toolchain;
pub mod textformat;

pub use agent_loop::{AgentLoop, LoopStep};
pub use config::AgentConfig;
pub use context::ExecutionContext;
pub use events::{Envelope, Event, EventBus};
pub use executor::Executor;
pub use limits::{evaluate, ExceededLimit, LimitSet, StatsView, TerminationReason};
pub use model::{Model, ModelRequest, ModelResponse};
pub use stats::StatsStore;
pub use termination::{Termination, TerminationSignal, ValidationOutcome, Validator};
pub use toolchain::ToolChain;
pub use textformat::{ParseFailure, ParsedSections, TextFormat};

pub use agexec_core::types::{ContextName, Limit, LimitKind, ParseErrorKind, ToolCall, ToolOutcome};
