//! agexec-core — shared error type and value types used by both
//! `agexec-engine` and any `AgentLoop`/`Model`/`ToolChain` implementation.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
