//! Shared value types that cross the engine/demo crate boundary.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Context name - cheaply cloneable, used as the human-readable identifier
/// for an `ExecutionContext` in logs and events.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ContextName(Arc<str>);

impl ContextName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContextName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ContextName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A tool invocation requested by the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The outcome of running a `ToolCall` through a `ToolChain`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub text: String,
    #[serde(default)]
    pub media: Vec<String>,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: Vec::new(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: Vec::new(),
            is_error: true,
        }
    }
}

/// Which category of parsing failed. Drives the reserved counter-key family
/// (`format_parse_error_*`, `toolchain_parse_error_*`, ...) and which
/// consecutive counter resets on the matching success event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    Format,
    Toolchain,
    Termination,
    Section,
}

impl ParseErrorKind {
    /// The reserved counter-key prefix for this category, e.g.
    /// `format_parse_error` for `ParseErrorKind::Format`.
    pub fn key_prefix(self) -> &'static str {
        match self {
            ParseErrorKind::Format => "format_parse_error",
            ParseErrorKind::Toolchain => "toolchain_parse_error",
            ParseErrorKind::Termination => "termination_parse_error",
            ParseErrorKind::Section => "section_parse_error",
        }
    }
}

/// How a `Limit`'s key is matched against known counters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    ExactKey,
    KeyPrefix,
}

/// A single declared ceiling on a counter or counter family.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Limit {
    pub kind: LimitKind,
    pub key: String,
    pub max: i64,
}

impl Limit {
    pub fn exact(key: impl Into<String>, max: i64) -> Self {
        Self {
            kind: LimitKind::ExactKey,
            key: key.into(),
            max,
        }
    }

    pub fn prefix(key: impl Into<String>, max: i64) -> Self {
        Self {
            kind: LimitKind::KeyPrefix,
            key: key.into(),
            max,
        }
    }
}
