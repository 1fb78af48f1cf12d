//! Error types shared across the workspace.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("model error: {provider} - {message}")]
    Model { provider: String, message: String },

    #[error("tool error: {name} - {message}")]
    Tool { name: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("agent loop error: {0}")]
    AgentLoop(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn model(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn tool(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
