//! The `Model` collaborator (spec §6) — the LLM transport is out of scope;
//! only the shape the agent loop calls through is defined here.

use async_trait::async_trait;

use agexec_core::Result;

use crate::context::ExecutionContext;

#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ModelResponse {
    pub text: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[async_trait]
pub trait Model: Send + Sync {
    async fn generate(&self, ctx: &ExecutionContext, request: ModelRequest) -> Result<ModelResponse>;
}
