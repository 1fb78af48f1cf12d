//! The `Termination` collaborator and its optional `Validator` (spec §6).

use async_trait::async_trait;

use crate::context::ExecutionContext;

pub enum TerminationSignal {
    Continue,
    Terminate(serde_json::Value),
}

#[derive(Clone, Debug)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub feedback: Vec<String>,
    pub name: String,
}

pub trait Termination: Send + Sync {
    fn name(&self) -> &str;
    fn should_terminate(&self, content: &str) -> TerminationSignal;
}

#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;
    async fn validate(&self, ctx: &ExecutionContext, content: &str) -> ValidationOutcome;
}
