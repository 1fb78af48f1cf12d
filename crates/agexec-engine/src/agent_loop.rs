//! The `AgentLoop` interface (spec §4.6) — opaque to the `Executor`.

use async_trait::async_trait;

use agexec_core::Result;

use crate::context::ExecutionContext;

/// What `AgentLoop::next` produced for this iteration.
#[derive(Clone, Debug)]
pub enum LoopStep {
    /// Carry on with another iteration; the prompt text to use next is
    /// opaque to the executor.
    Continue(String),
    /// Stop: the agent is done. The value is whatever the concrete
    /// implementation wants to surface to its caller.
    Terminate(serde_json::Value),
}

/// The one-step contract the ReAct agent implements. `next` is called once
/// per iteration; it may spawn children, call the model any number of
/// times, and invoke any number of tools, recording all of that on `ctx`
/// via the `instrumentation` methods.
#[async_trait]
pub trait AgentLoop: Send + Sync {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep>;
}
