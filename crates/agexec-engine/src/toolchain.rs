//! The `ToolChain` collaborator (spec §6) — individual tool implementations
//! are out of scope; this is the shape the agent loop dispatches through.

use async_trait::async_trait;

use agexec_core::types::{ToolCall, ToolOutcome};
use agexec_core::Result;

use crate::context::ExecutionContext;

#[async_trait]
pub trait ToolChain: Send + Sync {
    fn name(&self) -> &str;
    fn available_tools_prompt(&self) -> String;
    async fn execute(&self, ctx: &ExecutionContext, call: ToolCall) -> Result<ToolOutcome>;
}
