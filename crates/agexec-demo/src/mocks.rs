//! In-memory stand-ins for the collaborators the engine treats as external
//! (spec §1): a scripted `Model`, a scripted `ToolChain`, and a tiny
//! line-based `TextFormat`. None of this ships a real LLM transport or tool
//! sandbox — it exists so `agexec-demo` can drive the engine end to end.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use agexec_core::types::{ToolCall, ToolOutcome};
use agexec_core::Result;
use agexec_engine::{
    ExecutionContext, Model, ModelRequest, ModelResponse, Termination, TerminationSignal,
    ToolChain, ValidationOutcome, Validator,
};

/// Replays a fixed sequence of model replies, one per call. Each reply is
/// either `tool:<name>:<arg>` or `answer:<text>`.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait]
impl Model for ScriptedModel {
    async fn generate(&self, _ctx: &ExecutionContext, request: ModelRequest) -> Result<ModelResponse> {
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "answer:(script exhausted)".to_string());
        tracing::debug!(model = %request.model, %text, "scripted model reply");
        Ok(ModelResponse {
            input_tokens: request.messages.iter().map(|m| m.len() as i64).sum(),
            output_tokens: text.len() as i64,
            text,
        })
    }
}

/// Executes a handful of named demo tools. `fail` always returns an error
/// outcome; everything else echoes its argument back.
pub struct DemoToolChain;

#[async_trait]
impl ToolChain for DemoToolChain {
    fn name(&self) -> &str {
        "demo-tools"
    }

    fn available_tools_prompt(&self) -> String {
        "echo(text), fail(reason)".to_string()
    }

    async fn execute(&self, _ctx: &agexec_engine::ExecutionContext, call: ToolCall) -> Result<ToolOutcome> {
        match call.name.as_str() {
            "fail" => Ok(ToolOutcome::error(
                call.arguments
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("failed")
                    .to_string(),
            )),
            _ => Ok(ToolOutcome::ok(
                call.arguments
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            )),
        }
    }
}

/// Always signals termination on whatever content it is given — the demo
/// doesn't need a richer stopping rule (e.g. "only stop once a `<done>`
/// marker appears") to exercise the collaborator.
pub struct DemoTermination;

impl Termination for DemoTermination {
    fn name(&self) -> &str {
        "demo-termination"
    }

    fn should_terminate(&self, content: &str) -> TerminationSignal {
        TerminationSignal::Terminate(serde_json::json!(content))
    }
}

/// Rejects the first `reject_count` answers it sees, then accepts every
/// answer after that.
pub struct DemoValidator {
    reject_count: i32,
    seen: Mutex<i32>,
}

impl DemoValidator {
    pub fn new(reject_count: i32) -> Self {
        Self {
            reject_count,
            seen: Mutex::new(0),
        }
    }
}

#[async_trait]
impl Validator for DemoValidator {
    fn name(&self) -> &str {
        "demo-validator"
    }

    async fn validate(&self, _ctx: &ExecutionContext, content: &str) -> ValidationOutcome {
        let mut seen = self.seen.lock().unwrap();
        *seen += 1;
        let accepted = *seen > self.reject_count;
        ValidationOutcome {
            accepted,
            feedback: if accepted {
                Vec::new()
            } else {
                vec![format!("try again: \"{content}\" was not convincing enough")]
            },
            name: self.name().to_string(),
        }
    }
}
