//! A minimal ReAct-style `AgentLoop`: one model call per iteration, parsed
//! into either a tool call or an answer. When a reply's text would parse as
//! both, the tool call wins (SPEC_FULL.md §9's resolution of the priority
//! open question) — but the line format here only ever yields one or the
//! other, so this only matters for a richer `TextFormat`.
//!
//! An answer is not terminal by itself: it is first offered to
//! `Termination::should_terminate`, and if that signals termination and a
//! `Validator` is configured, the answer must also be accepted by the
//! validator before the loop actually stops.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use agexec_core::types::ParseErrorKind;
use agexec_core::Result;
use agexec_engine::{
    AgentLoop, ExecutionContext, LoopStep, Model, ModelRequest, Termination, TerminationSignal,
    TextFormat, ToolChain, Validator,
};

pub struct ReactAgentLoop {
    pub model: Arc<dyn Model>,
    pub model_name: String,
    pub toolchain: Arc<dyn ToolChain>,
    pub format: Box<dyn TextFormat>,
    pub termination: Box<dyn Termination>,
    pub validator: Option<Arc<dyn Validator>>,
}

#[async_trait]
impl AgentLoop for ReactAgentLoop {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        ctx.before_model_call(&self.model_name);
        let response = self
            .model
            .generate(
                ctx,
                ModelRequest {
                    model: self.model_name.clone(),
                    messages: vec![format!("iteration {}", ctx.iteration())],
                },
            )
            .await?;
        ctx.after_model_call(&self.model_name, response.input_tokens, response.output_tokens);

        let sections = match self.format.parse(&response.text) {
            Ok(sections) => sections,
            Err(failure) => {
                ctx.record_parse_error(failure.kind, &failure.raw_text);
                return Ok(LoopStep::Continue(format!(
                    "format error: {} ({})",
                    failure.message,
                    self.format.describe_structure()
                )));
            }
        };
        ctx.record_parse_success(ParseErrorKind::Format);

        if let Some(tool_line) = sections.0.get("tool").and_then(|v| v.first()) {
            let (name, rest) = tool_line.split_once(' ').unwrap_or((tool_line.as_str(), ""));
            let call = agexec_core::types::ToolCall {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                arguments: json!({ "text": rest, "reason": rest }),
            };
            ctx.before_tool_call(&call.name, &call.arguments);
            let outcome = self.toolchain.execute(ctx, call.clone()).await?;
            ctx.after_tool_call(&call.name, &call.arguments, &outcome.text, outcome.is_error);
            return Ok(LoopStep::Continue(format!("observation: {}", outcome.text)));
        }

        if let Some(answer) = sections.0.get("answer").and_then(|v| v.first()) {
            return match self.termination.should_terminate(answer) {
                TerminationSignal::Continue => {
                    Ok(LoopStep::Continue(format!("not done yet: {answer}")))
                }
                TerminationSignal::Terminate(value) => match &self.validator {
                    None => Ok(LoopStep::Terminate(value)),
                    Some(validator) => {
                        ctx.validator_called(validator.name(), answer);
                        let outcome = validator.validate(ctx, answer).await;
                        ctx.validator_result(
                            validator.name(),
                            answer,
                            outcome.accepted,
                            outcome.feedback.first().cloned(),
                        );
                        if outcome.accepted {
                            Ok(LoopStep::Terminate(value))
                        } else {
                            Ok(LoopStep::Continue(outcome.feedback.join("; ")))
                        }
                    }
                },
            };
        }

        Ok(LoopStep::Continue(response.text))
    }
}
