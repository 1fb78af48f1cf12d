//! Counter bookkeeping at each checkpoint named in spec §4.5.
//!
//! These are convenience methods on `ExecutionContext` rather than part of
//! `Executor` itself: the model call, the parse, and the tool invocation are
//! performed by the `AgentLoop` implementation (out of scope per spec §1),
//! but the counter-key shape and the checkpoint evaluation are the engine's
//! contract, so the engine provides them as a small instrumentation API the
//! `AgentLoop` calls into around those steps.

use agexec_core::types::ParseErrorKind;

use crate::context::ExecutionContext;
use crate::events::Event;
use crate::limits::ExceededLimit;

impl ExecutionContext {
    pub fn before_model_call(&self, model: &str) {
        self.publish(Event::BeforeModelCall {
            model: model.to_string(),
        });
    }

    /// Record a completed model call's token usage, publish `AfterModelCall`,
    /// and evaluate limits (spec §4.5, checkpoint ★).
    pub fn after_model_call(
        &self,
        model: &str,
        input_tokens: i64,
        output_tokens: i64,
    ) -> Option<ExceededLimit> {
        self.stats().incr("input_tokens", input_tokens);
        self.stats()
            .incr(&format!("input_tokens_for:{model}"), input_tokens);
        self.stats().incr("output_tokens", output_tokens);
        self.stats()
            .incr(&format!("output_tokens_for:{model}"), output_tokens);
        self.publish(Event::AfterModelCall {
            model: model.to_string(),
            input_tokens,
            output_tokens,
        });
        self.evaluate_limits()
    }

    /// Record a failed parse, publish `ParseError`, and evaluate limits.
    pub fn record_parse_error(
        &self,
        kind: ParseErrorKind,
        raw_text: &str,
    ) -> Option<ExceededLimit> {
        let prefix = kind.key_prefix();
        self.stats().incr(&format!("{prefix}_total"), 1);
        self.stats().incr(&format!("{prefix}_consecutive"), 1);
        self.publish(Event::ParseError {
            kind,
            raw_text: raw_text.to_string(),
        });
        self.evaluate_limits()
    }

    /// Reset the consecutive counter for `kind` on a successful parse.
    pub fn record_parse_success(&self, kind: ParseErrorKind) {
        self.stats()
            .reset(&format!("{}_consecutive", kind.key_prefix()));
    }

    /// Publish `BeforeToolCall`, increment the tool-call counters, and
    /// evaluate limits before the tool actually runs.
    pub fn before_tool_call(&self, name: &str, args: &serde_json::Value) -> Option<ExceededLimit> {
        self.stats().incr("tool_calls", 1);
        self.stats().incr(&format!("tool_calls_for:{name}"), 1);
        self.publish(Event::BeforeToolCall {
            name: name.to_string(),
            args: args.clone(),
        });
        self.evaluate_limits()
    }

    /// Record a tool call's outcome, publish `AfterToolCall`, and (on
    /// error) evaluate limits. Success resets the consecutive error
    /// counters, both global and per-tool.
    pub fn after_tool_call(
        &self,
        name: &str,
        args: &serde_json::Value,
        result: &str,
        error: bool,
    ) -> Option<ExceededLimit> {
        let exceeded = if error {
            self.stats().incr("tool_calls_error_total", 1);
            self.stats().incr(&format!("tool_calls_error_for:{name}"), 1);
            self.stats().incr("tool_calls_error_consecutive", 1);
            self.stats()
                .incr(&format!("tool_calls_error_consecutive_for:{name}"), 1);
            self.evaluate_limits()
        } else {
            self.stats().reset("tool_calls_error_consecutive");
            self.stats()
                .reset(&format!("tool_calls_error_consecutive_for:{name}"));
            None
        };
        self.publish(Event::AfterToolCall {
            name: name.to_string(),
            args: args.clone(),
            result: result.to_string(),
            error,
        });
        exceeded
    }

    pub fn validator_called(&self, validator: &str, answer: &str) {
        self.publish(Event::ValidatorCalled {
            validator: validator.to_string(),
            answer: answer.to_string(),
        });
    }

    /// Record a validator's verdict. A rejection increments the rejection
    /// counters and evaluates limits; an acceptance does neither (the
    /// `AgentLoop` is responsible for producing a terminate result).
    pub fn validator_result(
        &self,
        validator: &str,
        answer: &str,
        accepted: bool,
        feedback: Option<String>,
    ) -> Option<ExceededLimit> {
        let exceeded = if accepted {
            None
        } else {
            self.stats().incr("answer_rejected_total", 1);
            self.stats()
                .incr(&format!("answer_rejected_by:{validator}"), 1);
            self.evaluate_limits()
        };
        self.publish(Event::ValidatorResult {
            validator: validator.to_string(),
            answer: answer.to_string(),
            accepted,
            feedback,
        });
        exceeded
    }
}
