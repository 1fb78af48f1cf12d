//! End-to-end scenarios S1-S6 from the specification's testable properties
//! section, each seeded with the literal inputs given there.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use agexec_core::types::{Limit, ParseErrorKind};
use agexec_core::Result;
use agexec_engine::events::Event;
use agexec_engine::{AgentLoop, ExecutionContext, Executor, LimitSet, LoopStep, TerminationReason};

struct AlwaysToolThenAnswer {
    answer_at: i64,
}

#[async_trait]
impl AgentLoop for AlwaysToolThenAnswer {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        if ctx.iteration() >= self.answer_at {
            return Ok(LoopStep::Terminate(json!("done")));
        }
        ctx.before_tool_call("t", &json!({}));
        ctx.after_tool_call("t", &json!({}), "ok", false);
        Ok(LoopStep::Continue("next".to_string()))
    }
}

/// S1. Iteration cap.
#[tokio::test]
async fn s1_iteration_cap() {
    let limits = LimitSet::new(vec![Limit::exact("iterations", 2)]);
    let ctx = ExecutionContext::new_root("root", limits);
    let mut events = ctx.subscribe();

    Executor::new()
        .execute(&AlwaysToolThenAnswer { answer_at: 5 }, &ctx)
        .await;

    assert_eq!(ctx.iteration(), 3);
    let exceeded = ctx.exceeded_limit().expect("should have exceeded a limit");
    assert_eq!(exceeded.matched_key, "iterations");
    assert!(matches!(
        ctx.termination_reason(),
        Some(TerminationReason::LimitExceeded(_))
    ));

    let mut limit_exceeded_count = 0;
    while let Ok(envelope) = events.try_recv() {
        if matches!(envelope.event, Event::LimitExceeded { .. }) {
            limit_exceeded_count += 1;
        }
    }
    assert_eq!(limit_exceeded_count, 1);
}

struct ChildCallsModel {
    token_script: Vec<(i64, i64)>,
}

#[async_trait]
impl AgentLoop for ChildCallsModel {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        let idx = (ctx.iteration() - 1) as usize;
        let (input, output) = self.token_script[idx.min(self.token_script.len() - 1)];
        ctx.before_model_call("beta");
        ctx.after_model_call("beta", input, output);
        Ok(LoopStep::Continue("next".to_string()))
    }
}

struct SpawnsChildCallingModel;

#[async_trait]
impl AgentLoop for SpawnsChildCallingModel {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        if ctx.iteration() == 1 {
            let child = ctx.spawn_child("child", serde_json::Value::Null);
            Executor::new()
                .execute(
                    &ChildCallsModel {
                        token_script: vec![(300, 10), (300, 10), (500, 10)],
                    },
                    &child,
                )
                .await;
        }
        Ok(LoopStep::Terminate(json!("done")))
    }
}

/// S2. Token aggregation across a spawned child.
#[tokio::test]
async fn s2_token_aggregation_across_child() {
    let limits = LimitSet::new(vec![Limit::prefix("input_tokens_for:beta", 1000)]);
    let root = ExecutionContext::new_root("root", limits);
    let mut events = root.subscribe();

    Executor::new().execute(&SpawnsChildCallingModel, &root).await;

    let exceeded = root.exceeded_limit().expect("root should see the overage");
    assert_eq!(exceeded.matched_key, "input_tokens_for:beta");
    assert_eq!(exceeded.observed, 1100);

    let child = root.children().into_iter().next().unwrap();
    assert_eq!(child.get_aggregated("input_tokens_for:beta"), 1100);
    let mut limit_events = 0;
    while let Ok(envelope) = events.try_recv() {
        if matches!(envelope.event, Event::LimitExceeded { .. }) {
            limit_events += 1;
        }
    }
    assert_eq!(limit_events, 1);
}

struct ChildRunsThreeIterations;

#[async_trait]
impl AgentLoop for ChildRunsThreeIterations {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        if ctx.iteration() >= 3 {
            Ok(LoopStep::Terminate(json!("child done")))
        } else {
            Ok(LoopStep::Continue("next".to_string()))
        }
    }
}

struct RootSelfScoped;

#[async_trait]
impl AgentLoop for RootSelfScoped {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        if ctx.iteration() == 1 {
            let child = ctx.spawn_child("child", serde_json::Value::Null);
            Executor::new().execute(&ChildRunsThreeIterations, &child).await;
            Ok(LoopStep::Continue("next".to_string()))
        } else {
            Ok(LoopStep::Terminate(json!("root done")))
        }
    }
}

/// S3. Self-scoped iteration limit is unaffected by a child's iterations.
#[tokio::test]
async fn s3_self_scoped_iteration_limit() {
    let limits = LimitSet::new(vec![Limit::exact("iterations$self", 4)]);
    let root = ExecutionContext::new_root("root", limits);

    Executor::new().execute(&RootSelfScoped, &root).await;

    assert_eq!(root.termination_reason(), Some(TerminationReason::Success));
    assert_eq!(root.stats().get_self("iterations"), 2);
    assert_eq!(root.get_aggregated("iterations"), 5);
    assert!(root.exceeded_limit().is_none());
}

struct ParseErrorSequence {
    fails: Vec<bool>,
}

#[async_trait]
impl AgentLoop for ParseErrorSequence {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        let idx = (ctx.iteration() - 1) as usize;
        if self.fails[idx] {
            ctx.record_parse_error(ParseErrorKind::Format, "garbage");
        } else {
            ctx.record_parse_success(ParseErrorKind::Format);
        }
        if idx + 1 == self.fails.len() {
            Ok(LoopStep::Terminate(json!("done")))
        } else {
            Ok(LoopStep::Continue("next".to_string()))
        }
    }
}

/// S4. Consecutive counters reset on success and never trip a ceiling they
/// never sustain for more than the configured run length.
#[tokio::test]
async fn s4_consecutive_reset() {
    let limits = LimitSet::new(vec![Limit::exact("format_parse_error_consecutive", 2)]);
    let root = ExecutionContext::new_root("root", limits);

    Executor::new()
        .execute(
            &ParseErrorSequence {
                fails: vec![true, true, false, true, false],
            },
            &root,
        )
        .await;

    assert_eq!(root.termination_reason(), Some(TerminationReason::Success));
    assert!(root.exceeded_limit().is_none());
}

struct PerToolErrorSequence {
    outcomes: Mutex<std::collections::VecDeque<bool>>,
}

#[async_trait]
impl AgentLoop for PerToolErrorSequence {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        let is_error = self.outcomes.lock().unwrap().pop_front().unwrap();
        ctx.before_tool_call("broken", &json!({}));
        ctx.after_tool_call(
            "broken",
            &json!({}),
            if is_error { "boom" } else { "ok" },
            is_error,
        );
        if self.outcomes.lock().unwrap().is_empty() {
            Ok(LoopStep::Terminate(json!("done")))
        } else {
            Ok(LoopStep::Continue("next".to_string()))
        }
    }
}

/// S5. Per-tool error limit, with prior successes not contributing.
#[tokio::test]
async fn s5_per_tool_error_limit() {
    let limits = LimitSet::new(vec![Limit::prefix("tool_calls_error_for:", 1)]);
    let root = ExecutionContext::new_root("root", limits);

    Executor::new()
        .execute(
            &PerToolErrorSequence {
                outcomes: Mutex::new(vec![false, false, true, true].into()),
            },
            &root,
        )
        .await;

    assert_eq!(root.iteration(), 4);
    let exceeded = root.exceeded_limit().expect("second error should exceed");
    assert_eq!(exceeded.matched_key, "tool_calls_error_for:broken");
    assert_eq!(exceeded.observed, 2);
}

struct ChildRejectsTwice;

#[async_trait]
impl AgentLoop for ChildRejectsTwice {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        ctx.validator_called("child_v", "child answer");
        ctx.validator_result("child_v", "child answer", false, None);
        Ok(LoopStep::Continue("next".to_string()))
    }
}

struct MainRejectsThenSpawns;

#[async_trait]
impl AgentLoop for MainRejectsThenSpawns {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        if ctx.iteration() <= 3 {
            ctx.validator_called("main_v", "main answer");
            ctx.validator_result("main_v", "main answer", false, None);
            Ok(LoopStep::Continue("next".to_string()))
        } else {
            let child = ctx.spawn_child("child", serde_json::Value::Null);
            Executor::new().execute(&ChildRejectsTwice, &child).await;
            Ok(LoopStep::Continue("next".to_string()))
        }
    }
}

/// S6. A validator-scoped rejection limit on a descendant terminates the
/// root without being affected by unrelated rejections on a different
/// validator key.
#[tokio::test]
async fn s6_validator_scoped_rejection() {
    let limits = LimitSet::new(vec![Limit::exact("answer_rejected_by:child_v", 1)]);
    let root = ExecutionContext::new_root("root", limits);

    Executor::new().execute(&MainRejectsThenSpawns, &root).await;

    let exceeded = root.exceeded_limit().expect("child rejections should exceed");
    assert_eq!(exceeded.matched_key, "answer_rejected_by:child_v");
    assert_eq!(exceeded.observed, 2);
    assert_eq!(root.stats().get_self("answer_rejected_by:main_v"), 3);
}

struct CancelsSelfMidIteration;

#[async_trait]
impl AgentLoop for CancelsSelfMidIteration {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        ctx.cancel();
        Ok(LoopStep::Continue("keep going".to_string()))
    }
}

/// Universal property 6: cancellation actually terminates a run, and does
/// so at the next loop boundary rather than mid-iteration.
#[tokio::test]
async fn property6_cancellation_terminates_the_run() {
    let root = ExecutionContext::new_root("root", LimitSet::default());
    let mut events = root.subscribe();

    Executor::new().execute(&CancelsSelfMidIteration, &root).await;

    assert_eq!(root.iteration(), 1, "the in-flight iteration runs to completion");
    assert_eq!(root.termination_reason(), Some(TerminationReason::Cancelled));

    let mut saw_cancelled_after_execution = false;
    while let Ok(envelope) = events.try_recv() {
        if matches!(envelope.event, Event::AfterExecution(TerminationReason::Cancelled)) {
            saw_cancelled_after_execution = true;
        }
    }
    assert!(saw_cancelled_after_execution);
}

struct ChildPublishesThenTerminates;

#[async_trait]
impl AgentLoop for ChildPublishesThenTerminates {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        ctx.before_tool_call("noop", &json!({}));
        ctx.after_tool_call("noop", &json!({}), "ok", false);
        Ok(LoopStep::Terminate(json!("child done")))
    }
}

struct SpawnsChildThenFinishes;

#[async_trait]
impl AgentLoop for SpawnsChildThenFinishes {
    async fn next(&self, ctx: &ExecutionContext) -> Result<LoopStep> {
        let child = ctx.spawn_child("child", serde_json::Value::Null);
        Executor::new().execute(&ChildPublishesThenTerminates, &child).await;
        Ok(LoopStep::Terminate(json!("parent done")))
    }
}

/// Universal property 5: a descendant's events reach an ancestor's bus
/// before the ancestor's own later events — a subscriber several levels up
/// still sees causal order preserved.
#[tokio::test]
async fn property5_child_events_precede_parents_later_events_on_the_parent_bus() {
    let root = ExecutionContext::new_root("root", LimitSet::default());
    let mut events = root.subscribe();

    Executor::new().execute(&SpawnsChildThenFinishes, &root).await;

    let mut collected = Vec::new();
    while let Ok(envelope) = events.try_recv() {
        collected.push(envelope);
    }

    let child_event_idx = collected
        .iter()
        .position(|e| e.origin == "child" && matches!(e.event, Event::BeforeToolCall { .. }))
        .expect("the child's event should reach the parent's bus");
    let parent_after_iteration_idx = collected
        .iter()
        .position(|e| {
            e.origin == "root" && matches!(e.event, Event::AfterIteration { iteration: 1, .. })
        })
        .expect("the parent's own AfterIteration should be observed");

    assert!(
        child_event_idx < parent_after_iteration_idx,
        "the child's event must be observed before the parent's next event"
    );
}
