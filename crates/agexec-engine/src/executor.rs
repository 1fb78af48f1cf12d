//! The iteration driver (spec §4.5).

use tracing::debug;

use crate::agent_loop::{AgentLoop, LoopStep};
use crate::context::ExecutionContext;
use crate::events::Event;
use crate::limits::TerminationReason;

/// Runs one `AgentLoop` to completion against a root (or child)
/// `ExecutionContext`. Stateless: all observable outcomes are read back off
/// `execCtx` once `execute` returns.
#[derive(Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, agent_loop: &dyn AgentLoop, ctx: &ExecutionContext) {
        ctx.publish(Event::BeforeExecution);

        if ctx.is_cancelled() || ctx.termination_reason().is_some() {
            let reason = ctx
                .termination_reason()
                .unwrap_or(TerminationReason::Cancelled);
            ctx.set_termination_reason(reason);
            self.finish(ctx);
            return;
        }

        loop {
            if ctx.is_cancelled() {
                ctx.set_termination_reason(TerminationReason::Cancelled);
                break;
            }

            let n = ctx.begin_iteration();
            debug!(context = %ctx.name(), iteration = n, "iteration start");
            ctx.publish(Event::BeforeIteration(n as u64));
            ctx.evaluate_limits();

            let step = agent_loop.next(ctx).await;

            let continued = match &step {
                Ok(LoopStep::Continue(_)) => true,
                Ok(LoopStep::Terminate(_)) => false,
                Err(_) => false,
            };
            ctx.publish(Event::AfterIteration {
                iteration: n as u64,
                continued,
            });

            if let Err(e) = step {
                ctx.set_termination_reason(TerminationReason::Error(e.to_string()));
                break;
            }

            // The iteration is not aborted mid-step: any ★ checkpoint
            // exceeded during this iteration is only acted on here, at the
            // next loop boundary (spec §4.5, step 5).
            if let Some(exceeded) = ctx.take_pending_limit() {
                ctx.set_termination_reason(TerminationReason::LimitExceeded(exceeded));
                break;
            }

            if !continued {
                ctx.set_termination_reason(TerminationReason::Success);
                break;
            }
        }

        self.finish(ctx);
    }

    fn finish(&self, ctx: &ExecutionContext) {
        let reason = ctx.termination_reason().unwrap_or(TerminationReason::Success);
        debug!(context = %ctx.name(), reason = ?reason, "execution finished");
        ctx.publish(Event::AfterExecution(reason));
    }
}
