//! Agexec demo — runs a scripted ReAct agent through the engine and prints
//! the resulting stats and termination reason.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agexec_core::types::Limit;
use agexec_demo::{DemoTermination, DemoToolChain, DemoValidator, LineFormat, ReactAgentLoop, ScriptedModel};
use agexec_engine::{AgentConfig, ExecutionContext, Executor, LimitSet, Validator};

#[derive(Parser)]
#[command(name = "agexec-demo", about = "Run a scripted agent loop through the engine")]
struct Cli {
    /// Maximum iterations before the run is force-terminated.
    #[arg(long, default_value_t = 10)]
    max_iterations: i64,

    /// Model name the scripted model answers to.
    #[arg(long, default_value = "demo-model")]
    model: String,

    /// Run without a validator in front of termination.
    #[arg(long)]
    disable_validator: bool,

    /// Run without a termination section configured (rejected by
    /// `AgentConfig::build` unless the validator is also disabled).
    #[arg(long)]
    disable_termination_section: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agexec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AgentConfig::build(
        &cli.model,
        !cli.disable_validator,
        !cli.disable_termination_section,
    )?;

    let validator: Option<Arc<dyn Validator>> = if config.has_validator {
        Some(Arc::new(DemoValidator::new(1)))
    } else {
        None
    };

    let model = Arc::new(ScriptedModel::new(vec![
        "tool: echo hello",
        "tool: echo world",
        "tool: fail oops",
        "answer: first draft",
        "answer: final answer",
    ]));
    let agent_loop = ReactAgentLoop {
        model,
        model_name: config.default_model.clone(),
        toolchain: Arc::new(DemoToolChain),
        format: Box::new(LineFormat),
        termination: Box::new(DemoTermination),
        validator,
    };

    let limits = LimitSet::new(vec![Limit::exact("iterations", cli.max_iterations)]);
    let ctx = ExecutionContext::new_root("demo", limits);
    let mut events = ctx.subscribe();

    tokio::spawn(async move {
        while let Ok(envelope) = events.recv().await {
            tracing::info!(target: "agexec::events", origin = %envelope.origin, seq = envelope.seq, event = ?envelope.event);
        }
    });

    Executor::new().execute(&agent_loop, &ctx).await;

    println!("termination: {:?}", ctx.termination_reason());
    println!("iterations (self): {}", ctx.stats().get_self("iterations"));
    println!("tool_calls (self): {}", ctx.stats().get_self("tool_calls"));
    println!(
        "answers rejected (self): {}",
        ctx.stats().get_self("answer_rejected_total")
    );
    Ok(())
}
