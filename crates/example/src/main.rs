//! Face-recognition stack CLI.
//!
//! Plans or applies the face search stack against a simulated account.
//!
//! # Usage
//!
//! ```bash
//! face-api --account 123456789012 --plan
//! face-api --region eu-west-1 --flaky
//! face-api --fail-at function.search
//! face-api --json --reveal
//! ```

#![expect(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "command-line front end reports to the terminal"
)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use example::report::{OutputFormat, render_outputs};
use example::{SimulatedCloud, face_stack};
use strata_apply::hooks::{EvaluationHooks, install_tracing_observer};
use strata_apply::{CancellationToken, Evaluator};
use strata_core::{StackConfig, TracingFormat, TracingSetup};
use strata_graph::ResourceId;

#[derive(Debug, Parser)]
#[command(name = "face-api", about = "Provision the face search stack")]
struct Args {
    /// Account the bucket name is derived from.
    #[arg(long, env = "ACCOUNT_ID", default_value = "000000000000")]
    account: String,

    /// Overrides the configured region.
    #[arg(long)]
    region: Option<String>,

    /// Makes the provider reject this resource, given as `type.name`.
    #[arg(long, value_name = "RESOURCE")]
    fail_at: Option<String>,

    /// Throttles the first provider call.
    #[arg(long)]
    flaky: bool,

    /// Prints the plan instead of applying it.
    #[arg(long)]
    plan: bool,

    /// Prints outputs as JSON, sensitive values redacted.
    #[arg(long)]
    json: bool,

    /// With `--json`, prints sensitive values in full.
    #[arg(long, requires = "json")]
    reveal: bool,

    /// Log format: pretty, compact or json.
    #[arg(long, env = "STRATA_LOG_FORMAT", default_value = "pretty")]
    log_format: TracingFormat,
}

fn parse_resource(raw: &str) -> Result<ResourceId, String> {
    match raw.split_once('.') {
        Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
            Ok(ResourceId::new(resource_type, name))
        }
        _ => Err(format!("expected `type.name`, got `{raw}`")),
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = StackConfig::from_env()?;
    if let Some(region) = args.region {
        config = config.with_region(region);
    }
    config.validate()?;
    TracingSetup::for_config(&config)
        .with_format(args.log_format)
        .init();

    let stack = face_stack(&config, &args.account)?;
    let graph = stack.graph.build()?;

    let hooks = Arc::new(EvaluationHooks::new());
    install_tracing_observer(&hooks)?;
    let token = CancellationToken::new();
    let evaluator = Evaluator::new(Arc::new(config.clone()))
        .with_hooks(hooks)
        .with_cancellation(token.clone());

    if args.plan {
        println!("{}", evaluator.plan(&graph));
        return Ok(());
    }

    let mut cloud = SimulatedCloud::new(config.region(), &args.account);
    if let Some(raw) = args.fail_at.as_deref() {
        let resource = parse_resource(raw)?;
        if !graph.contains(&resource) {
            return Err(format!("{resource} is not declared by the stack").into());
        }
        cloud = cloud.with_failure_at(resource);
    }
    if args.flaky {
        cloud = cloud.with_flaky_start();
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing the current resource");
            token.cancel();
        }
    });

    let results = evaluator.evaluate(&graph, &cloud).await?;
    let outputs = stack.outputs.export(&results)?;

    let format = match (args.json, args.reveal) {
        (true, true) => OutputFormat::RevealedJson,
        (true, false) => OutputFormat::Json,
        (false, _) => OutputFormat::Text,
    };
    println!("{}", render_outputs(&outputs, results.len(), format));
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
