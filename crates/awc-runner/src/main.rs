//! `awc-runner` executes a runner configuration written by the copilot-sdk
//! execution step.
//!
//! Prints exactly one `{success, message, error?}` JSON document on stdout
//! and exits 0 on success, 1 otherwise. Logs and streamed assistant text go
//! to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use awc_core::telemetry::{init_tracing, level_for};
use awc_runner::{load_config, ProcessClient, RunOutput, Runner};

#[derive(Parser)]
#[command(name = "awc-runner")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run an agent session from a compiled runner configuration", long_about = None)]
struct Cli {
    /// Runner configuration file (reads stdin when omitted)
    #[arg(long, env = "AWC_RUNNER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));

    let output = match run(cli).await {
        Ok(message) => RunOutput::success(message),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "runner failed");
            RunOutput::failure("awc-runner failed", format!("{e:#}"))
        }
    };
    println!("{}", output.to_json());

    if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(cli: Cli) -> Result<String> {
    let config = load_config(cli.config.as_deref()).context("failed to load runner config")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let mut client = ProcessClient::from_config(&config);
    let runner = Runner::new(config);
    let outcome = runner
        .run(&mut client, cancel)
        .await
        .context("agent session failed")?;

    let m = &outcome.metrics;
    Ok(format!(
        "session {} completed: {} turns, {} tokens, {} tool calls",
        outcome.session_id.as_deref().unwrap_or("unknown"),
        m.turns,
        m.total_tokens,
        m.total_tool_calls
    ))
}
