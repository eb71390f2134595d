//! awc - Agentic Workflow Compiler CLI
//!
//! The `awc` command compiles a normalized workflow model into CI steps.
//!
//! ## Commands
//!
//! - `compile`: Emit installation and execution steps for a workflow
//! - `engines`: List supported engines and their capability flags
//! - `tools`: Show the resolved tool permissions for a workflow

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use awc_core::constants::DEFAULT_AGENT_LOG_FILE;
use awc_core::telemetry::{init_tracing, level_for};
use awc_core::{CompileSpan, EngineRegistry, WorkflowModel};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::warn;

#[derive(Parser)]
#[command(name = "awc")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agentic workflow compiler", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a workflow into installation and execution steps
    Compile {
        /// Workflow model file (.yml, .yaml or .json)
        #[arg(short, long)]
        workflow: PathBuf,

        /// File the agent output is teed into
        #[arg(long, default_value = DEFAULT_AGENT_LOG_FILE)]
        log_file: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },

    /// List supported engines
    Engines,

    /// Show resolved tool permissions for a workflow
    Tools {
        /// Workflow model file (.yml, .yaml or .json)
        #[arg(short, long)]
        workflow: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));

    match cli.command {
        Commands::Compile {
            workflow,
            log_file,
            format,
        } => cmd_compile(&workflow, &log_file, format),
        Commands::Engines => cmd_engines(cli.json),
        Commands::Tools { workflow } => cmd_tools(&workflow, cli.json),
    }
}

/// Read a workflow model; `.json` files are parsed as JSON, anything else as YAML.
fn load_workflow(path: &Path) -> Result<WorkflowModel> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let workflow = if is_json {
        serde_json::from_str(&raw).context("Invalid workflow JSON")?
    } else {
        serde_yaml::from_str(&raw).context("Invalid workflow YAML")?
    };
    Ok(workflow)
}

#[derive(Serialize)]
struct CompileOutput<'a> {
    engine: &'a str,
    installation: &'a [awc_core::Step],
    execution: &'a [awc_core::Step],
}

fn cmd_compile(path: &Path, log_file: &str, format: Format) -> Result<()> {
    let workflow = load_workflow(path)?;
    let _span = CompileSpan::enter(&workflow.name);

    let compiled = EngineRegistry::global()
        .compile(&workflow, log_file)
        .with_context(|| format!("Failed to compile {}", path.display()))?;
    for warning in &compiled.warnings {
        warn!("{warning}");
    }

    let output = CompileOutput {
        engine: &compiled.engine,
        installation: &compiled.installation,
        execution: &compiled.execution,
    };
    let rendered = match format {
        Format::Yaml => serde_yaml::to_string(&output)?,
        Format::Json => serde_json::to_string_pretty(&output)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

#[derive(Serialize)]
struct EngineRow {
    id: &'static str,
    display_name: &'static str,
    experimental: bool,
    default_version: &'static str,
    features: awc_core::EngineFeatures,
}

fn cmd_engines(json: bool) -> Result<()> {
    let rows: Vec<EngineRow> = EngineRegistry::global()
        .engines()
        .map(|e| EngineRow {
            id: e.id(),
            display_name: e.display_name(),
            experimental: e.is_experimental(),
            default_version: e.profile().default_version,
            features: e.features(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:<12} {:<20} {:<9} {:<6} {:<6} {:<6} {:<6} {:<6} {:<8} {:<7} {}",
        "ID", "NAME", "VERSION", "TOOLS", "TURNS", "FETCH", "SEARCH", "HTTP", "FIREWALL", "PLUGINS", "GATEWAY"
    );
    let flag = |b: bool| if b { "yes" } else { "-" };
    for row in &rows {
        let f = row.features;
        let name = if row.experimental {
            format!("{} (exp)", row.display_name)
        } else {
            row.display_name.to_string()
        };
        println!(
            "{:<12} {:<20} {:<9} {:<6} {:<6} {:<6} {:<6} {:<6} {:<8} {:<7} {}",
            row.id,
            name,
            row.default_version,
            flag(f.tools_allowlist),
            flag(f.max_turns),
            flag(f.web_fetch),
            flag(f.web_search),
            flag(f.http_transport),
            flag(f.firewall),
            flag(f.plugins),
            f.llm_gateway_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}

fn cmd_tools(path: &Path, json: bool) -> Result<()> {
    let workflow = load_workflow(path)?;
    let engine = EngineRegistry::global().lookup(&workflow.engine.id)?;
    let capabilities = engine.resolve_capabilities(&workflow);

    if json {
        println!("{}", serde_json::to_string(&capabilities)?);
        return Ok(());
    }
    match capabilities.tokens() {
        None => println!("unrestricted"),
        Some(tokens) if tokens.is_empty() => println!("(no tools)"),
        Some(tokens) => {
            for token in tokens {
                println!("{token}");
            }
        }
    }
    Ok(())
}
