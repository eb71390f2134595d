//! awc-runner library
//!
//! Executes a compiled runner configuration: loads and expands the config
//! document, drives one agent session through an [`AgentClient`], aggregates
//! session metrics and reports a single JSON result.

pub mod config;
pub mod error;
pub mod mcp;
pub mod metrics;
pub mod output;
pub mod process;
pub mod runner;
pub mod session;

pub use config::{effective_timeout, expand_env, load_config, parse_config, DEFAULT_TIMEOUT};
pub use error::{Result, RunnerError};
pub use mcp::{load_mcp_servers, McpServers};
pub use metrics::{Metrics, MetricsSnapshot};
pub use output::RunOutput;
pub use process::ProcessClient;
pub use runner::{RunOutcome, Runner};
pub use session::{AgentClient, AgentSession, EventBus, SessionEvent, SessionOptions, Subscription};
