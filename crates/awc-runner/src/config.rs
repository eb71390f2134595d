//! Runner configuration loading.
//!
//! The document is read from a file (or stdin), `$VAR` / `${VAR}` references
//! are expanded from the process environment, and the result is parsed into
//! an [`awc_core::RunnerConfig`]. Unset variables expand to the empty string.

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use awc_core::RunnerConfig;
use regex::{Captures, Regex};

use crate::error::{Result, RunnerError};

/// Session deadline when the configuration does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Env var consulted when the document carries no GitHub token.
pub const TOKEN_ENV_FALLBACK: &str = "COPILOT_GITHUB_TOKEN";

fn env_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("env reference pattern is valid")
    })
}

/// Expand `$VAR` and `${VAR}` using `lookup`.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_ref_regex()
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}

/// Expand against the process environment.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Parse an already-read document.
pub fn parse_config(raw: &str) -> Result<RunnerConfig> {
    let mut config: RunnerConfig = serde_json::from_str(&expand_env(raw))?;

    if config.github_token.as_deref().map_or(true, str::is_empty) {
        config.github_token = std::env::var(TOKEN_ENV_FALLBACK)
            .ok()
            .filter(|t| !t.is_empty());
    }
    if config.prompt_file.trim().is_empty() {
        return Err(RunnerError::Config("prompt_file is required".to_string()));
    }
    Ok(config)
}

/// Load from `path`, or from stdin when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Config(format!("cannot read {}: {e}", path.display()))
        })?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let config = parse_config(&raw)?;
    tracing::debug!(
        cli_path = %config.cli_path,
        prompt_file = %config.prompt_file,
        streaming = config.streaming,
        "runner config loaded"
    );
    Ok(config)
}

/// Configured deadline, or [`DEFAULT_TIMEOUT`] when absent or zero.
pub fn effective_timeout(config: &RunnerConfig) -> Duration {
    config
        .timeout
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}
