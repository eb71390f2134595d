//! Runner configuration document.
//!
//! Written into the copilot-sdk execution step and read back by
//! `awc-runner`. `available_tools` absent means unrestricted; present and
//! empty means no extra tools.

use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;

pub const DEFAULT_CLI_PATH: &str = "copilot";
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn default_cli_path() -> String {
    DEFAULT_CLI_PATH.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// May be injected at run time when not configured at compile time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub working_directory: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Absolute path; must exist and be non-empty when the runner starts.
    #[serde(default)]
    pub prompt_file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_tools: Option<Vec<String>>,

    /// File whose `mcpServers` key maps server name to connection config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config_path: Option<String>,

    #[serde(default)]
    pub streaming: bool,

    /// Seconds; zero or absent selects the runner default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_file: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            github_token: None,
            model: None,
            working_directory: String::new(),
            log_level: default_log_level(),
            log_dir: None,
            prompt_file: String::new(),
            available_tools: None,
            excluded_tools: None,
            mcp_config_path: None,
            streaming: false,
            timeout: None,
            metrics_file: None,
        }
    }
}

impl RunnerConfig {
    /// Capabilities encoded by `available_tools`.
    pub fn capabilities(&self) -> Capabilities {
        match &self.available_tools {
            None => Capabilities::Unrestricted,
            Some(tools) => Capabilities::Restricted(tools.iter().cloned().collect()),
        }
    }
}
