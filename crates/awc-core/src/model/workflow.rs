//! Normalized workflow model consumed by every engine.
//!
//! Field names follow the workflow front matter (kebab-case). All structures
//! are plain data; engines only ever read them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tools::Tools;
use crate::constants::DEFAULT_PROMPT_FILE;
use crate::secrets::extract_secret_names;
use crate::step::Step;

fn default_prompt_file() -> String {
    DEFAULT_PROMPT_FILE.to_string()
}

fn default_engine_id() -> String {
    "copilot".to_string()
}

fn default_true() -> bool {
    true
}

/// Top-level workflow description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkflowModel {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub tools: Tools,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkPermissions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxConfig>,

    /// Present (even empty) only on agent jobs; detection jobs have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_outputs: Option<SafeOutputsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_inputs: Option<SafeInputsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,

    /// Override for the engine's GitHub token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// MCP server startup timeout, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_startup_timeout: Option<u32>,

    /// Per tool-call timeout, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_timeout: Option<u32>,

    #[serde(default = "default_prompt_file")]
    pub prompt_file: String,
}

impl Default for WorkflowModel {
    fn default() -> Self {
        Self {
            name: String::new(),
            engine: EngineConfig::default(),
            tools: Tools::default(),
            network: None,
            sandbox: None,
            safe_outputs: None,
            safe_inputs: None,
            plugins: None,
            timeout_minutes: None,
            github_token: None,
            tools_startup_timeout: None,
            tools_timeout: None,
            prompt_file: default_prompt_file(),
        }
    }
}

impl WorkflowModel {
    /// A workflow running `engine_id` with no further configuration.
    pub fn for_engine(engine_id: &str) -> Self {
        Self {
            engine: EngineConfig::new(engine_id),
            ..Self::default()
        }
    }

    pub fn firewall(&self) -> Option<&FirewallConfig> {
        self.network
            .as_ref()
            .and_then(|n| n.firewall.as_ref())
            .filter(|f| f.enabled)
    }

    pub fn firewall_enabled(&self) -> bool {
        self.firewall().is_some()
    }

    pub fn agent_sandbox(&self) -> Option<&AgentSandboxConfig> {
        self.sandbox.as_ref().and_then(|s| s.agent.as_ref())
    }

    pub fn safe_outputs_enabled(&self) -> bool {
        self.safe_outputs.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Threat-detection jobs are compiled without a safe-outputs section.
    pub fn is_detection_job(&self) -> bool {
        self.safe_outputs.is_none()
    }

    pub fn safe_inputs_enabled(&self) -> bool {
        self.safe_inputs.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Whether any MCP server will be started for the agent.
    pub fn has_mcp_servers(&self) -> bool {
        !self.tools.mcp_servers().is_empty()
            || self.safe_outputs_enabled()
            || self.safe_inputs_enabled()
    }

    /// Secrets referenced by safe-input tool environments, sorted.
    pub fn safe_input_secrets(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .safe_inputs
            .iter()
            .flat_map(|inputs| inputs.values())
            .flat_map(|tool| tool.env.values())
            .flat_map(|v| extract_secret_names(v))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn plugin_repos(&self) -> &[String] {
        self.plugins.as_ref().map(|p| p.repos.as_slice()).unwrap_or(&[])
    }

    /// Secrets named by token overrides (`github-token` fields), sorted.
    ///
    /// An override replaces a cascade expression verbatim, so the secrets it
    /// names may appear in step environments under the overridden key.
    pub fn override_secret_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            self.github_token.as_deref(),
            self.tools.github_token(),
            self.plugins.as_ref().and_then(|p| p.github_token.as_deref()),
        ]
        .into_iter()
        .flatten()
        .flat_map(extract_secret_names)
        .collect();
        names.sort();
        names.dedup();
        names
    }
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

/// Engine selection. Accepts either a bare id (`engine: claude`) or a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EngineConfigRepr", rename_all = "kebab-case")]
pub struct EngineConfig {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom command replacing installation and the compiled invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Extra arguments appended to the engine invocation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Steps injected ahead of the execution step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

impl EngineConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
            model: None,
            command: None,
            max_turns: None,
            env: BTreeMap::new(),
            args: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Explicitly configured, non-empty model.
    pub fn configured_model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }

    pub fn has_custom_command(&self) -> bool {
        self.command.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(default_engine_id())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EngineConfigRepr {
    Id(String),
    Full(EngineConfigFields),
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct EngineConfigFields {
    #[serde(default = "default_engine_id")]
    id: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    max_turns: Option<u32>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    steps: Vec<Step>,
}

impl From<EngineConfigRepr> for EngineConfig {
    fn from(repr: EngineConfigRepr) -> Self {
        match repr {
            EngineConfigRepr::Id(id) => EngineConfig::new(id),
            EngineConfigRepr::Full(f) => EngineConfig {
                id: f.id,
                version: f.version,
                model: f.model,
                command: f.command,
                max_turns: f.max_turns,
                env: f.env,
                args: f.args,
                steps: f.steps,
            },
        }
    }
}

// ----------------------------------------------------------------------------
// Network and sandbox
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkPermissions {
    /// Allowed domains. The keyword `defaults` expands to the infrastructure set.
    #[serde(default)]
    pub allowed: Vec<String>,

    #[serde(default)]
    pub blocked: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall: Option<FirewallConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FirewallConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Passed through to the firewall after the generated arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// TLS interception for URL-level filtering.
    #[serde(default)]
    pub ssl_bump: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_urls: Vec<String>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: None,
            version: None,
            args: Vec::new(),
            ssl_bump: false,
            allow_urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SandboxConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentSandboxConfig>,
}

/// Overrides for the sandbox wrapping the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentSandboxConfig {
    /// Replaces the default wrapper command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// `host:container[:mode]` mounts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

// ----------------------------------------------------------------------------
// Safe outputs / inputs / plugins
// ----------------------------------------------------------------------------

/// Output kind to its settings.
pub type SafeOutputsConfig = BTreeMap<String, Value>;

/// Tool name to its definition.
pub type SafeInputsConfig = BTreeMap<String, SafeInputTool>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafeInputTool {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub run: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Plugin repositories. Accepts a bare list or `{ repos, github-token }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PluginsRepr", rename_all = "kebab-case")]
pub struct PluginsConfig {
    pub repos: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PluginsRepr {
    List(Vec<String>),
    Full {
        #[serde(default)]
        repos: Vec<String>,
        #[serde(default, rename = "github-token")]
        github_token: Option<String>,
    },
}

impl From<PluginsRepr> for PluginsConfig {
    fn from(repr: PluginsRepr) -> Self {
        match repr {
            PluginsRepr::List(repos) => PluginsConfig {
                repos,
                github_token: None,
            },
            PluginsRepr::Full {
                repos,
                github_token,
            } => PluginsConfig {
                repos,
                github_token,
            },
        }
    }
}
