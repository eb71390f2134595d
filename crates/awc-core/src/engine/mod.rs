//! Engines: the closed set of agent backends the compiler targets.
//!
//! Each [`Engine`] pairs an [`EngineKind`] with its static [`EngineProfile`]
//! and a tracing span created at construction. Per-engine behaviour is
//! selected by matching on the kind; there is no open-ended dispatch.
//!
//! # Modules
//!
//! - [`copilot`], [`copilot_sdk`], [`claude`], [`codex`]: profiles and invocation grammar
//! - [`registry`]: `EngineRegistry` lookup and whole-workflow compilation

pub mod claude;
pub mod codex;
pub mod copilot;
pub mod copilot_sdk;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::capability::{self, Capabilities};
use crate::constants::{GITHUB_MCP_SERVER_TOKEN, MCP_GATEWAY_API_KEY};
use crate::error::{CompileError, Result};
use crate::execution::{self, AgentCommand, ExecutionContext};
use crate::install;
use crate::model::WorkflowModel;
use crate::obs;
use crate::sandbox::EngineSandboxProfile;
use crate::step::Step;

pub use registry::{CompiledWorkflow, EngineRegistry};

// ----------------------------------------------------------------------------
// Kind
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    Copilot,
    CopilotSdk,
    Claude,
    Codex,
}

impl EngineKind {
    /// Every engine, in registry order.
    pub const ALL: [EngineKind; 4] = [
        EngineKind::Copilot,
        EngineKind::CopilotSdk,
        EngineKind::Claude,
        EngineKind::Codex,
    ];

    pub fn id(&self) -> &'static str {
        self.profile().id
    }

    pub fn known_ids() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.id()).collect()
    }

    pub(crate) fn profile(&self) -> &'static EngineProfile {
        match self {
            EngineKind::Copilot => &copilot::PROFILE,
            EngineKind::CopilotSdk => &copilot_sdk::PROFILE,
            EngineKind::Claude => &claude::PROFILE,
            EngineKind::Codex => &codex::PROFILE,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl TryFrom<&str> for EngineKind {
    type Error = CompileError;

    fn try_from(value: &str) -> Result<Self> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.id() == wanted)
            .ok_or_else(|| CompileError::UnknownEngine(value.trim().to_string()))
    }
}

impl FromStr for EngineKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s)
    }
}

// ----------------------------------------------------------------------------
// Profile
// ----------------------------------------------------------------------------

/// Capability flags advertised by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineFeatures {
    pub tools_allowlist: bool,
    pub http_transport: bool,
    pub max_turns: bool,
    pub web_fetch: bool,
    pub web_search: bool,
    pub firewall: bool,
    pub plugins: bool,
    /// Proxy port when model traffic can be routed through the LLM gateway.
    pub llm_gateway_port: Option<u16>,
}

impl EngineFeatures {
    pub fn llm_gateway(&self) -> bool {
        self.llm_gateway_port.is_some()
    }
}

/// Static per-engine data.
#[derive(Debug)]
pub struct EngineProfile {
    pub id: &'static str,
    pub display_name: &'static str,
    pub experimental: bool,
    pub features: EngineFeatures,
    /// Credential secrets; at least one must be set at run time.
    pub credential_secrets: &'static [&'static str],
    pub default_version: &'static str,
    /// Executable name, also used for `<cli> plugin install`.
    pub cli: &'static str,
    pub log_parser_id: &'static str,
    pub error_patterns: &'static [&'static str],
    pub default_domains: &'static [&'static str],
    pub container_mounts: &'static [&'static str],
    pub logs_folder: &'static str,
    pub mcp_config_path: &'static str,
    /// Label for the leading tool summary comment.
    pub tools_label: &'static str,
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

/// One backend engine. Cheap to construct; immutable once built.
#[derive(Debug)]
pub struct Engine {
    kind: EngineKind,
    profile: &'static EngineProfile,
    error_patterns: Vec<Regex>,
    span: Span,
}

impl Engine {
    pub fn new(kind: EngineKind) -> Self {
        let profile = kind.profile();
        let span = tracing::info_span!("awc.engine", engine_id = %profile.id);
        let error_patterns = profile
            .error_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(engine_id = %profile.id, pattern = %p, error = %e, "skipping invalid error pattern");
                    None
                }
            })
            .collect();
        Self {
            kind,
            profile,
            error_patterns,
            span,
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn id(&self) -> &'static str {
        self.profile.id
    }

    pub fn display_name(&self) -> &'static str {
        self.profile.display_name
    }

    pub fn is_experimental(&self) -> bool {
        self.profile.experimental
    }

    pub fn features(&self) -> EngineFeatures {
        self.profile.features
    }

    pub fn profile(&self) -> &'static EngineProfile {
        self.profile
    }

    pub fn log_parser_id(&self) -> &'static str {
        self.profile.log_parser_id
    }

    pub fn error_patterns(&self) -> &'static [&'static str] {
        self.profile.error_patterns
    }

    /// Installed CLI version: explicit override else the compiled-in default.
    pub fn resolved_version<'a>(&self, workflow: &'a WorkflowModel) -> &'a str {
        workflow
            .engine
            .version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(self.profile.default_version)
    }

    /// Secret names this engine may reference, in declaration order.
    pub fn required_secret_names(&self, workflow: &WorkflowModel) -> Vec<String> {
        let mut names: Vec<String> = self
            .profile
            .credential_secrets
            .iter()
            .map(|s| s.to_string())
            .collect();
        if workflow.has_mcp_servers() {
            names.push(MCP_GATEWAY_API_KEY.to_string());
        }
        if workflow.tools.contains("github") {
            names.push(GITHUB_MCP_SERVER_TOKEN.to_string());
        }
        if self.profile.features.plugins && !workflow.plugin_repos().is_empty() {
            names.push("GITHUB_TOKEN".to_string());
        }
        names.extend(workflow.tools.header_secrets());
        names.extend(workflow.safe_input_secrets());

        let mut seen = std::collections::HashSet::new();
        names.retain(|n| seen.insert(n.clone()));
        names
    }

    /// Tool permissions for this workflow.
    pub fn resolve_capabilities(&self, workflow: &WorkflowModel) -> Capabilities {
        let _entered = self.span.enter();
        capability::resolve_for_workflow(workflow)
    }

    /// Setup steps; empty when the workflow supplies its own engine command.
    pub fn installation_steps(&self, workflow: &WorkflowModel) -> Vec<Step> {
        let _entered = self.span.enter();
        let steps = install::build_installation_steps(self, workflow);
        obs::emit_steps_generated(self.id(), "installation", steps.len());
        steps
    }

    /// Custom pre-steps followed by the agent execution step.
    pub fn execution_steps(&self, workflow: &WorkflowModel, log_file: &str) -> Result<Vec<Step>> {
        let _entered = self.span.enter();
        let steps = execution::build_execution_steps(self, workflow, log_file)?;
        obs::emit_steps_generated(self.id(), "execution", steps.len());
        Ok(steps)
    }

    /// Warnings for declared features this engine cannot honour.
    pub fn feature_warnings(&self, workflow: &WorkflowModel) -> Vec<String> {
        let _entered = self.span.enter();
        let features = self.profile.features;
        let name = self.profile.display_name;
        let mut warnings = Vec::new();

        if self.profile.experimental {
            warnings.push(format!("Using experimental engine: {name}"));
        }
        if workflow.tools.contains("web-search") && !features.web_search {
            warnings.push(format!(
                "{name} does not support web-search; the tool is ignored"
            ));
        }
        if workflow.tools.contains("web-fetch") && !features.web_fetch {
            warnings.push(format!(
                "{name} does not support web-fetch; the tool is ignored"
            ));
        }
        if workflow.engine.max_turns.is_some() && !features.max_turns {
            warnings.push(format!("{name} does not support max-turns; the limit is ignored"));
        }
        if !workflow.plugin_repos().is_empty() && !features.plugins {
            warnings.push(format!("{name} does not support plugins; none are installed"));
        }
        if workflow.firewall_enabled() && !features.firewall {
            warnings.push(format!("{name} does not support the network firewall"));
        }

        for warning in &warnings {
            obs::emit_feature_warning(self.id(), warning);
        }
        warnings
    }

    /// Apply the engine's error patterns line by line and collect the captured messages.
    pub fn scan_log_errors(&self, log: &str) -> Vec<String> {
        log.lines()
            .filter_map(|line| {
                self.error_patterns.iter().find_map(|re| {
                    re.captures(line)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|m| !m.is_empty())
                })
            })
            .collect()
    }

    /// Env var the run-time model is read from when none is configured.
    pub fn model_env_var(&self, workflow: &WorkflowModel) -> String {
        let role = if workflow.is_detection_job() {
            "DETECTION"
        } else {
            "AGENT"
        };
        let engine = self.profile.id.to_ascii_uppercase().replace('-', "_");
        format!("AWC_MODEL_{role}_{engine}")
    }

    pub(crate) fn sandbox_profile(&self) -> EngineSandboxProfile<'static> {
        EngineSandboxProfile {
            domains: self.profile.default_domains,
            mounts: self.profile.container_mounts,
            api_proxy_port: self.profile.features.llm_gateway_port,
        }
    }

    /// Credential env entries for the execution step.
    pub(crate) fn credential_env(&self, workflow: &WorkflowModel) -> BTreeMap<String, String> {
        match self.kind {
            EngineKind::Copilot | EngineKind::CopilotSdk => copilot::credential_env(workflow),
            EngineKind::Claude => claude::credential_env(),
            EngineKind::Codex => codex::credential_env(),
        }
    }

    /// Engine-specific non-secret env entries.
    pub(crate) fn engine_env(&self, workflow: &WorkflowModel) -> BTreeMap<String, String> {
        match self.kind {
            EngineKind::Copilot => copilot::engine_env(),
            EngineKind::CopilotSdk => copilot_sdk::engine_env(),
            EngineKind::Claude => claude::engine_env(workflow),
            EngineKind::Codex => codex::engine_env(),
        }
    }

    /// CLI install step for this engine.
    pub(crate) fn cli_install_step(&self, version: &str) -> Step {
        match self.kind {
            EngineKind::Copilot | EngineKind::CopilotSdk => copilot::install_step(version),
            EngineKind::Claude => claude::install_step(version),
            EngineKind::Codex => codex::install_step(version),
        }
    }

    /// The compiled agent invocation.
    pub(crate) fn agent_command(&self, ctx: &ExecutionContext<'_>) -> Result<AgentCommand> {
        match self.kind {
            EngineKind::Copilot => Ok(copilot::agent_command(ctx)),
            EngineKind::CopilotSdk => copilot_sdk::agent_command(ctx),
            EngineKind::Claude => Ok(claude::agent_command(ctx)),
            EngineKind::Codex => Ok(codex::agent_command(ctx)),
        }
    }
}
