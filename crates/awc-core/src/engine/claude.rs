//! Claude Code engine.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use super::{EngineFeatures, EngineProfile};
use crate::capability::Capabilities;
use crate::constants::{AGENT_LOGS_ROOT, ENV_MAX_TURNS};
use crate::execution::{AgentCommand, ExecutionContext};
use crate::model::WorkflowModel;
use crate::secrets::secret_expr;
use crate::shell::escape_arg;
use crate::step::Step;

/// Read-only tools Claude always gets when an allowlist is in effect.
const BASE_TOOLS: &[&str] = &["Glob", "Grep", "LS", "Read", "Task", "TodoWrite"];

/// Tools granted by the `write` capability.
const WRITE_TOOLS: &[&str] = &["Edit", "MultiEdit", "NotebookEdit", "Write"];

pub(crate) const ERROR_PATTERNS: &[&str] = &[
    r#"(?i)"is_error":\s*true.*"result":\s*"([^"]+)""#,
    r"(?i)API Error:?\s+(.+)",
    r"(?i)error:\s+(.+)",
];

pub const PROFILE: EngineProfile = EngineProfile {
    id: "claude",
    display_name: "Claude Code",
    experimental: false,
    features: EngineFeatures {
        tools_allowlist: true,
        http_transport: true,
        max_turns: true,
        web_fetch: true,
        web_search: true,
        firewall: true,
        plugins: true,
        llm_gateway_port: Some(10000),
    },
    credential_secrets: &["CLAUDE_CODE_OAUTH_TOKEN", "ANTHROPIC_API_KEY"],
    default_version: "2.1.12",
    cli: "claude",
    log_parser_id: "parse_claude_log",
    error_patterns: ERROR_PATTERNS,
    default_domains: &[
        "anthropic.com",
        "api.anthropic.com",
        "api.github.com",
        "github.com",
        "host.docker.internal",
        "registry.npmjs.org",
        "sentry.io",
        "statsig.anthropic.com",
    ],
    container_mounts: &["/usr/local/bin/claude:/usr/local/bin/claude:ro"],
    logs_folder: AGENT_LOGS_ROOT,
    mcp_config_path: "/tmp/awc/mcp-config/mcp-servers.json",
    tools_label: "Allowed tools",
};

pub(crate) fn credential_env() -> BTreeMap<String, String> {
    PROFILE
        .credential_secrets
        .iter()
        .map(|name| (name.to_string(), secret_expr(name)))
        .collect()
}

pub(crate) fn engine_env(workflow: &WorkflowModel) -> BTreeMap<String, String> {
    let mut env = BTreeMap::from([
        ("DISABLE_TELEMETRY".to_string(), "1".to_string()),
        ("DISABLE_ERROR_REPORTING".to_string(), "1".to_string()),
        ("DISABLE_BUG_COMMAND".to_string(), "1".to_string()),
    ]);
    if let Some(secs) = workflow.tools_startup_timeout {
        env.insert("MCP_TIMEOUT".to_string(), (u64::from(secs) * 1000).to_string());
    }
    if let Some(secs) = workflow.tools_timeout {
        env.insert("MCP_TOOL_TIMEOUT".to_string(), (u64::from(secs) * 1000).to_string());
    }
    env
}

pub(crate) fn install_step(version: &str) -> Step {
    Step::new(
        "Install Claude Code",
        format!(
            "npm install -g --silent {}",
            escape_arg(&format!("@anthropic-ai/claude-code@{version}"))
        ),
    )
}

/// Map one capability token to Claude tool names.
pub fn map_token(token: &str) -> Vec<String> {
    if token == "shell" {
        return vec!["Bash".to_string()];
    }
    if token == "write" {
        return WRITE_TOOLS.iter().map(|t| t.to_string()).collect();
    }
    if token == "web_fetch" {
        return vec!["WebFetch".to_string()];
    }
    if let Some(cmd) = token.strip_prefix("shell(").and_then(|r| r.strip_suffix(')')) {
        return vec![format!("Bash({cmd})")];
    }
    if let Some((server, sub)) = token.split_once('(') {
        let sub = sub.strip_suffix(')').unwrap_or(sub);
        return vec![format!("mcp__{server}__{sub}")];
    }
    vec![format!("mcp__{token}")]
}

/// Claude tool names for a restricted capability set, sorted and deduplicated.
///
/// `--allowed-tools` is comma-separated, so a name containing a comma is
/// dropped with a warning rather than split into unrelated grants.
pub fn allowed_tools(tokens: &BTreeSet<String>) -> Vec<String> {
    let mut set: BTreeSet<String> = BASE_TOOLS.iter().map(|t| t.to_string()).collect();
    for token in tokens {
        for name in map_token(token) {
            if name.contains(',') {
                tracing::warn!(
                    engine_id = PROFILE.id,
                    tool = %token,
                    "dropping tool whose name contains a comma"
                );
                continue;
            }
            set.insert(name);
        }
    }
    set.into_iter().collect()
}

pub(crate) fn agent_command(ctx: &ExecutionContext<'_>) -> AgentCommand {
    let workflow = ctx.workflow;
    let mut args: Vec<String> = [
        PROFILE.cli,
        "--print",
        "--verbose",
        "--output-format",
        "stream-json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if ctx.has_mcp_servers() {
        args.push("--mcp-config".to_string());
        args.push(ctx.mcp_config_path().to_string());
    }
    match ctx.capabilities {
        Capabilities::Unrestricted => args.push("--dangerously-skip-permissions".to_string()),
        Capabilities::Restricted(tokens) => {
            args.push("--allowed-tools".to_string());
            args.push(allowed_tools(tokens).join(","));
        }
    }
    if workflow.engine.max_turns.is_some() {
        args.push("--max-turns".to_string());
        args.push(format!("\"${ENV_MAX_TURNS}\""));
    }
    if let Some(model) = workflow.engine.configured_model() {
        args.push("--model".to_string());
        args.push(model.to_string());
    }

    AgentCommand {
        setup: Vec::new(),
        inner: format!("{} {}", ctx.render(args), ctx.prompt_arg()),
    }
}
