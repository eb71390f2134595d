//! Codex engine. No tool allowlist: the agent runs with approvals bypassed
//! and relies on the firewall for containment.

use std::collections::BTreeMap;

use super::{EngineFeatures, EngineProfile};
use crate::constants::AGENT_LOGS_ROOT;
use crate::execution::{AgentCommand, ExecutionContext};
use crate::shell::escape_arg;
use crate::step::Step;

const MCP_CONFIG_DIR: &str = "/tmp/awc/mcp-config";

pub(crate) const ERROR_PATTERNS: &[&str] = &[
    r"(?i)stream error:\s+(.+)",
    r"^\S*\s*ERROR\s+(.+)",
    r"(?i)error:\s+(.+)",
];

pub const PROFILE: EngineProfile = EngineProfile {
    id: "codex",
    display_name: "Codex",
    experimental: false,
    features: EngineFeatures {
        tools_allowlist: false,
        http_transport: true,
        max_turns: false,
        web_fetch: false,
        web_search: true,
        firewall: true,
        plugins: true,
        llm_gateway_port: Some(10001),
    },
    credential_secrets: &["CODEX_API_KEY", "OPENAI_API_KEY"],
    default_version: "0.87.0",
    cli: "codex",
    log_parser_id: "parse_codex_log",
    error_patterns: ERROR_PATTERNS,
    default_domains: &[
        "api.github.com",
        "api.openai.com",
        "github.com",
        "host.docker.internal",
        "openai.com",
        "registry.npmjs.org",
    ],
    container_mounts: &["/usr/local/bin/codex:/usr/local/bin/codex:ro"],
    logs_folder: AGENT_LOGS_ROOT,
    mcp_config_path: "/tmp/awc/mcp-config/config.toml",
    tools_label: "Allowed tools",
};

/// Either key works; each env var falls back to the other secret.
pub(crate) fn credential_env() -> BTreeMap<String, String> {
    let both = "${{ secrets.CODEX_API_KEY || secrets.OPENAI_API_KEY }}".to_string();
    BTreeMap::from([
        ("CODEX_API_KEY".to_string(), both.clone()),
        ("OPENAI_API_KEY".to_string(), both),
    ])
}

pub(crate) fn engine_env() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("CODEX_HOME".to_string(), MCP_CONFIG_DIR.to_string()),
        ("RUST_LOG".to_string(), "info,codex_core=debug,codex_exec=debug".to_string()),
    ])
}

pub(crate) fn install_step(version: &str) -> Step {
    Step::new(
        "Install Codex",
        format!(
            "npm install -g --silent {}",
            escape_arg(&format!("@openai/codex@{version}"))
        ),
    )
}

pub(crate) fn agent_command(ctx: &ExecutionContext<'_>) -> AgentCommand {
    let mut args = vec![PROFILE.cli.to_string(), "exec".to_string()];
    if let Some(model) = ctx.workflow.engine.configured_model() {
        args.push("--model".to_string());
        args.push(model.to_string());
    }
    args.extend(
        [
            "--skip-git-repo-check",
            "--dangerously-bypass-approvals-and-sandbox",
            "--json",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    AgentCommand {
        setup: vec![format!("mkdir -p {}", escape_arg(MCP_CONFIG_DIR))],
        inner: format!("{} {}", ctx.render(args), ctx.prompt_arg()),
    }
}
