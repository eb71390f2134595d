//! GitHub Copilot CLI engine.

use std::collections::BTreeMap;

use super::{EngineFeatures, EngineProfile};
use crate::capability::Capabilities;
use crate::constants::{ACTIONS_DIR, AGENT_LOGS_ROOT};
use crate::execution::{AgentCommand, ExecutionContext};
use crate::model::WorkflowModel;
use crate::secrets::secret_expr;
use crate::shell::escape_arg;
use crate::step::Step;

pub const COPILOT_TOKEN_SECRET: &str = "COPILOT_GITHUB_TOKEN";

pub(crate) const DOMAINS: &[&str] = &[
    "api.business.githubcopilot.com",
    "api.enterprise.githubcopilot.com",
    "api.github.com",
    "api.githubcopilot.com",
    "api.individual.githubcopilot.com",
    "github.com",
    "host.docker.internal",
    "raw.githubusercontent.com",
    "registry.npmjs.org",
];

pub(crate) const ERROR_PATTERNS: &[&str] = &[
    r"^\[ERROR\]\s+(.+)",
    r"(?i)error:\s+(.+)",
    r"(?i)fatal:\s+(.+)",
    r"(?i)permission denied[^:]*:\s*(.+)",
];

pub const PROFILE: EngineProfile = EngineProfile {
    id: "copilot",
    display_name: "GitHub Copilot CLI",
    experimental: false,
    features: EngineFeatures {
        tools_allowlist: true,
        http_transport: true,
        max_turns: false,
        web_fetch: true,
        web_search: false,
        firewall: true,
        plugins: true,
        llm_gateway_port: None,
    },
    credential_secrets: &[COPILOT_TOKEN_SECRET],
    default_version: "0.0.400",
    cli: "copilot",
    log_parser_id: "parse_copilot_log",
    error_patterns: ERROR_PATTERNS,
    default_domains: DOMAINS,
    container_mounts: &["/usr/local/bin/copilot:/usr/local/bin/copilot:ro"],
    logs_folder: AGENT_LOGS_ROOT,
    mcp_config_path: "/home/runner/.copilot/mcp-config.json",
    tools_label: "Allowed tools",
};

/// `COPILOT_GITHUB_TOKEN`, from the workflow override when set.
pub(crate) fn credential_env(workflow: &WorkflowModel) -> BTreeMap<String, String> {
    let value = workflow
        .github_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| secret_expr(COPILOT_TOKEN_SECRET));
    BTreeMap::from([(COPILOT_TOKEN_SECRET.to_string(), value)])
}

pub(crate) fn engine_env() -> BTreeMap<String, String> {
    BTreeMap::from([("XDG_CONFIG_HOME".to_string(), "/home/runner".to_string())])
}

/// Shared by the CLI and SDK engines: both need the Copilot CLI on the runner.
pub(crate) fn install_step(version: &str) -> Step {
    Step::new(
        "Install GitHub Copilot CLI",
        format!("{ACTIONS_DIR}/install_copilot_cli.sh {}", escape_arg(version)),
    )
}

/// `--allow-tool` per token, or `--allow-all-tools` for the sentinel.
pub fn tool_args(capabilities: &Capabilities) -> Vec<String> {
    match capabilities {
        Capabilities::Unrestricted => vec!["--allow-all-tools".to_string()],
        Capabilities::Restricted(set) => set
            .iter()
            .flat_map(|t| ["--allow-tool".to_string(), t.clone()])
            .collect(),
    }
}

pub(crate) fn agent_command(ctx: &ExecutionContext<'_>) -> AgentCommand {
    let mut args: Vec<String> = [
        PROFILE.cli,
        "--add-dir",
        "/tmp/",
        "--add-dir",
        "/tmp/awc/",
        "--log-level",
        "all",
        "--log-dir",
        ctx.logs_folder(),
        "--disable-builtin-mcps",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if let Some(model) = ctx.workflow.engine.configured_model() {
        args.push("--model".to_string());
        args.push(model.to_string());
    }
    args.extend(tool_args(ctx.capabilities));

    AgentCommand {
        setup: Vec::new(),
        inner: format!("{} --prompt {}", ctx.render(args), ctx.prompt_arg()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_args() {
        assert_eq!(tool_args(&Capabilities::Unrestricted), vec!["--allow-all-tools"]);
        let caps = Capabilities::Restricted(["shell(ls)".to_string(), "write".to_string()].into());
        assert_eq!(
            tool_args(&caps),
            vec!["--allow-tool", "shell(ls)", "--allow-tool", "write"]
        );
        assert!(tool_args(&Capabilities::Restricted(Default::default())).is_empty());
    }

    #[test]
    fn test_credential_override() {
        let mut wf = WorkflowModel::for_engine("copilot");
        assert_eq!(
            credential_env(&wf)[COPILOT_TOKEN_SECRET],
            "${{ secrets.COPILOT_GITHUB_TOKEN }}"
        );
        wf.github_token = Some("${{ secrets.MY_PAT }}".into());
        assert_eq!(credential_env(&wf)[COPILOT_TOKEN_SECRET], "${{ secrets.MY_PAT }}");
    }
}
