//! GitHub Copilot SDK engine.
//!
//! Instead of invoking the CLI directly, the execution step writes a
//! [`RunnerConfig`] document and starts `awc-runner`, which drives the CLI
//! over its headless protocol.

use std::collections::BTreeMap;

use super::{copilot, EngineFeatures, EngineProfile};
use crate::constants::{
    ACTIONS_DIR, AGENT_LOGS_ROOT, RUNNER_CONFIG_PATH, RUNNER_INSTALL_PATH, RUNNER_STAGED_PATH,
};
use crate::error::Result;
use crate::execution::{AgentCommand, ExecutionContext};
use crate::runner_config::{RunnerConfig, DEFAULT_CLI_PATH, DEFAULT_LOG_LEVEL};
use crate::shell::{escape_arg, join_args};
use crate::step::Step;

const HEREDOC_MARKER: &str = "RUNNER_CONFIG_EOF";

pub(crate) const ERROR_PATTERNS: &[&str] = &[
    r"(?i)error:?\s+(.+)",
    r"(?i)fatal:?\s+(.+)",
    r"(?i)panic:?\s+(.+)",
    r"(?i)failed to\s+(.+)",
    r"(?i)SDK error:?\s+(.+)",
    r"(?i)session error:?\s+(.+)",
];

pub const PROFILE: EngineProfile = EngineProfile {
    id: "copilot-sdk",
    display_name: "GitHub Copilot SDK",
    experimental: true,
    features: EngineFeatures {
        tools_allowlist: true,
        http_transport: true,
        max_turns: false,
        web_fetch: true,
        web_search: false,
        firewall: true,
        plugins: false,
        llm_gateway_port: None,
    },
    credential_secrets: &[copilot::COPILOT_TOKEN_SECRET],
    default_version: copilot::PROFILE.default_version,
    cli: "copilot",
    log_parser_id: "parse_copilot_log",
    error_patterns: ERROR_PATTERNS,
    default_domains: copilot::DOMAINS,
    container_mounts: &[
        "/usr/local/bin/copilot:/usr/local/bin/copilot:ro",
        "/usr/local/bin/awc-runner:/usr/local/bin/awc-runner:ro",
    ],
    logs_folder: AGENT_LOGS_ROOT,
    mcp_config_path: "/home/runner/.copilot/mcp-config.json",
    tools_label: "SDK tools",
};

pub(crate) fn engine_env() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("XDG_CONFIG_HOME".to_string(), "/home/runner".to_string()),
        ("AWC_RUNNER_TYPE".to_string(), "copilot-sdk".to_string()),
    ])
}

/// Copies the pre-staged runner into place, failing the job when it is missing.
pub fn runner_install_step() -> Step {
    let staged = escape_arg(RUNNER_STAGED_PATH);
    let installed = escape_arg(RUNNER_INSTALL_PATH);
    let run = [
        format!("if [ -f {staged} ]; then"),
        format!("  sudo cp {staged} {installed}"),
        format!("  sudo chmod +x {installed}"),
        format!("  {installed} --version || true"),
        "else".to_string(),
        format!(
            "  echo \"::error::awc-runner not found at {RUNNER_STAGED_PATH}; the setup action in {ACTIONS_DIR} must stage it\""
        ),
        "  exit 1".to_string(),
        "fi".to_string(),
    ]
    .join("\n");
    Step::new("Install awc-runner", run)
}

/// Runner configuration embedded into the execution step.
pub fn runner_config(ctx: &ExecutionContext<'_>) -> RunnerConfig {
    let workflow = ctx.workflow;
    let logs = ctx.logs_folder();
    RunnerConfig {
        cli_path: DEFAULT_CLI_PATH.to_string(),
        github_token: None,
        model: workflow.engine.configured_model().map(str::to_string),
        working_directory: "${GITHUB_WORKSPACE}".to_string(),
        log_level: DEFAULT_LOG_LEVEL.to_string(),
        log_dir: Some(logs.to_string()),
        prompt_file: workflow.prompt_file.clone(),
        available_tools: ctx.capabilities.to_available_tools(),
        excluded_tools: None,
        mcp_config_path: ctx
            .has_mcp_servers()
            .then(|| ctx.mcp_config_path().to_string()),
        streaming: true,
        timeout: workflow
            .timeout_minutes
            .filter(|m| *m > 0)
            .map(|m| u64::from(m) * 60),
        metrics_file: Some(format!("{logs}sdk-metrics.json")),
    }
}

pub(crate) fn agent_command(ctx: &ExecutionContext<'_>) -> Result<AgentCommand> {
    let config = serde_json::to_string_pretty(&runner_config(ctx))?;
    let path = escape_arg(RUNNER_CONFIG_PATH);

    let mut setup = vec![
        "mkdir -p /tmp/awc".to_string(),
        format!("cat > {path} << '{HEREDOC_MARKER}'"),
        config,
        HEREDOC_MARKER.to_string(),
    ];

    if ctx.workflow.engine.configured_model().is_none() {
        let var = &ctx.model_env_var;
        setup.push(format!("if [ -n \"${{{var}}}\" ]; then"));
        setup.push(format!(
            "  jq --arg model \"${{{var}}}\" '.model = $model' {path} > {path}.tmp"
        ));
        setup.push(format!("  mv {path}.tmp {path}"));
        setup.push("fi".to_string());
    }

    let mut args = vec![
        "awc-runner".to_string(),
        "--config".to_string(),
        RUNNER_CONFIG_PATH.to_string(),
    ];
    args.extend(ctx.workflow.engine.args.iter().cloned());

    Ok(AgentCommand {
        setup,
        inner: join_args(&args),
    })
}
