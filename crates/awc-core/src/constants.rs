//! Compiled-in paths, versions and identifiers shared by every engine.

/// Default job timeout when the workflow does not set one.
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 20;

/// Where the rendered prompt is written before the agent step runs.
pub const DEFAULT_PROMPT_FILE: &str = "/tmp/awc/aw-prompts/prompt.txt";

/// Root of every agent log folder.
pub const AGENT_LOGS_ROOT: &str = "/tmp/awc/sandbox/agent/logs/";

/// Directory the firewall proxy writes its access logs into.
pub const FIREWALL_LOGS_DIR: &str = "/tmp/awc/sandbox/firewall/logs";

/// Runner configuration file written by the copilot-sdk execution step.
pub const RUNNER_CONFIG_PATH: &str = "/tmp/awc/runner-config.json";

/// Where the setup action stages the runner binary.
pub const RUNNER_STAGED_PATH: &str = "/opt/awc/bin/awc-runner";

/// Installed location of the runner binary.
pub const RUNNER_INSTALL_PATH: &str = "/usr/local/bin/awc-runner";

/// Setup-action helper scripts directory.
pub const ACTIONS_DIR: &str = "/opt/awc/actions";

/// Default firewall (awf) release.
pub const DEFAULT_FIREWALL_VERSION: &str = "v0.11.2";

/// Container registry prefix for firewall images.
pub const FIREWALL_IMAGE_REGISTRY: &str = "ghcr.io/stevedores-org/awf";

/// Wrapper command used when the agent sandbox does not override it.
pub const DEFAULT_FIREWALL_COMMAND: &str = "sudo -E awf";

/// Stable id of the agent execution step.
pub const EXECUTION_STEP_ID: &str = "agentic_execution";

/// Stable id of the secret validation step.
pub const SECRET_VALIDATION_STEP_ID: &str = "validate-secret";

/// Capability token granted when safe-outputs are enabled.
pub const SAFE_OUTPUTS_SERVER_ID: &str = "safeoutputs";

/// Capability token granted when safe-inputs are enabled.
pub const SAFE_INPUTS_SERVER_ID: &str = "safeinputs";

/// Capability token granted by the web-fetch tool.
pub const WEB_FETCH_TOKEN: &str = "web_fetch";

/// Secret holding the MCP gateway key, required whenever provider servers exist.
pub const MCP_GATEWAY_API_KEY: &str = "MCP_GATEWAY_API_KEY";

/// Env var carrying the GitHub MCP server token.
pub const GITHUB_MCP_SERVER_TOKEN: &str = "GITHUB_MCP_SERVER_TOKEN";

/// Env var carrying the MCP config path into the agent step.
pub const ENV_MCP_CONFIG: &str = "AWC_MCP_CONFIG";

/// Env var carrying the prompt path into the agent step.
pub const ENV_PROMPT: &str = "AWC_PROMPT";

/// Env var exposing the safe-outputs channel.
pub const ENV_SAFE_OUTPUTS: &str = "AWC_SAFE_OUTPUTS";

/// Env vars exposing the safe-inputs server.
pub const ENV_SAFE_INPUTS_PORT: &str = "AWC_SAFE_INPUTS_PORT";
pub const ENV_SAFE_INPUTS_API_KEY: &str = "AWC_SAFE_INPUTS_API_KEY";

pub const ENV_STARTUP_TIMEOUT: &str = "AWC_STARTUP_TIMEOUT";
pub const ENV_TOOL_TIMEOUT: &str = "AWC_TOOL_TIMEOUT";
pub const ENV_MAX_TURNS: &str = "AWC_MAX_TURNS";

/// Log file the execution step tees into when the caller does not pick one.
pub const DEFAULT_AGENT_LOG_FILE: &str = "/tmp/awc/agent-stdio.log";

/// Step output prefix for the safe-inputs server started ahead of the agent.
pub const SAFE_INPUTS_START_STEP_ID: &str = "safe-inputs-start";
