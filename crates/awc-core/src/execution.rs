//! Execution step assembly.
//!
//! Produces the caller's custom pre-steps followed by one agent step whose
//! body runs the engine (optionally inside the firewall) and whose env has
//! been filtered down to the engine's declared secrets.

use std::collections::BTreeMap;

use crate::capability::{self, Capabilities};
use crate::constants::{
    DEFAULT_TIMEOUT_MINUTES, ENV_MAX_TURNS, ENV_MCP_CONFIG, ENV_PROMPT, ENV_SAFE_INPUTS_API_KEY,
    ENV_SAFE_INPUTS_PORT, ENV_SAFE_OUTPUTS, ENV_STARTUP_TIMEOUT, ENV_TOOL_TIMEOUT,
    EXECUTION_STEP_ID, GITHUB_MCP_SERVER_TOKEN, SAFE_INPUTS_START_STEP_ID,
};
use crate::engine::Engine;
use crate::error::{CompileError, Result};
use crate::model::WorkflowModel;
use crate::sandbox::{self, SandboxPlan};
use crate::secrets::{filter_env_with_overrides, resolve_secret, secret_expr, SecretRole};
use crate::shell::{escape_arg, join_args};
use crate::step::Step;

/// Inputs shared by every engine's invocation builder.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    pub engine: &'a Engine,
    pub workflow: &'a WorkflowModel,
    pub capabilities: &'a Capabilities,
    /// Env var consulted at run time when no model is configured.
    pub model_env_var: String,
}

impl ExecutionContext<'_> {
    /// ` ${VAR:+ --model "$VAR"}` when no model is configured, else empty.
    pub fn model_fallback(&self) -> String {
        if self.workflow.engine.configured_model().is_some() {
            return String::new();
        }
        let var = &self.model_env_var;
        format!(" ${{{var}:+ --model \"${var}\"}}")
    }

    /// Prompt read from disk when the step runs.
    pub fn prompt_arg(&self) -> String {
        format!("\"$(cat {})\"", escape_arg(&self.workflow.prompt_file))
    }

    pub fn logs_folder(&self) -> &'static str {
        self.engine.profile().logs_folder
    }

    pub fn has_mcp_servers(&self) -> bool {
        self.workflow.has_mcp_servers()
    }

    pub fn mcp_config_path(&self) -> &'static str {
        self.engine.profile().mcp_config_path
    }

    /// Base args plus user-supplied engine args, quoted, then the model fallback.
    pub fn render(&self, mut args: Vec<String>) -> String {
        args.extend(self.workflow.engine.args.iter().cloned());
        format!("{}{}", join_args(&args), self.model_fallback())
    }
}

/// Setup lines and the inner command for one agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentCommand {
    /// Lines run before the invocation, outside the sandbox.
    pub setup: Vec<String>,
    /// Command handed to the sandbox, or run directly.
    pub inner: String,
}

pub(crate) fn build_execution_steps(
    engine: &Engine,
    workflow: &WorkflowModel,
    log_file: &str,
) -> Result<Vec<Step>> {
    if log_file.trim().is_empty() {
        return Err(CompileError::missing(
            "log_file",
            format!("execution step for engine '{}'", engine.id()),
        ));
    }
    if workflow.prompt_file.trim().is_empty() {
        return Err(CompileError::missing(
            "prompt_file",
            format!("workflow '{}'", workflow.name),
        ));
    }

    let capabilities = capability::resolve_for_workflow(workflow);
    let ctx = ExecutionContext {
        engine,
        workflow,
        capabilities: &capabilities,
        model_env_var: engine.model_env_var(workflow),
    };

    let command = if workflow.engine.has_custom_command() {
        custom_command(workflow)
    } else {
        engine.agent_command(&ctx)?
    };

    let plan = if engine.features().firewall {
        SandboxPlan::from_workflow(workflow, engine.sandbox_profile())
    } else {
        None
    };

    let mut lines = vec!["set -o pipefail".to_string()];
    lines.extend(capabilities.summary_comment(engine.profile().tools_label));
    lines.push(format!("mkdir -p {}", escape_arg(ctx.logs_folder())));
    lines.extend(command.setup);
    lines.push(sandbox::render_invocation(plan.as_ref(), &command.inner, log_file));

    let required = engine.required_secret_names(workflow);
    let overrides = workflow.override_secret_names();
    let env = filter_env_with_overrides(&build_env(&ctx), &required, &overrides);

    let timeout = workflow
        .timeout_minutes
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_TIMEOUT_MINUTES);

    let mut steps: Vec<Step> = workflow
        .engine
        .steps
        .iter()
        .map(|s| {
            let mut s = s.clone();
            s.env = filter_env_with_overrides(&s.env, &required, &overrides);
            s
        })
        .collect();
    steps.push(
        Step::new(format!("Execute {}", engine.display_name()), lines.join("\n"))
            .with_id(EXECUTION_STEP_ID)
            .with_timeout(timeout)
            .with_env(env),
    );
    Ok(steps)
}

/// The workflow's own command replaces the compiled invocation.
fn custom_command(workflow: &WorkflowModel) -> AgentCommand {
    let command = workflow.engine.command.as_deref().unwrap_or_default().trim();
    let inner = if workflow.engine.args.is_empty() {
        command.to_string()
    } else {
        format!("{command} {}", join_args(&workflow.engine.args))
    };
    AgentCommand {
        setup: Vec::new(),
        inner,
    }
}

/// Unfiltered env for the agent step.
fn build_env(ctx: &ExecutionContext<'_>) -> BTreeMap<String, String> {
    let workflow = ctx.workflow;
    let engine = ctx.engine;
    let mut env = BTreeMap::new();

    env.insert("GITHUB_HEAD_REF".to_string(), "${{ github.head_ref }}".to_string());
    env.insert("GITHUB_REF_NAME".to_string(), "${{ github.ref_name }}".to_string());
    env.insert(
        "GITHUB_STEP_SUMMARY".to_string(),
        "${{ env.GITHUB_STEP_SUMMARY }}".to_string(),
    );
    env.insert("GITHUB_WORKSPACE".to_string(), "${{ github.workspace }}".to_string());
    env.insert(ENV_PROMPT.to_string(), workflow.prompt_file.clone());
    env.extend(engine.credential_env(workflow));
    env.extend(engine.engine_env(workflow));

    if ctx.has_mcp_servers() {
        env.insert(ENV_MCP_CONFIG.to_string(), ctx.mcp_config_path().to_string());
    }
    if workflow.tools.contains("github") {
        let custom = workflow
            .tools
            .github_token()
            .or(workflow.github_token.as_deref());
        env.insert(
            GITHUB_MCP_SERVER_TOKEN.to_string(),
            resolve_secret(SecretRole::GitHubMcpServer, custom),
        );
    }
    if workflow.safe_outputs_enabled() {
        env.insert(
            ENV_SAFE_OUTPUTS.to_string(),
            format!("${{{{ env.{ENV_SAFE_OUTPUTS} }}}}"),
        );
    }
    if workflow.safe_inputs_enabled() {
        env.insert(
            ENV_SAFE_INPUTS_PORT.to_string(),
            format!("${{{{ steps.{SAFE_INPUTS_START_STEP_ID}.outputs.port }}}}"),
        );
        env.insert(
            ENV_SAFE_INPUTS_API_KEY.to_string(),
            format!("${{{{ steps.{SAFE_INPUTS_START_STEP_ID}.outputs.api_key }}}}"),
        );
    }
    if let Some(secs) = workflow.tools_startup_timeout {
        env.insert(ENV_STARTUP_TIMEOUT.to_string(), secs.to_string());
    }
    if let Some(secs) = workflow.tools_timeout {
        env.insert(ENV_TOOL_TIMEOUT.to_string(), secs.to_string());
    }
    if let Some(turns) = workflow.engine.max_turns {
        if engine.features().max_turns {
            env.insert(ENV_MAX_TURNS.to_string(), turns.to_string());
        }
    }
    if workflow.engine.configured_model().is_none() {
        let var = &ctx.model_env_var;
        env.insert(var.clone(), format!("${{{{ vars.{var} || '' }}}}"));
    }

    env.extend(workflow.engine.env.clone());
    if let Some(agent) = workflow.agent_sandbox() {
        env.extend(agent.env.clone());
    }

    for name in workflow
        .tools
        .header_secrets()
        .into_iter()
        .chain(workflow.safe_input_secrets())
    {
        env.entry(name.clone()).or_insert_with(|| secret_expr(&name));
    }

    env
}
