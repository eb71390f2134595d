//! Installation step assembly.
//!
//! Order: secret validation, CLI install, plugins, companion runner (SDK
//! engine only), then firewall binary and images. A workflow that brings its
//! own engine command gets no installation steps at all.

use std::collections::BTreeMap;

use crate::constants::{ACTIONS_DIR, GITHUB_MCP_SERVER_TOKEN, SECRET_VALIDATION_STEP_ID};
use crate::engine::{copilot_sdk, Engine, EngineKind};
use crate::model::WorkflowModel;
use crate::sandbox::{container_images, firewall_version, image_tag};
use crate::secrets::{filter_env_with_overrides, resolve_secret, secret_expr, SecretRole};
use crate::shell::{escape_arg, join_args};
use crate::step::Step;

pub(crate) fn build_installation_steps(engine: &Engine, workflow: &WorkflowModel) -> Vec<Step> {
    if workflow.engine.has_custom_command() {
        return Vec::new();
    }

    let required = engine.required_secret_names(workflow);
    let mut steps = vec![secret_validation_step(engine, workflow, &required)];

    steps.push(engine.cli_install_step(engine.resolved_version(workflow)));

    if engine.features().plugins {
        steps.extend(plugin_install_steps(engine.profile().cli, workflow));
    }

    if engine.kind() == EngineKind::CopilotSdk {
        steps.push(copilot_sdk::runner_install_step());
    }

    if engine.features().firewall && workflow.firewall_enabled() {
        steps.extend(firewall_install_steps(engine, workflow));
    }

    let overrides = workflow.override_secret_names();
    steps
        .into_iter()
        .map(|mut step| {
            step.env = filter_env_with_overrides(&step.env, &required, &overrides);
            step
        })
        .collect()
}

/// Fails unless at least one credential is set; reports every other required name.
pub fn secret_validation_step(engine: &Engine, workflow: &WorkflowModel, required: &[String]) -> Step {
    let credentials = engine.profile().credential_secrets;
    let env: BTreeMap<String, String> = required
        .iter()
        .map(|name| (name.clone(), validation_value(name, workflow)))
        .collect();

    let run = [
        "status=0".to_string(),
        "credential_found=false".to_string(),
        format!("for name in {}; do", join_args(credentials)),
        "  if [ -n \"${!name}\" ]; then credential_found=true; fi".to_string(),
        "done".to_string(),
        "if [ \"$credential_found\" != \"true\" ]; then".to_string(),
        format!(
            "  echo \"::error::{} requires one of: {}\"",
            engine.display_name(),
            credentials.join(", ")
        ),
        "  status=1".to_string(),
        "fi".to_string(),
        format!("for name in {}; do", join_args(required)),
        "  if [ -n \"${!name}\" ]; then echo \"$name: set\"; else echo \"$name: not set\"; fi"
            .to_string(),
        "done".to_string(),
        "exit $status".to_string(),
    ]
    .join("\n");

    Step::new("Validate secrets", run)
        .with_id(SECRET_VALIDATION_STEP_ID)
        .with_env(env)
}

/// Cascaded roles validate their resolved expression; everything else its own secret.
fn validation_value(name: &str, workflow: &WorkflowModel) -> String {
    match name {
        GITHUB_MCP_SERVER_TOKEN => resolve_secret(
            SecretRole::GitHubMcpServer,
            workflow
                .tools
                .github_token()
                .or(workflow.github_token.as_deref()),
        ),
        "GITHUB_TOKEN" => resolve_secret(
            SecretRole::Plugins,
            workflow.plugins.as_ref().and_then(|p| p.github_token.as_deref()),
        ),
        "COPILOT_GITHUB_TOKEN" => workflow
            .github_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| secret_expr(name)),
        _ => secret_expr(name),
    }
}

/// One `<cli> plugin install <spec>` step per configured plugin.
pub fn plugin_install_steps(cli: &str, workflow: &WorkflowModel) -> Vec<Step> {
    let token = resolve_secret(
        SecretRole::Plugins,
        workflow.plugins.as_ref().and_then(|p| p.github_token.as_deref()),
    );
    workflow
        .plugin_repos()
        .iter()
        .filter(|spec| !spec.trim().is_empty())
        .map(|spec| {
            let normalized = normalize_plugin_spec(spec);
            Step::new(
                format!("Install plugin: {spec}"),
                format!("{cli} plugin install {}", escape_arg(&normalized)),
            )
            .env_var("GITHUB_TOKEN", token.clone())
        })
        .collect()
}

/// URLs and `name@marketplace` are kept; `owner/repo/sub/path` becomes a GitHub URL.
pub fn normalize_plugin_spec(spec: &str) -> String {
    let spec = spec.trim();
    if spec.starts_with("https://") || spec.starts_with("http://") || spec.contains('@') {
        return spec.to_string();
    }
    if spec.matches('/').count() >= 2 {
        return format!("https://github.com/{spec}");
    }
    spec.to_string()
}

/// Firewall binary (unless the agent sandbox brings its own wrapper) and images.
pub fn firewall_install_steps(engine: &Engine, workflow: &WorkflowModel) -> Vec<Step> {
    let mut steps = Vec::new();
    let custom_wrapper = workflow
        .agent_sandbox()
        .and_then(|a| a.command.as_deref())
        .is_some_and(|c| !c.trim().is_empty());

    if !custom_wrapper {
        steps.push(Step::new(
            "Install awf binary",
            format!(
                "{ACTIONS_DIR}/install_awf_binary.sh {}",
                escape_arg(&firewall_version(workflow))
            ),
        ));
    }

    let tag = image_tag(workflow.firewall().and_then(|f| f.version.as_deref()));
    let images = container_images(&tag, engine.features().llm_gateway());
    steps.push(Step::new(
        "Download container images",
        format!("{ACTIONS_DIR}/download_docker_images.sh {}", join_args(&images)),
    ));
    steps
}
