//! Sandbox: the network firewall wrapping the agent invocation.
//!
//! [`SandboxPlan`] collects everything the wrapper needs from the workflow
//! and renders it in a fixed argument order that downstream log tooling
//! depends on. When the firewall is disabled there is no plan and the inner
//! command is piped straight into the log sink.
//!
//! # Modules
//!
//! - [`domains`]: allow/block domain policy and the `defaults` keyword

pub mod domains;

use crate::constants::{
    DEFAULT_FIREWALL_COMMAND, DEFAULT_FIREWALL_VERSION, FIREWALL_IMAGE_REGISTRY, FIREWALL_LOGS_DIR,
};
use crate::model::WorkflowModel;
use crate::shell::{escape_arg, join_args};

/// Mounts every sandboxed agent gets.
const BASE_MOUNTS: &[&str] = &[
    "/tmp:/tmp:rw",
    "\"${GITHUB_WORKSPACE}:${GITHUB_WORKSPACE}:rw\"",
];

/// Engine-specific inputs to the sandbox plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineSandboxProfile<'a> {
    /// Domains the engine's API needs.
    pub domains: &'a [&'a str],
    /// Binaries the engine needs inside the container.
    pub mounts: &'a [&'a str],
    /// LLM gateway port, for engines that route model traffic through the proxy.
    pub api_proxy_port: Option<u16>,
}

/// Fully resolved firewall invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPlan {
    pub command: String,
    pub mounts: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub log_level: String,
    pub enable_host_access: bool,
    pub image_tag: String,
    pub ssl_bump: bool,
    pub allow_urls: Vec<String>,
    pub api_proxy_port: Option<u16>,
    pub firewall_args: Vec<String>,
    pub agent_args: Vec<String>,
}

impl SandboxPlan {
    /// Build a plan, or `None` when the firewall is disabled.
    pub fn from_workflow(workflow: &WorkflowModel, profile: EngineSandboxProfile<'_>) -> Option<Self> {
        let firewall = workflow.firewall()?;
        let agent = workflow.agent_sandbox();

        let mut mounts: Vec<String> = BASE_MOUNTS
            .iter()
            .map(|m| m.to_string())
            .chain(profile.mounts.iter().map(|m| m.to_string()))
            .chain(agent.iter().flat_map(|a| a.mounts.iter().cloned()))
            .collect();
        mounts.sort();
        mounts.dedup();

        Some(Self {
            command: agent
                .and_then(|a| a.command.clone())
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FIREWALL_COMMAND.to_string()),
            mounts,
            allowed_domains: domains::allowed_domains(profile.domains, workflow),
            blocked_domains: domains::blocked_domains(workflow),
            log_level: firewall
                .log_level
                .clone()
                .unwrap_or_else(|| "info".to_string()),
            enable_host_access: workflow.has_mcp_servers(),
            image_tag: image_tag(firewall.version.as_deref()),
            ssl_bump: firewall.ssl_bump,
            allow_urls: firewall.allow_urls.clone(),
            api_proxy_port: profile.api_proxy_port,
            firewall_args: firewall.args.clone(),
            agent_args: agent.map(|a| a.args.clone()).unwrap_or_default(),
        })
    }

    /// Wrapper arguments in contractual order.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--env-all".to_string(),
            "--container-workdir".to_string(),
            "\"${GITHUB_WORKSPACE}\"".to_string(),
        ];
        for mount in &self.mounts {
            args.push("--mount".to_string());
            args.push(mount.clone());
        }
        args.push("--allow-domains".to_string());
        args.push(self.allowed_domains.join(","));
        if !self.blocked_domains.is_empty() {
            args.push("--block-domains".to_string());
            args.push(self.blocked_domains.join(","));
        }
        args.push("--log-level".to_string());
        args.push(self.log_level.clone());
        args.push("--proxy-logs-dir".to_string());
        args.push(FIREWALL_LOGS_DIR.to_string());
        if self.enable_host_access {
            args.push("--enable-host-access".to_string());
        }
        args.push("--image-tag".to_string());
        args.push(self.image_tag.clone());
        // Images are pulled during installation.
        args.push("--skip-pull".to_string());
        if self.ssl_bump {
            args.push("--ssl-bump".to_string());
            if !self.allow_urls.is_empty() {
                args.push("--allow-urls".to_string());
                args.push(self.allow_urls.join(","));
            }
        }
        if let Some(port) = self.api_proxy_port {
            args.push("--enable-api-proxy".to_string());
            args.push(format!("--api-proxy-port={port}"));
        }
        args.extend(self.firewall_args.iter().cloned());
        args.extend(self.agent_args.iter().cloned());
        args
    }

    /// `<command> <args> -- '<inner>' 2>&1 | tee <log>`
    pub fn render(&self, inner: &str, log_file: &str) -> String {
        format!(
            "{} {} \\\n  -- {} \\\n  2>&1 | tee {}",
            self.command,
            join_args(&self.args()),
            escape_arg(inner),
            escape_arg(log_file),
        )
    }
}

/// Render the invocation, wrapped when a plan is present.
pub fn render_invocation(plan: Option<&SandboxPlan>, inner: &str, log_file: &str) -> String {
    match plan {
        Some(plan) => plan.render(inner, log_file),
        None => format!("{inner} 2>&1 | tee {}", escape_arg(log_file)),
    }
}

/// Container image tag for a firewall version (`v0.11.2` → `0.11.2`).
pub fn image_tag(version: Option<&str>) -> String {
    let version = version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_FIREWALL_VERSION);
    version.strip_prefix('v').unwrap_or(version).to_string()
}

/// Release version for the firewall binary, always `v`-prefixed.
pub fn firewall_version(workflow: &WorkflowModel) -> String {
    format!("v{}", image_tag(workflow.firewall().and_then(|f| f.version.as_deref())))
}

/// Images to pull before the agent step runs.
pub fn container_images(tag: &str, api_proxy: bool) -> Vec<String> {
    let mut images = vec![
        format!("{FIREWALL_IMAGE_REGISTRY}/agent:{tag}"),
        format!("{FIREWALL_IMAGE_REGISTRY}/squid:{tag}"),
    ];
    if api_proxy {
        images.push(format!("{FIREWALL_IMAGE_REGISTRY}/api-proxy:{tag}"));
    }
    images
}
