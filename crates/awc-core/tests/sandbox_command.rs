//! Firewall wrapper rendering and shell quoting.

use awc_core::{
    escape_arg, AgentSandboxConfig, EngineRegistry, FirewallConfig, NetworkPermissions,
    SandboxConfig, SandboxPlan, Tools, WorkflowModel,
};
use serde_json::Value;

fn firewalled(engine: &str) -> WorkflowModel {
    let mut wf = WorkflowModel::for_engine(engine);
    wf.network = Some(NetworkPermissions {
        allowed: vec!["defaults".into(), "pypi.org".into()],
        blocked: vec!["evil.example".into()],
        firewall: Some(FirewallConfig {
            version: Some("v0.12.0".into()),
            log_level: Some("debug".into()),
            ..Default::default()
        }),
    });
    wf
}

fn execution_body(wf: &WorkflowModel) -> String {
    let compiled = EngineRegistry::new()
        .compile(wf, "/tmp/awc/agent-stdio.log")
        .expect("compile");
    compiled.execution.last().expect("step").run.clone()
}

#[test]
fn test_wrapped_invocation_shape() {
    let body = execution_body(&firewalled("claude"));
    let line = body
        .lines()
        .find(|l| l.starts_with("sudo -E awf "))
        .expect("wrapper line");
    assert!(line.contains("--env-all --container-workdir \"${GITHUB_WORKSPACE}\""));
    assert!(line.contains("--block-domains evil.example"));
    assert!(line.contains("--log-level debug"));
    assert!(line.contains("--image-tag 0.12.0 --skip-pull"));
    assert!(line.contains("--enable-api-proxy --api-proxy-port=10000"));
    assert!(body.contains("\n  -- 'claude --print"));
    assert!(body.ends_with("\\\n  2>&1 | tee /tmp/awc/agent-stdio.log"));
}

#[test]
fn test_direct_invocation_without_firewall() {
    let body = execution_body(&WorkflowModel::for_engine("codex"));
    assert!(!body.contains("awf"));
    let last = body.lines().last().expect("line");
    assert!(last.starts_with("codex exec "));
    assert!(last.ends_with("2>&1 | tee /tmp/awc/agent-stdio.log"));
}

#[test]
fn test_argument_order_is_stable() {
    let mut wf = firewalled("copilot");
    wf.tools = Tools::new().with("github", Value::Null);
    wf.sandbox = Some(SandboxConfig {
        agent: Some(AgentSandboxConfig {
            mounts: vec!["/srv/b:/srv/b:ro".into(), "/srv/a:/srv/a:ro".into()],
            args: vec!["--tty".into()],
            ..Default::default()
        }),
    });
    let profile = EngineRegistry::global()
        .lookup("copilot")
        .expect("engine")
        .profile();
    let sandbox = awc_core::EngineSandboxProfile {
        domains: profile.default_domains,
        mounts: profile.container_mounts,
        api_proxy_port: None,
    };

    let first = SandboxPlan::from_workflow(&wf, sandbox).expect("plan").args();
    for _ in 0..5 {
        assert_eq!(SandboxPlan::from_workflow(&wf, sandbox).expect("plan").args(), first);
    }
    assert!(first.contains(&"--enable-host-access".to_string()));
    assert_eq!(first.last().map(String::as_str), Some("--tty"));

    let mounts: Vec<&String> = first
        .iter()
        .zip(first.iter().skip(1))
        .filter(|(flag, _)| *flag == "--mount")
        .map(|(_, value)| value)
        .collect();
    let mut sorted = mounts.clone();
    sorted.sort();
    assert_eq!(mounts, sorted);
}

#[test]
fn test_allowed_domains_merge_engine_and_workflow() {
    let wf = firewalled("codex");
    let plan = SandboxPlan::from_workflow(
        &wf,
        awc_core::EngineSandboxProfile {
            domains: &["api.openai.com"],
            mounts: &[],
            api_proxy_port: Some(10001),
        },
    )
    .expect("plan");
    assert!(plan.allowed_domains.contains(&"api.openai.com".to_string()));
    assert!(plan.allowed_domains.contains(&"pypi.org".to_string()));
    assert!(plan.allowed_domains.contains(&"archive.ubuntu.com".to_string()));
}

#[test]
fn test_escape_arg_round_trips_through_shlex() {
    for arg in [
        "plain",
        "two words",
        "it's quoted",
        "$(rm -rf /)",
        "a|b&c;d",
        "tab\there",
        "glob*?[x]",
        "mixed 'single' and \"double\"",
    ] {
        let escaped = escape_arg(arg);
        let split = shlex::split(&escaped).expect("valid shell word");
        assert_eq!(split, vec![arg.to_string()], "escaped form {escaped}");
    }
}

#[test]
fn test_inner_command_round_trips_as_single_token() {
    let inner = "claude --print --allowed-tools 'Bash(git status),Read' \"$(cat /tmp/p.txt)\"";
    let split = shlex::split(&escape_arg(inner)).expect("valid shell word");
    assert_eq!(split, vec![inner.to_string()]);
}
