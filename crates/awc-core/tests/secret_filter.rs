//! Secret containment: compiled steps only reference declared secrets.

use std::collections::BTreeMap;

use awc_core::secrets::{extract_secret_names, is_secret_reference};
use awc_core::{filter_env_for_secrets, EngineRegistry, Tools, WorkflowModel};
use serde_json::json;

fn sample_env() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("GITHUB_WORKSPACE".to_string(), "${{ github.workspace }}".to_string()),
        ("PLAIN".to_string(), "value".to_string()),
        ("ANTHROPIC_API_KEY".to_string(), "${{ secrets.ANTHROPIC_API_KEY }}".to_string()),
        ("OPENAI_API_KEY".to_string(), "${{ secrets.OPENAI_API_KEY }}".to_string()),
        ("LEAKY".to_string(), "prefix ${{ secrets.DEPLOY_KEY }}".to_string()),
    ])
}

#[test]
fn test_filter_never_returns_undeclared_secret() {
    let allowed = vec!["ANTHROPIC_API_KEY".to_string()];
    let filtered = filter_env_for_secrets(&sample_env(), &allowed);

    for (key, value) in &filtered {
        if is_secret_reference(value) {
            assert!(allowed.contains(key), "{key} leaked");
        }
    }
    assert!(filtered.contains_key("PLAIN"));
    assert!(filtered.contains_key("GITHUB_WORKSPACE"));
    assert!(!filtered.contains_key("LEAKY"));
}

#[test]
fn test_filter_with_all_secret_names_is_noop() {
    let env = sample_env();
    let all: Vec<String> = env
        .iter()
        .filter(|(_, v)| is_secret_reference(v))
        .flat_map(|(k, v)| std::iter::once(k.clone()).chain(extract_secret_names(v)))
        .collect();
    assert_eq!(filter_env_for_secrets(&env, &all), env);
}

#[test]
fn test_filter_with_empty_allow_list_keeps_non_secrets() {
    let filtered = filter_env_for_secrets(&sample_env(), &[]);
    assert_eq!(filtered.len(), 2);
}

#[test]
fn test_compiled_steps_reference_only_required_secrets() {
    let registry = EngineRegistry::new();
    for id in ["copilot", "copilot-sdk", "claude", "codex"] {
        let mut wf = WorkflowModel::for_engine(id);
        wf.tools = Tools::new()
            .with("github", json!({"allowed": ["list_issues"]}))
            .with(
                "search",
                json!({
                    "type": "http",
                    "url": "https://search.example/mcp",
                    "headers": {"X-Api-Key": "${{ secrets.SEARCH_KEY }}"}
                }),
            );
        wf.engine.env.insert("STOLEN".into(), "${{ secrets.PROD_DB_PASSWORD }}".into());

        let engine = registry.lookup(id).expect("engine");
        let required = engine.required_secret_names(&wf);
        let compiled = registry.compile(&wf, "/tmp/awc/agent-stdio.log").expect("compile");

        for step in compiled.installation.iter().chain(compiled.execution.iter()) {
            for (key, value) in &step.env {
                if is_secret_reference(value) {
                    assert!(
                        required.contains(key),
                        "{id}: step '{}' references undeclared secret via {key}",
                        step.name
                    );
                }
            }
            assert!(!step.references_secret("PROD_DB_PASSWORD"));
        }

        let exec = compiled.execution.last().expect("execution step");
        assert_eq!(exec.env["SEARCH_KEY"], "${{ secrets.SEARCH_KEY }}");
        assert!(exec.env["GITHUB_MCP_SERVER_TOKEN"].contains("secrets.AWC_GITHUB_MCP_SERVER_TOKEN"));
    }
}

#[test]
fn test_overridden_credential_key_cannot_forward_other_secret() {
    let registry = EngineRegistry::new();
    let mut wf = WorkflowModel::for_engine("claude");
    wf.engine
        .env
        .insert("ANTHROPIC_API_KEY".into(), "${{ secrets.PROD_DB_PASSWORD }}".into());
    wf.engine.steps.push(
        awc_core::Step::new("Prepare", "true")
            .env_var("CLAUDE_CODE_OAUTH_TOKEN", "${{ secrets.PROD_DB_PASSWORD }}"),
    );

    let compiled = registry.compile(&wf, "/tmp/awc/agent-stdio.log").expect("compile");
    for step in compiled.installation.iter().chain(compiled.execution.iter()) {
        assert!(
            !step.references_secret("PROD_DB_PASSWORD"),
            "step '{}' forwards an undeclared secret",
            step.name
        );
    }
    let exec = compiled.execution.last().expect("execution step");
    assert!(!exec.env.contains_key("ANTHROPIC_API_KEY"));
    assert_eq!(exec.env["CLAUDE_CODE_OAUTH_TOKEN"], "${{ secrets.CLAUDE_CODE_OAUTH_TOKEN }}");
}

#[test]
fn test_github_token_override_is_forwarded() {
    let registry = EngineRegistry::new();
    let mut wf = WorkflowModel::for_engine("copilot");
    wf.github_token = Some("${{ secrets.MY_PAT }}".into());
    wf.tools = Tools::new().with("github", json!({"github-token": "${{ secrets.MCP_PAT }}"}));

    let compiled = registry.compile(&wf, "/tmp/awc/agent-stdio.log").expect("compile");
    let exec = compiled.execution.last().expect("execution step");
    assert_eq!(exec.env["COPILOT_GITHUB_TOKEN"], "${{ secrets.MY_PAT }}");
    assert_eq!(exec.env["GITHUB_MCP_SERVER_TOKEN"], "${{ secrets.MCP_PAT }}");
    assert_eq!(
        compiled.installation[0].env["COPILOT_GITHUB_TOKEN"],
        "${{ secrets.MY_PAT }}"
    );
}

#[test]
fn test_extract_secret_names_from_cascade() {
    assert_eq!(
        extract_secret_names("${{ secrets.A || secrets.B_2 || secrets.GITHUB_TOKEN }}"),
        vec!["A", "B_2", "GITHUB_TOKEN"]
    );
}
