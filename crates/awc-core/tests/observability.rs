//! Observability tests for compile and runner lifecycle tracing.
//!
//! Registries are built inside each test so engine spans nest under the
//! test's own span and their events are captured.

use awc_core::{
    emit_metrics_flush_error, emit_runner_cancelled, emit_runner_finished, emit_runner_started,
    CompileSpan, EngineRegistry, Tools, WorkflowModel,
};
use serde_json::json;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_compile_emits_lifecycle_events() {
    let registry = EngineRegistry::new();
    let mut wf = WorkflowModel::for_engine("claude");
    wf.name = "weekly-report".into();

    let _span = CompileSpan::enter(&wf.name);
    registry
        .compile(&wf, "/tmp/awc/agent-stdio.log")
        .expect("compile");

    assert!(logs_contain("compile.started"));
    assert!(logs_contain("compile.steps_generated"));
    assert!(logs_contain("phase=installation"));
    assert!(logs_contain("phase=execution"));
    assert!(logs_contain("tools.resolved"));
    assert!(logs_contain("workflow=weekly-report"));
}

#[traced_test]
#[test]
fn test_engine_span_carries_engine_id() {
    let registry = EngineRegistry::new();
    let engine = registry.lookup("codex").expect("engine");
    engine.installation_steps(&WorkflowModel::for_engine("codex"));
    assert!(logs_contain("awc.engine"));
    assert!(logs_contain("engine_id=codex"));
}

#[traced_test]
#[test]
fn test_dropped_secret_logs_key_only() {
    let registry = EngineRegistry::new();
    let mut wf = WorkflowModel::for_engine("copilot");
    wf.engine
        .env
        .insert("STOLEN".into(), "${{ secrets.PROD_DB_PASSWORD }}".into());
    registry
        .compile(&wf, "/tmp/awc/agent-stdio.log")
        .expect("compile");

    assert!(logs_contain("env.secret_dropped"));
    assert!(logs_contain("STOLEN"));
    assert!(!logs_contain("PROD_DB_PASSWORD"));
}

#[traced_test]
#[test]
fn test_feature_warning_is_logged() {
    let registry = EngineRegistry::new();
    let mut wf = WorkflowModel::for_engine("codex");
    wf.tools = Tools::new().with("web-fetch", json!(null));
    let warnings = registry.lookup("codex").expect("engine").feature_warnings(&wf);
    assert_eq!(warnings.len(), 1);
    assert!(logs_contain("compile.feature_warning"));
    assert!(logs_contain("does not support web-fetch"));
}

#[traced_test]
#[test]
fn test_malformed_tool_declaration_is_recovered() {
    let _ = EngineRegistry::new()
        .lookup("copilot")
        .expect("engine")
        .resolve_capabilities(&WorkflowModel {
            tools: Tools::new().with("bash", json!(42)),
            ..WorkflowModel::for_engine("copilot")
        });
    assert!(logs_contain("tools.declaration_recovered"));
    assert!(logs_contain("tool=bash"));
}

#[traced_test]
#[test]
fn test_runner_events() {
    emit_runner_started("copilot", Some("gpt-5"), true);
    emit_runner_finished(true, 1200, 3, 4800);
    emit_runner_cancelled("deadline exceeded");
    emit_metrics_flush_error("/tmp/metrics.json", &"disk full");

    assert!(logs_contain("runner.started"));
    assert!(logs_contain("model=gpt-5"));
    assert!(logs_contain("total_tokens=4800"));
    assert!(logs_contain("runner.cancelled"));
    assert!(logs_contain("runner.metrics_flush_error"));
}

#[traced_test]
#[test]
fn test_runner_started_without_model_logs_default() {
    emit_runner_started("/usr/local/bin/copilot", None, false);
    assert!(logs_contain("model=default"));
}
