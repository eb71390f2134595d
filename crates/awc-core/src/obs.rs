//! Structured observability hooks for compile and runner lifecycle events.
//!
//! This module provides:
//! - A workflow-scoped tracing span via the `CompileSpan` RAII guard
//! - Emission functions with stable `event = "..."` names for the compiler
//!   (`compile.*`, `tools.*`, `env.*`) and the runner (`runner.*`)
//!
//! Verbosity follows `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

/// RAII guard that enters a workflow-scoped span for one compilation.
///
/// # Example
///
/// ```ignore
/// let _span = CompileSpan::enter("issue-triage");
/// // every event below carries workflow = "issue-triage"
/// ```
pub struct CompileSpan {
    _span: tracing::span::EnteredSpan,
}

impl CompileSpan {
    pub fn enter(workflow: &str) -> Self {
        let span = tracing::info_span!("awc.compile", workflow = %workflow);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: compilation started for an engine.
pub fn emit_compile_started(engine_id: &str, workflow: &str) {
    info!(event = "compile.started", engine_id = %engine_id, workflow = %workflow);
}

/// Emit event: a phase produced its steps.
pub fn emit_steps_generated(engine_id: &str, phase: &str, count: usize) {
    info!(
        event = "compile.steps_generated",
        engine_id = %engine_id,
        phase = %phase,
        count = count,
    );
}

/// Emit event: tool permissions resolved.
pub fn emit_tools_resolved(unrestricted: bool, count: usize) {
    info!(event = "tools.resolved", unrestricted = unrestricted, count = count);
}

/// Emit event: a malformed tool declaration fell back to its category default (warning level).
pub fn emit_tool_declaration_recovered(tool: &str, reason: &str) {
    warn!(event = "tools.declaration_recovered", tool = %tool, reason = %reason);
}

/// Emit event: a secret-referencing env entry was dropped (warning level).
///
/// Only the key is logged; the value may be a secret expression.
pub fn emit_secret_dropped(key: &str) {
    warn!(event = "env.secret_dropped", key = %key);
}

/// Emit event: a workflow feature the engine does not support (warning level).
pub fn emit_feature_warning(engine_id: &str, message: &str) {
    warn!(event = "compile.feature_warning", engine_id = %engine_id, message = %message);
}

/// Emit event: runner started a session.
pub fn emit_runner_started(cli_path: &str, model: Option<&str>, streaming: bool) {
    info!(
        event = "runner.started",
        cli_path = %cli_path,
        model = %model.unwrap_or("default"),
        streaming = streaming,
    );
}

/// Emit event: runner finished with duration, turns and token totals.
pub fn emit_runner_finished(success: bool, duration_ms: u64, turns: u64, total_tokens: u64) {
    info!(
        event = "runner.finished",
        success = success,
        duration_ms = duration_ms,
        turns = turns,
        total_tokens = total_tokens,
    );
}

/// Emit event: runner stopped by cancellation or deadline (warning level).
pub fn emit_runner_cancelled(reason: &str) {
    warn!(event = "runner.cancelled", reason = %reason);
}

/// Emit event: metrics could not be written (warning level).
pub fn emit_metrics_flush_error(path: &str, error: &dyn std::fmt::Display) {
    warn!(event = "runner.metrics_flush_error", path = %path, error = %error);
}
