//! Session metrics aggregation.
//!
//! Events may arrive from any task; every update happens under one
//! `parking_lot::Mutex`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::SessionEvent;

/// Point-in-time copy of the aggregated metrics; also the metrics file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub turns: u64,
    pub tool_calls: BTreeMap<String, u64>,
    pub total_tool_calls: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl MetricsSnapshot {
    fn started_now() -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            turns: 0,
            tool_calls: BTreeMap::new(),
            total_tool_calls: 0,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            session_id: None,
            model: None,
            errors: Vec::new(),
        }
    }
}

/// Concurrent-safe metrics collector fed by session events.
#[derive(Debug)]
pub struct Metrics {
    inner: Mutex<MetricsSnapshot>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Start the clock now.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::started_now()),
        }
    }

    pub fn handle_event(&self, event: &SessionEvent) {
        let mut m = self.inner.lock();
        match event {
            SessionEvent::Usage {
                input_tokens,
                output_tokens,
            } => {
                m.input_tokens += input_tokens;
                m.output_tokens += output_tokens;
                m.total_tokens = m.input_tokens + m.output_tokens;
            }
            SessionEvent::ToolExecutionStart { tool_name } => {
                *m.tool_calls.entry(tool_name.clone()).or_insert(0) += 1;
                m.total_tool_calls += 1;
            }
            SessionEvent::TurnStart => m.turns += 1,
            SessionEvent::SessionStart {
                session_id,
                selected_model,
            } => {
                m.session_id = Some(session_id.clone());
                if let Some(model) = selected_model {
                    m.model = Some(model.clone());
                }
            }
            SessionEvent::Error { message } => m.errors.push(message.clone()),
            _ => {}
        }
    }

    /// Record a failure that did not arrive as a session event.
    pub fn record_error(&self, message: impl Into<String>) {
        self.inner.lock().errors.push(message.into());
    }

    /// Stamp the end time and duration. Later calls overwrite earlier ones.
    pub fn finalize(&self) {
        let mut m = self.inner.lock();
        let end = Utc::now();
        let elapsed = end.signed_duration_since(m.start_time).num_milliseconds();
        m.end_time = Some(end);
        m.duration_ms = Some(u64::try_from(elapsed).unwrap_or(0));
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().clone()
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        let m = self.snapshot();
        let mut lines = vec!["=== awc-runner metrics ===".to_string()];
        if let Some(model) = &m.model {
            lines.push(format!("Model: {model}"));
        }
        lines.push(format!("Turns: {}", m.turns));
        lines.push(format!(
            "Tokens: {} (input: {}, output: {})",
            m.total_tokens, m.input_tokens, m.output_tokens
        ));
        lines.push(format!("Tool calls: {}", m.total_tool_calls));
        for (tool, count) in &m.tool_calls {
            lines.push(format!("  {tool}: {count}"));
        }
        if let Some(ms) = m.duration_ms {
            lines.push(format!("Duration: {ms}ms"));
        }
        if !m.errors.is_empty() {
            lines.push(format!("Errors: {}", m.errors.len()));
            lines.extend(m.errors.iter().map(|e| format!("  - {e}")));
        }
        lines.join("\n")
    }

    /// Write the snapshot as pretty JSON.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
