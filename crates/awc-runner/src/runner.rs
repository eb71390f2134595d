//! Runner: drives one agent session from a [`RunnerConfig`].
//!
//! Every run ends by finalizing the metrics, logging the summary and
//! flushing the metrics file when one is configured, whatever the outcome.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use awc_core::{obs, RunnerConfig};
use tokio_util::sync::CancellationToken;

use crate::config::effective_timeout;
use crate::error::{Result, RunnerError};
use crate::mcp::load_mcp_servers;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::session::{AgentClient, EventBus, SessionEvent, SessionOptions};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: Option<String>,
    /// Last complete assistant message.
    pub final_message: Option<String>,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug)]
pub struct Runner {
    config: RunnerConfig,
    metrics: Arc<Metrics>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn timeout(&self) -> Duration {
        effective_timeout(&self.config)
    }

    /// Run the prompt to completion, cancellation, or deadline.
    pub async fn run<C>(&self, client: &mut C, cancel: CancellationToken) -> Result<RunOutcome>
    where
        C: AgentClient + ?Sized,
    {
        let result = if cancel.is_cancelled() {
            Err(RunnerError::Cancelled)
        } else {
            self.drive(client, &cancel).await
        };

        if let Err(e) = &result {
            if e.is_cancellation() {
                obs::emit_runner_cancelled(&e.to_string());
            } else {
                self.metrics.record_error(e.to_string());
            }
        }
        self.finish(result.is_ok());

        let (session_id, final_message) = result?;
        Ok(RunOutcome {
            session_id,
            final_message,
            metrics: self.metrics.snapshot(),
        })
    }

    async fn drive<C>(
        &self,
        client: &mut C,
        cancel: &CancellationToken,
    ) -> Result<(Option<String>, Option<String>)>
    where
        C: AgentClient + ?Sized,
    {
        let prompt = self.read_prompt().await?;
        obs::emit_runner_started(
            &self.config.cli_path,
            self.config.model.as_deref(),
            self.config.streaming,
        );
        tracing::info!(prompt_chars = prompt.chars().count(), "prompt loaded");

        let events = EventBus::new();
        let metrics = Arc::clone(&self.metrics);
        let _metrics_sub = events.subscribe(move |e| metrics.handle_event(e));
        let streaming = self.config.streaming;
        let _output_sub = events.subscribe(move |e| echo_event(e, streaming));

        client.start().await?;
        let outcome = self.converse(client, events, &prompt, cancel).await;
        if let Err(e) = client.stop().await {
            tracing::warn!(error = %e, "failed to stop agent client");
        }
        outcome
    }

    async fn converse<C>(
        &self,
        client: &mut C,
        events: EventBus,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<(Option<String>, Option<String>)>
    where
        C: AgentClient + ?Sized,
    {
        let mut session = client.create_session(self.session_options(), events).await?;
        let timeout = self.timeout();

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunnerError::Cancelled),
            sent = tokio::time::timeout(timeout, session.send_and_wait(prompt)) => {
                sent.unwrap_or(Err(RunnerError::DeadlineExceeded(timeout)))
            }
        };

        let session_id = session.session_id().map(str::to_string);
        Ok((session_id, reply?))
    }

    fn session_options(&self) -> SessionOptions {
        let mcp_servers = self.config.mcp_config_path.as_deref().and_then(|path| {
            match load_mcp_servers(Path::new(path)) {
                Ok(servers) => servers,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "ignoring unreadable MCP config");
                    None
                }
            }
        });
        SessionOptions {
            model: self.config.model.clone().filter(|m| !m.is_empty()),
            working_directory: Some(self.config.working_directory.clone())
                .filter(|d| !d.is_empty()),
            streaming: self.config.streaming,
            available_tools: self.config.available_tools.clone(),
            excluded_tools: self.config.excluded_tools.clone().filter(|t| !t.is_empty()),
            mcp_servers,
        }
    }

    async fn read_prompt(&self) -> Result<String> {
        let path = &self.config.prompt_file;
        let prompt = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RunnerError::Config(format!("cannot read prompt file {path}: {e}")))?;
        if prompt.trim().is_empty() {
            return Err(RunnerError::Config(format!("prompt file {path} is empty")));
        }
        Ok(prompt)
    }

    fn finish(&self, success: bool) {
        self.metrics.finalize();
        let m = self.metrics.snapshot();
        tracing::info!("{}", self.metrics.summary());
        obs::emit_runner_finished(
            success,
            m.duration_ms.unwrap_or(0),
            m.turns,
            m.total_tokens,
        );

        if let Some(path) = self.config.metrics_file.as_deref().filter(|p| !p.is_empty()) {
            match self.metrics.write_to_file(Path::new(path)) {
                Ok(()) => tracing::debug!(path = %path, "metrics written"),
                Err(e) => obs::emit_metrics_flush_error(path, &e),
            }
        }
    }
}

/// Assistant text goes to stderr; stdout is reserved for the result document.
fn echo_event(event: &SessionEvent, streaming: bool) {
    match event {
        SessionEvent::MessageDelta { delta_content } if streaming => eprint!("{delta_content}"),
        SessionEvent::Message { content } if !streaming => eprintln!("{content}"),
        SessionEvent::Message { .. } => eprintln!(),
        SessionEvent::ToolExecutionStart { tool_name } => {
            tracing::info!(tool = %tool_name, "executing tool");
        }
        SessionEvent::ToolExecutionComplete { tool_name } => {
            tracing::debug!(tool = %tool_name, "tool complete");
        }
        SessionEvent::Error { message } => tracing::warn!(error = %message, "session error"),
        _ => {}
    }
}
