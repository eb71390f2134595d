//! Agent client backed by the CLI's headless stdio protocol.
//!
//! The CLI is spawned as `<cli_path> --headless --stdio --log-level <level>`.
//! Requests are written to its stdin as one JSON object per line; session
//! events are read back from stdout as JSON lines until `session.idle`.

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use awc_core::RunnerConfig;

use crate::error::{Result, RunnerError};
use crate::session::{AgentClient, AgentSession, EventBus, SessionEvent, SessionOptions};

/// Spawns and owns the agent CLI process.
#[derive(Debug)]
pub struct ProcessClient {
    cli_path: String,
    log_level: String,
    working_directory: Option<String>,
    github_token: Option<String>,
    child: Option<Child>,
}

impl ProcessClient {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            cli_path: config.cli_path.clone(),
            log_level: config.log_level.clone(),
            working_directory: Some(config.working_directory.clone()).filter(|d| !d.is_empty()),
            github_token: config.github_token.clone(),
            child: None,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(["--headless", "--stdio", "--log-level", &self.log_level])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        if let Some(token) = &self.github_token {
            cmd.env("COPILOT_GITHUB_TOKEN", token);
        }
        cmd
    }
}

#[async_trait]
impl AgentClient for ProcessClient {
    async fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(RunnerError::Process("agent process already started".into()));
        }
        let child = self
            .command()
            .spawn()
            .map_err(|e| RunnerError::Process(format!("failed to spawn {}: {e}", self.cli_path)))?;
        tracing::info!(cli_path = %self.cli_path, pid = ?child.id(), "agent process started");
        self.child = Some(child);
        Ok(())
    }

    async fn create_session(
        &mut self,
        options: SessionOptions,
        events: EventBus,
    ) -> Result<Box<dyn AgentSession>> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| RunnerError::Process("agent process not started".into()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RunnerError::Process("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Process("failed to capture stdout".into()))?;

        let mut session = ProcessSession {
            stdin,
            lines: BufReader::new(stdout).lines(),
            events,
            session_id: None,
        };
        session
            .request(json!({"method": "session.create", "params": options}))
            .await?;
        Ok(Box::new(session))
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        if child.try_wait()?.is_none() {
            child.start_kill()?;
        }
        let status = child.wait().await?;
        tracing::debug!(?status, "agent process stopped");
        Ok(())
    }
}

/// Session over the child's stdin/stdout pipes.
struct ProcessSession {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    events: EventBus,
    session_id: Option<String>,
}

impl ProcessSession {
    async fn request(&mut self, request: serde_json::Value) -> Result<()> {
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AgentSession for ProcessSession {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    async fn send_and_wait(&mut self, prompt: &str) -> Result<Option<String>> {
        self.request(json!({"method": "session.send", "params": {"prompt": prompt}}))
            .await?;

        let mut last_message = None;
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event: SessionEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping non-event output line");
                    continue;
                }
            };
            self.events.publish(&event);
            match event {
                SessionEvent::SessionStart { session_id, .. } => self.session_id = Some(session_id),
                SessionEvent::Message { content } => last_message = Some(content),
                SessionEvent::Error { message } => return Err(RunnerError::Session(message)),
                SessionEvent::Idle => return Ok(last_message),
                _ => {}
            }
        }
        Err(RunnerError::Process(
            "agent process exited before the session went idle".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = RunnerConfig {
            cli_path: "/usr/local/bin/copilot".into(),
            github_token: Some("ghp_test".into()),
            ..RunnerConfig::default()
        };
        let client = ProcessClient::from_config(&config);
        assert_eq!(client.cli_path, "/usr/local/bin/copilot");
        assert!(client.working_directory.is_none());
        assert_eq!(client.log_level, "info");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_process_error() {
        let config = RunnerConfig {
            cli_path: "/nonexistent/awc-test-cli".into(),
            ..RunnerConfig::default()
        };
        let mut client = ProcessClient::from_config(&config);
        let err = client.start().await.expect_err("spawn must fail");
        assert!(matches!(err, RunnerError::Process(_)));
        client.stop().await.expect("stop without child");
    }

    #[tokio::test]
    async fn test_session_before_start_fails() {
        let mut client = ProcessClient::from_config(&RunnerConfig::default());
        let result = client
            .create_session(SessionOptions::default(), EventBus::new())
            .await;
        assert!(matches!(result, Err(RunnerError::Process(_))));
    }
}
