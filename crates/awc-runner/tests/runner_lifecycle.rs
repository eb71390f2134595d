//! Runner lifecycle against a scripted in-memory client.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use awc_core::RunnerConfig;
use awc_runner::{
    AgentClient, AgentSession, EventBus, MetricsSnapshot, Result, Runner, RunnerError,
    SessionEvent, SessionOptions,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Probe {
    started: AtomicBool,
    stopped: AtomicBool,
    sessions: AtomicUsize,
}

/// Publishes `script` then goes idle, or never finishes when `hang` is set.
struct ScriptedClient {
    script: Vec<SessionEvent>,
    hang: bool,
    probe: Arc<Probe>,
    last_options: Option<SessionOptions>,
}

impl ScriptedClient {
    fn new(script: Vec<SessionEvent>) -> Self {
        Self {
            script,
            hang: false,
            probe: Arc::new(Probe::default()),
            last_options: None,
        }
    }

    fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl AgentClient for ScriptedClient {
    async fn start(&mut self) -> Result<()> {
        self.probe.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn create_session(
        &mut self,
        options: SessionOptions,
        events: EventBus,
    ) -> Result<Box<dyn AgentSession>> {
        self.probe.sessions.fetch_add(1, Ordering::SeqCst);
        self.last_options = Some(options);
        Ok(Box::new(ScriptedSession {
            script: self.script.clone(),
            hang: self.hang,
            events,
            session_id: None,
        }))
    }

    async fn stop(&mut self) -> Result<()> {
        self.probe.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedSession {
    script: Vec<SessionEvent>,
    hang: bool,
    events: EventBus,
    session_id: Option<String>,
}

#[async_trait]
impl AgentSession for ScriptedSession {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    async fn send_and_wait(&mut self, _prompt: &str) -> Result<Option<String>> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        let mut last = None;
        for event in &self.script {
            self.events.publish(event);
            match event {
                SessionEvent::SessionStart { session_id, .. } => {
                    self.session_id = Some(session_id.clone())
                }
                SessionEvent::Message { content } => last = Some(content.clone()),
                SessionEvent::Error { message } => {
                    return Err(RunnerError::Session(message.clone()))
                }
                _ => {}
            }
        }
        self.events.publish(&SessionEvent::Idle);
        Ok(last)
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: RunnerConfig,
    metrics_path: std::path::PathBuf,
}

fn fixture(prompt: &str) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let prompt_path = dir.path().join("prompt.txt");
    std::fs::write(&prompt_path, prompt).expect("prompt");
    let metrics_path = dir.path().join("sdk-metrics.json");
    let config = RunnerConfig {
        prompt_file: prompt_path.display().to_string(),
        metrics_file: Some(metrics_path.display().to_string()),
        streaming: true,
        ..RunnerConfig::default()
    };
    Fixture {
        _dir: dir,
        config,
        metrics_path,
    }
}

fn read_metrics(path: &std::path::Path) -> MetricsSnapshot {
    let raw = std::fs::read_to_string(path).expect("metrics file");
    serde_json::from_str(&raw).expect("metrics json")
}

fn conversation() -> Vec<SessionEvent> {
    vec![
        SessionEvent::SessionStart {
            session_id: "sess-42".into(),
            selected_model: Some("gpt-5".into()),
        },
        SessionEvent::TurnStart,
        SessionEvent::ToolExecutionStart { tool_name: "shell".into() },
        SessionEvent::ToolExecutionComplete { tool_name: "shell".into() },
        SessionEvent::Usage {
            input_tokens: 1200,
            output_tokens: 300,
        },
        SessionEvent::TurnStart,
        SessionEvent::MessageDelta { delta_content: "Done".into() },
        SessionEvent::Message { content: "Done.".into() },
    ]
}

#[tokio::test]
async fn test_successful_run_collects_metrics() {
    let fx = fixture("Summarize open issues.");
    let mut client = ScriptedClient::new(conversation());
    let probe = Arc::clone(&client.probe);

    let outcome = Runner::new(fx.config.clone())
        .run(&mut client, CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.session_id.as_deref(), Some("sess-42"));
    assert_eq!(outcome.final_message.as_deref(), Some("Done."));
    assert_eq!(outcome.metrics.turns, 2);
    assert_eq!(outcome.metrics.total_tokens, 1500);
    assert_eq!(outcome.metrics.tool_calls["shell"], 1);
    assert!(probe.started.load(Ordering::SeqCst));
    assert!(probe.stopped.load(Ordering::SeqCst));

    let written = read_metrics(&fx.metrics_path);
    assert_eq!(written.model.as_deref(), Some("gpt-5"));
    assert!(written.end_time.is_some());
}

#[tokio::test]
async fn test_already_cancelled_never_starts_client() {
    let fx = fixture("anything");
    let mut client = ScriptedClient::new(conversation());
    let probe = Arc::clone(&client.probe);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = Runner::new(fx.config.clone())
        .run(&mut client, cancel)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, RunnerError::Cancelled));
    assert!(err.is_cancellation());
    assert!(!probe.started.load(Ordering::SeqCst));
    assert_eq!(probe.sessions.load(Ordering::SeqCst), 0);
    assert!(read_metrics(&fx.metrics_path).duration_ms.is_some());
}

#[tokio::test]
async fn test_cancel_during_session() {
    let fx = fixture("long task");
    let mut client = ScriptedClient::hanging();
    let probe = Arc::clone(&client.probe);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = Runner::new(fx.config.clone())
        .run(&mut client, cancel)
        .await
        .expect_err("cancelled");
    assert!(matches!(err, RunnerError::Cancelled));
    assert!(probe.stopped.load(Ordering::SeqCst));
    assert!(fx.metrics_path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded() {
    let mut fx = fixture("slow task");
    fx.config.timeout = Some(5);
    let mut client = ScriptedClient::hanging();

    let err = Runner::new(fx.config.clone())
        .run(&mut client, CancellationToken::new())
        .await
        .expect_err("deadline");
    assert!(matches!(err, RunnerError::DeadlineExceeded(d) if d == Duration::from_secs(5)));
    assert!(err.is_cancellation());
}

#[tokio::test]
async fn test_session_error_is_recorded() {
    let fx = fixture("task");
    let mut client = ScriptedClient::new(vec![
        SessionEvent::TurnStart,
        SessionEvent::Error {
            message: "model overloaded".into(),
        },
    ]);

    let err = Runner::new(fx.config.clone())
        .run(&mut client, CancellationToken::new())
        .await
        .expect_err("session error");
    assert!(matches!(err, RunnerError::Session(ref m) if m == "model overloaded"));
    assert!(!err.is_cancellation());

    let written = read_metrics(&fx.metrics_path);
    assert!(written.errors.iter().any(|e| e == "model overloaded"));
}

#[tokio::test]
async fn test_empty_prompt_is_configuration_error() {
    let fx = fixture("   \n");
    let mut client = ScriptedClient::new(conversation());
    let probe = Arc::clone(&client.probe);

    let err = Runner::new(fx.config.clone())
        .run(&mut client, CancellationToken::new())
        .await
        .expect_err("empty prompt");
    assert!(matches!(err, RunnerError::Config(_)));
    assert!(!probe.started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_session_options_from_config() {
    let mut fx = fixture("task");
    fx.config.model = Some("claude-sonnet-4".into());
    fx.config.working_directory = "/work/repo".into();
    fx.config.available_tools = Some(vec!["shell(ls)".into()]);
    fx.config.excluded_tools = Some(Vec::new());
    fx.config.mcp_config_path = Some("/nonexistent/mcp-config.json".into());
    let mut client = ScriptedClient::new(conversation());

    Runner::new(fx.config.clone())
        .run(&mut client, CancellationToken::new())
        .await
        .expect("run");

    let options = client.last_options.expect("options");
    assert_eq!(options.model.as_deref(), Some("claude-sonnet-4"));
    assert_eq!(options.working_directory.as_deref(), Some("/work/repo"));
    assert_eq!(options.available_tools, Some(vec!["shell(ls)".to_string()]));
    assert!(options.excluded_tools.is_none());
    assert!(options.mcp_servers.is_none());
    assert!(options.streaming);
}
