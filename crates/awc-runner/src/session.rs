//! Agent session seam: events, the event bus and the client traits.
//!
//! A client owns the agent backend; a session sends one prompt and publishes
//! every event it observes on an [`EventBus`]. Handlers are registered with
//! [`EventBus::subscribe`] and removed when the returned [`Subscription`]
//! is dropped.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mcp::McpServers;

/// One event emitted by an agent session, tagged by its dotted type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    #[serde(rename = "session.start")]
    SessionStart {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_model: Option<String>,
    },

    #[serde(rename = "assistant.turn_start")]
    TurnStart,

    #[serde(rename = "assistant.message")]
    Message { content: String },

    #[serde(rename = "assistant.message_delta")]
    MessageDelta { delta_content: String },

    #[serde(rename = "assistant.usage")]
    Usage {
        #[serde(default)]
        input_tokens: u64,
        #[serde(default)]
        output_tokens: u64,
    },

    #[serde(rename = "tool.execution_start")]
    ToolExecutionStart { tool_name: String },

    #[serde(rename = "tool.execution_complete")]
    ToolExecutionComplete { tool_name: String },

    #[serde(rename = "session.error")]
    Error { message: String },

    #[serde(rename = "session.idle")]
    Idle,

    /// Event types this runner does not interpret.
    #[serde(other)]
    Unknown,
}

/// Options sent when a session is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    pub streaming: bool,

    /// Absent means every tool is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_tools: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<McpServers>,
}

type Handler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    next_id: u64,
    entries: Vec<(u64, Handler)>,
}

/// Fan-out of session events to registered handlers.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<Handlers>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` until the returned subscription is dropped.
    #[must_use = "the handler is removed when the subscription is dropped"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.lock();
        let id = handlers.next_id;
        handlers.next_id += 1;
        handlers.entries.push((id, Arc::new(handler)));
        Subscription {
            handlers: Arc::downgrade(&self.handlers),
            id,
        }
    }

    /// Deliver `event` to every handler in registration order.
    pub fn publish(&self, event: &SessionEvent) {
        // Handlers run outside the lock so they may subscribe or publish.
        let snapshot: Vec<Handler> = self
            .handlers
            .lock()
            .entries
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in snapshot {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().entries.len()
    }
}

/// Handle for one registered handler.
pub struct Subscription {
    handlers: Weak<Mutex<Handlers>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Backend that can host agent sessions.
#[async_trait]
pub trait AgentClient: Send {
    /// Bring the backend up (e.g. spawn the CLI server).
    async fn start(&mut self) -> Result<()>;

    /// Open a session that publishes its events on `events`.
    async fn create_session(
        &mut self,
        options: SessionOptions,
        events: EventBus,
    ) -> Result<Box<dyn AgentSession>>;

    /// Shut the backend down. Called on every path once started.
    async fn stop(&mut self) -> Result<()>;
}

/// One conversation with the agent.
#[async_trait]
pub trait AgentSession: Send {
    /// Session id once the backend has announced it.
    fn session_id(&self) -> Option<&str>;

    /// Send `prompt` and wait until the session is idle.
    ///
    /// Returns the last complete assistant message, if any.
    async fn send_and_wait(&mut self, prompt: &str) -> Result<Option<String>>;
}
