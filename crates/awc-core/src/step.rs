//! Compiled CI step records.
//!
//! A [`Step`] is handed to an external renderer as-is. Field order in the
//! serialized form is part of that contract: `name`, `id`, `timeout-minutes`,
//! `env`, `run`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One CI step produced by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Human-readable step name.
    pub name: String,

    /// Stable id other steps can reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(
        rename = "timeout-minutes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout_minutes: Option<u32>,

    /// Step environment. Keys are sorted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Shell body.
    pub run: String,
}

impl Step {
    /// Create a step with only a name and a body.
    pub fn new(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            timeout_minutes: None,
            env: BTreeMap::new(),
            run: run.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timeout(mut self, minutes: u32) -> Self {
        self.timeout_minutes = Some(minutes);
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Add a single env entry, replacing any previous value for `key`.
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Whether any env value references `secrets.<name>` or the body does.
    pub fn references_secret(&self, name: &str) -> bool {
        let needle = format!("secrets.{name}");
        self.run.contains(&needle) || self.env.values().any(|v| v.contains(&needle))
    }
}
