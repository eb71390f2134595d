//! Result document printed on stdout when the runner exits.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutput {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.to_string()),
        }
    }

    /// Single-line JSON document.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("{{\"success\":{},\"message\":\"output serialization failed\"}}", self.success)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_omits_error() {
        assert_eq!(
            RunOutput::success("done").to_json(),
            r#"{"success":true,"message":"done"}"#
        );
    }

    #[test]
    fn test_failure_carries_error() {
        let out = RunOutput::failure("runner failed", "run cancelled");
        let parsed: RunOutput = serde_json::from_str(&out.to_json()).expect("json");
        assert!(!parsed.success);
        assert_eq!(parsed.error.as_deref(), Some("run cancelled"));
    }
}
