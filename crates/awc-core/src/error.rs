//! Compiler error taxonomy.
//!
//! Compile-phase errors abort the whole call; no partial step list is ever
//! returned alongside one. Malformed tool declarations are not represented
//! here because they are recovered where they are classified.

/// Errors produced while compiling a workflow into steps.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unknown engine: {0} (known engines: {known})", known = crate::engine::EngineKind::known_ids().join(", "))]
    UnknownEngine(String),

    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    /// Shorthand for a missing-field configuration error.
    pub fn missing(field: impl Into<String>, context: impl Into<String>) -> Self {
        CompileError::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Whether this error stems from caller-supplied configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CompileError::UnknownEngine(_) | CompileError::MissingField { .. }
        )
    }
}
