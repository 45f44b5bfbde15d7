//! The status dictionary every tool answers with.

use agent_experts_core::tool::{Error as ToolError, ToolResult};
use serde::Serialize;

/// Result of a tool.
///
/// Serializes as `{"status": "success", ...fields of T}` or
/// `{"status": "error", "error_message": "..."}`, which is also what the
/// model sees.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome<T> {
    /// The tool produced a result.
    Success(T),
    /// The tool failed.
    Error {
        /// Human-readable reason.
        error_message: String,
    },
}

impl<T> ToolOutcome<T> {
    /// Creates an error outcome.
    #[inline]
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self::Error {
            error_message: message.into(),
        }
    }

    /// Returns the error message of an error outcome.
    #[inline]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error { error_message } => Some(error_message),
        }
    }

    /// Returns the result of a successful outcome.
    #[inline]
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error { .. } => None,
        }
    }

    /// Whether this is an error outcome.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl<T: Serialize> ToolOutcome<T> {
    /// Converts the outcome to what the agent loop expects from a tool.
    ///
    /// Error outcomes become tool errors, the agent reports them to the
    /// model with the same `status`/`error_message` shape.
    pub fn into_tool_result(self) -> ToolResult {
        match self {
            Self::Error { error_message } => {
                Err(ToolError::execution_error().with_reason(error_message))
            }
            success => serde_json::to_value(&success).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            }),
        }
    }
}
