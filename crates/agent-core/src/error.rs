//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Parse error (e.g., protocol message parsing)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Session error (e.g., use after close)
    #[error("Session error: {0}")]
    Session(String),

    /// Transport to the tool host failed (process gone, pipe closed, ...)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Tool host answered, but not with a usable content list
    #[error("Malformed tool response: {0}")]
    MalformedResponse(String),

    /// JSON-RPC error object returned by the remote side
    #[error("Remote error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::Session(_) | Self::Channel(_) => {
                "The weather service connection is not available.".into()
            }
            Self::MalformedResponse(_) => "Unexpected result format from weather tool".into(),
            Self::Rpc { message, .. } => format!("The tool host rejected the request: {message}"),
            Self::Config(msg) => format!("The assistant is not configured correctly: {msg}"),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_internals() {
        let err = AgentError::Channel("broken pipe (os error 32)".into());
        assert!(!err.user_message().contains("os error"));

        let err = AgentError::MalformedResponse("content missing".into());
        assert_eq!(err.user_message(), "Unexpected result format from weather tool");
    }
}
