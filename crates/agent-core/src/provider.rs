//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM providers (OpenAI, Ollama, etc.)
//! allowing the orchestrator to work with any backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = OpenAiProvider::from_config(config);
//! let text = provider
//!     .prompt("You are terse.", "Say hi", &GenerationOptions::default())
//!     .await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// Configuration for LLM generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-3.5-turbo", "llama3.2")
    pub model: String,

    /// Temperature for sampling; `None` leaves the backend default in place
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default)]
    pub top_p: Option<f32>,
}

const fn default_max_tokens() -> u32 {
    256
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            temperature: None,
            max_tokens: default_max_tokens(),
            top_p: None,
        }
    }
}

impl GenerationOptions {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "OpenAI", "Ollama")
    pub name: String,

    /// Endpoint the provider talks to
    pub endpoint: String,

    /// Whether an API key is configured (always true for keyless backends)
    pub authenticated: bool,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The orchestrator works exclusively through this interface, and treats
/// every failure the same way regardless of which variant comes back.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider information
    fn info(&self) -> ProviderInfo;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// Single system + user exchange, returning only the generated text
    async fn prompt(
        &self,
        system: &str,
        user: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let messages = Message::exchange(system, user);
        let completion = self.complete(&messages, options).await?;
        tracing::debug!(model = %completion.model, chars = completion.content.len(), "Completion received");
        Ok(completion.content)
    }
}
