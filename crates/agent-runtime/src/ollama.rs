//! Ollama LLM Provider
//!
//! `LlmProvider` backed by a local Ollama daemon. Keyless: `info()` always
//! reports the backend as authenticated.

use std::time::Instant;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, GenerationOptions, LlmProvider, ProviderInfo},
};
use async_trait::async_trait;
use ollama_rs::{
    generation::{
        chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
    },
    models::ModelOptions as OllamaOptions,
    Ollama,
};

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_HOST: &str = "http://localhost";
pub const DEFAULT_PORT: u16 = 11434;

/// Where the Ollama daemon listens
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Scheme and host, without the port
    pub host: String,

    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl OllamaConfig {
    /// `OLLAMA_HOST` / `OLLAMA_PORT` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable ports fall back to the default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("OLLAMA_HOST")
            .map(|h| h.trim().trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.into());
        let port = lookup("OLLAMA_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self { host, port }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ollama chat backend
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(&config.host, config.port),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    fn into_completion(response: ChatMessageResponse, model: &str) -> Completion {
        Completion {
            content: response.message.content,
            model: model.to_string(),
        }
    }

    /// Only the knobs the caller set are forwarded
    fn sampling(opts: &GenerationOptions) -> OllamaOptions {
        let mut sampling =
            OllamaOptions::default().num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX));
        if let Some(temperature) = opts.temperature {
            sampling = sampling.temperature(temperature);
        }
        if let Some(top_p) = opts.top_p {
            sampling = sampling.top_p(top_p);
        }
        sampling
    }

    /// Connection failures mean the daemon is down; anything else is a
    /// rejected request
    fn classify_error(&self, message: String) -> AgentError {
        let lower = message.to_lowercase();
        if lower.contains("connect") || lower.contains("connection refused") {
            AgentError::ProviderUnavailable(format!("{}: {message}", self.config.endpoint()))
        } else {
            AgentError::Provider(message)
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Ollama".into(),
            endpoint: self.config.endpoint(),
            authenticated: true,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(models) => {
                tracing::debug!(models = models.len(), "Ollama reachable");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.config.endpoint(), error = %e, "Ollama health check failed");
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = ChatMessageRequest::new(options.model.clone(), Self::to_chat_messages(messages))
            .options(Self::sampling(options));

        let started = Instant::now();
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| self.classify_error(e.to_string()))?;

        tracing::debug!(
            model = %options.model,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Ollama completion received"
        );
        Ok(Self::into_completion(response, &options.model))
    }
}
