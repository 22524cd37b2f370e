//! Response Synthesis
//!
//! Turns a weather tool result into the reply shown to the user, and
//! answers general questions. Every path produces some text.

use std::sync::Arc;

use tracing::{debug, warn};

use agent_core::{GenerationOptions, LlmProvider, ToolResult};

const WEATHER_SYSTEM: &str =
    "You are a helpful weather assistant. Format the weather information in a natural, conversational way.";
const APOLOGY_SYSTEM: &str =
    "You are a helpful weather assistant. The user's weather request couldn't be fulfilled.";
const GENERAL_SYSTEM: &str =
    "You are a helpful assistant. Provide informative and accurate responses to user queries.";

pub const APOLOGY_FALLBACK: &str = "I couldn't retrieve the weather information for that location.";
pub const GENERAL_FALLBACK: &str = "I couldn't generate a response for that query.";

const WEATHER_MAX_TOKENS: u32 = 150;
const GENERAL_MAX_TOKENS: u32 = 300;

/// Tool text that has to be explained rather than rendered
pub fn is_failure(result: &ToolResult) -> bool {
    result.is_error() || result.output.to_lowercase().contains("error")
}

/// LLM-backed reply writer
pub struct ResponseSynthesizer {
    llm: Arc<dyn LlmProvider>,
    weather: GenerationOptions,
    general: GenerationOptions,
}

impl ResponseSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        let base = GenerationOptions::for_model(model);
        Self {
            llm,
            weather: base.clone().with_max_tokens(WEATHER_MAX_TOKENS),
            general: base.with_max_tokens(GENERAL_MAX_TOKENS),
        }
    }

    /// Reply for a `get_weather` result
    pub async fn render(&self, city: &str, result: &ToolResult) -> String {
        if is_failure(result) {
            warn!(city, error = %result.output, "Weather tool returned an error");
            return self.apologize(city, &result.output).await;
        }

        let user = format!(
            "Create a friendly response about the weather in {city} with this data: {}",
            result.output
        );
        self.ask(WEATHER_SYSTEM, &user, &self.weather)
            .await
            .unwrap_or_else(|| format!("Weather in {city}: {}", result.output))
    }

    /// The raw error only goes to the model, never straight to the user
    async fn apologize(&self, city: &str, error: &str) -> String {
        let user = format!(
            "I tried to get the weather for \"{city}\" but received this error: \"{error}\". Please provide a helpful and friendly response."
        );
        self.ask(APOLOGY_SYSTEM, &user, &self.weather)
            .await
            .unwrap_or_else(|| APOLOGY_FALLBACK.to_string())
    }

    /// Single-call answer for a non-weather query
    pub async fn answer(&self, query: &str) -> String {
        self.ask(GENERAL_SYSTEM, query, &self.general)
            .await
            .unwrap_or_else(|| GENERAL_FALLBACK.to_string())
    }

    /// Non-empty model output, or `None` on failure
    async fn ask(&self, system: &str, user: &str, options: &GenerationOptions) -> Option<String> {
        match self.llm.prompt(system, user, options).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(chars = text.len(), "Generated response");
                Some(text.trim().to_string())
            }
            Ok(_) => {
                warn!("Model returned an empty response");
                None
            }
            Err(e) => {
                warn!(error = %e, "Response generation failed");
                None
            }
        }
    }
}
