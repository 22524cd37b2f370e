//! Intent Classification
//!
//! One LLM call decides whether a query is a weather request (and for
//! which city) or a general question. Anything other than one of the two
//! expected JSON shapes degrades to a general question.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use agent_core::{GenerationOptions, LlmProvider};

const SYSTEM_PROMPT: &str =
    "You are a query intent analyzer. You extract information from user queries and format it as JSON.";

const MAX_TOKENS: u32 = 100;

/// Outcome of classifying one query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntentClassification {
    Weather { city: String },
    General { text: String },
}

impl IntentClassification {
    pub fn general(text: impl Into<String>) -> Self {
        Self::General { text: text.into() }
    }
}

/// The two shapes the model is allowed to answer with
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum IntentReply {
    Weather { city: String },
    /// The echoed `query` field is ignored
    General {},
}

fn analysis_prompt(query: &str) -> String {
    format!(
        r#"Analyze the following user query to determine its intent and extract relevant information.

User Query: "{query}"

If this is a weather-related query:
1. Extract the city name
2. Respond in JSON format: {{"type": "weather", "city": "CITY_NAME"}}

If this is NOT a weather-related query:
1. Respond in JSON format: {{"type": "general", "query": "USER_QUERY"}}

Only respond with valid JSON. Do not include any explanation."#
    )
}

/// Turn the model's reply into a classification of `query`
pub fn parse_reply(query: &str, reply: &str) -> IntentClassification {
    match serde_json::from_str::<IntentReply>(reply.trim()) {
        Ok(IntentReply::Weather { city }) if !city.trim().is_empty() => IntentClassification::Weather {
            city: city.trim().to_string(),
        },
        Ok(IntentReply::Weather { .. }) => {
            debug!("Weather intent without a city; answering as a general query");
            IntentClassification::general(query)
        }
        Ok(IntentReply::General {}) => IntentClassification::general(query),
        Err(e) => {
            warn!(error = %e, response = reply, "Error parsing intent response; using generic processing");
            IntentClassification::general(query)
        }
    }
}

/// LLM-backed intent classifier
pub struct IntentClassifier {
    llm: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            options: GenerationOptions::for_model(model).with_max_tokens(MAX_TOKENS),
        }
    }

    /// Never fails: any problem yields `General` with the original query
    pub async fn classify(&self, query: &str) -> IntentClassification {
        match self.llm.prompt(SYSTEM_PROMPT, &analysis_prompt(query), &self.options).await {
            Ok(reply) => {
                debug!(response = %reply, "Received intent analysis");
                parse_reply(query, &reply)
            }
            Err(e) => {
                warn!(error = %e, "Intent analysis call failed; using generic processing");
                IntentClassification::general(query)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::mock::MockProvider;

    #[test]
    fn test_parse_weather() {
        assert_eq!(
            parse_reply("weather in paris?", r#" {"type": "weather", "city": "Paris"} "#),
            IntentClassification::Weather { city: "Paris".into() }
        );
    }

    #[test]
    fn test_general_keeps_original_text() {
        assert_eq!(
            parse_reply("Tell me a joke", r#"{"type":"general","query":"a joke please"}"#),
            IntentClassification::general("Tell me a joke")
        );
    }

    #[test]
    fn test_malformed_replies_degrade() {
        let query = "What's up?";
        for reply in [
            "Sure! Here's the JSON you asked for.",
            "",
            r#"{"type":"forecast","city":"Paris"}"#,
            r#"{"city":"Paris"}"#,
            r#"{"type":"weather"}"#,
            r#"{"type":"weather","city":"   "}"#,
            "```json\n{\"type\":\"weather\",\"city\":\"Paris\"}\n```",
        ] {
            assert_eq!(parse_reply(query, reply), IntentClassification::general(query), "{reply}");
        }
    }

    #[tokio::test]
    async fn test_classify_uses_one_call() {
        let llm = Arc::new(MockProvider::with_replies([r#"{"type":"weather","city":"Tokyo"}"#]));
        let classifier = IntentClassifier::new(llm.clone(), "test-model");

        let intent = classifier.classify("Is it raining in Tokyo?").await;
        assert_eq!(intent, IntentClassification::Weather { city: "Tokyo".into() });

        let calls = llm.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].options.max_tokens, 100);
        assert_eq!(calls[0].options.model, "test-model");
        assert!(calls[0].user.contains("Is it raining in Tokyo?"));
    }

    #[tokio::test]
    async fn test_call_failure_degrades() {
        let llm = Arc::new(MockProvider::new());
        llm.queue_failure("offline");
        let classifier = IntentClassifier::new(llm, "m");

        assert_eq!(classifier.classify("hi").await, IntentClassification::general("hi"));
    }
}
