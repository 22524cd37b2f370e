//! City Name Verification
//!
//! Single-word names outside the allow-list are checked by the LLM for
//! misspellings. A suggested correction is only used after the user
//! confirms it; otherwise the original name goes to the tool unchanged.

use std::sync::Arc;

use tracing::{debug, info, warn};

use agent_core::{GenerationOptions, LlmProvider};

use crate::config::KnownCities;
use crate::console::Console;

const SYSTEM_PROMPT: &str = "You are a geography expert who verifies city names. For Indian cities like Bengaluru, Mumbai, etc., never suggest corrections unless there's a clear spelling error.";

const MAX_TOKENS: u32 = 50;
const TEMPERATURE: f32 = 0.3;

/// A city name and the correction, if any, the user accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CityCandidate {
    pub original: String,

    /// `None` when no correction was offered
    pub suggested: Option<String>,

    /// Only meaningful with a suggestion: the user said yes
    pub accepted: bool,
}

impl CityCandidate {
    pub fn unchanged(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            suggested: None,
            accepted: false,
        }
    }

    /// The name to send to the tool
    pub fn chosen(&self) -> &str {
        match &self.suggested {
            Some(suggested) if self.accepted => suggested,
            _ => &self.original,
        }
    }

    pub const fn is_corrected(&self) -> bool {
        self.accepted && self.suggested.is_some()
    }
}

/// True when `suggestion` is not a real correction of `city`.
///
/// Case-insensitive equality or either name containing the other.
pub fn is_same_city(city: &str, suggestion: &str) -> bool {
    let city = city.to_lowercase();
    let suggestion = suggestion.to_lowercase();
    city == suggestion || city.contains(&suggestion) || suggestion.contains(&city)
}

fn verification_prompt(city: &str) -> String {
    format!(
        r#"Is "{city}" a valid city name? If it's clearly misspelled (like "Lndon" for "London"), provide the correct spelling. If it's a valid city name or a valid alternative spelling (like "Bengaluru" or "Bangalore"), just respond with the original name. Only respond with a city name."#
    )
}

/// LLM-backed spelling check with user confirmation
pub struct CityVerifier {
    llm: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    known: KnownCities,
}

impl CityVerifier {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, known: KnownCities) -> Self {
        Self {
            llm,
            options: GenerationOptions::for_model(model)
                .with_max_tokens(MAX_TOKENS)
                .with_temperature(TEMPERATURE),
            known,
        }
    }

    /// Multi-word and allow-listed names are taken as-is
    pub fn skips(&self, city: &str) -> bool {
        city.contains(char::is_whitespace) || self.known.contains(city)
    }

    /// Pick between `city` and a suggested spelling.
    ///
    /// Never rejects a city: every failure path keeps the original.
    pub async fn verify(&self, city: &str, console: &mut dyn Console) -> CityCandidate {
        if self.skips(city) {
            debug!(city, "Skipping city name verification");
            return CityCandidate::unchanged(city);
        }

        let suggestion = match self
            .llm
            .prompt(SYSTEM_PROMPT, &verification_prompt(city), &self.options)
            .await
        {
            Ok(reply) => reply.trim().to_string(),
            Err(e) => {
                warn!(city, error = %e, "City verification call failed; keeping original");
                return CityCandidate::unchanged(city);
            }
        };

        if is_same_city(city, &suggestion) {
            debug!(city, suggestion = %suggestion, "No city correction needed");
            return CityCandidate::unchanged(city);
        }

        let question = format!("Did you mean \"{suggestion}\"? (yes/no): ");
        let accepted = match console.read_line(&question).await {
            Ok(Some(answer)) => answer.eq_ignore_ascii_case("yes"),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read confirmation");
                false
            }
        };

        if accepted {
            info!(original = city, corrected = %suggestion, "User accepted city correction");
        } else {
            info!(city, "User rejected city correction");
        }

        CityCandidate {
            original: city.to_string(),
            suggested: Some(suggestion),
            accepted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use agent_core::mock::MockProvider;

    fn verifier(llm: &Arc<MockProvider>) -> CityVerifier {
        CityVerifier::new(llm.clone(), "m", KnownCities::default())
    }

    #[test]
    fn test_same_city_heuristic() {
        assert!(is_same_city("paris", "Paris"));
        assert!(is_same_city("Paris", "Paris, France"));
        assert!(is_same_city("Londons", "London"));
        assert!(!is_same_city("Lndon", "London"));
    }

    #[test]
    fn test_chosen() {
        let mut candidate = CityCandidate {
            original: "Lndon".into(),
            suggested: Some("London".into()),
            accepted: false,
        };
        assert_eq!(candidate.chosen(), "Lndon");
        candidate.accepted = true;
        assert_eq!(candidate.chosen(), "London");
        assert!(candidate.is_corrected());
    }

    #[tokio::test]
    async fn test_known_and_multi_word_skip_llm() {
        let llm = Arc::new(MockProvider::new());
        let verifier = verifier(&llm);
        let mut console = ScriptedConsole::default();

        for city in ["bangalore", "Mumbai", "LUCKNOW", "New York", "San Francisco", "Rio\tde Janeiro"] {
            let candidate = verifier.verify(city, &mut console).await;
            assert_eq!(candidate, CityCandidate::unchanged(city));
        }
        assert_eq!(llm.call_count(), 0);
        assert!(console.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_case_only_difference_is_not_a_correction() {
        let llm = Arc::new(MockProvider::with_replies(["PARIS\n"]));
        let mut console = ScriptedConsole::default();

        let candidate = verifier(&llm).verify("paris", &mut console).await;
        assert_eq!(candidate.suggested, None);
        assert!(console.prompts().is_empty());

        let call = &llm.recorded_calls()[0];
        assert_eq!(call.options.max_tokens, 50);
        assert_eq!(call.options.temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_accepted_correction() {
        let llm = Arc::new(MockProvider::with_replies(["London"]));
        let mut console = ScriptedConsole::new(["YES"]);

        let candidate = verifier(&llm).verify("Lndon", &mut console).await;
        assert_eq!(candidate.chosen(), "London");
        assert_eq!(console.prompts(), ["Did you mean \"London\"? (yes/no): "]);
    }

    #[tokio::test]
    async fn test_anything_but_yes_keeps_original() {
        for answer in ["no", "", "y", "yes please", " yes", "sure"] {
            let llm = Arc::new(MockProvider::with_replies(["London"]));
            let mut console = ScriptedConsole::new([answer]);

            let candidate = verifier(&llm).verify("Lndon", &mut console).await;
            assert_eq!(candidate.suggested.as_deref(), Some("London"));
            assert!(!candidate.accepted, "{answer:?}");
            assert_eq!(candidate.chosen(), "Lndon");
        }
    }

    #[tokio::test]
    async fn test_eof_on_confirmation_keeps_original() {
        let llm = Arc::new(MockProvider::with_replies(["London"]));
        let mut console = ScriptedConsole::default();

        let candidate = verifier(&llm).verify("Lndon", &mut console).await;
        assert_eq!(candidate.chosen(), "Lndon");
    }

    #[tokio::test]
    async fn test_llm_failure_keeps_original() {
        let llm = Arc::new(MockProvider::new());
        llm.queue_failure("timeout");
        let mut console = ScriptedConsole::default();

        let candidate = verifier(&llm).verify("Pariss", &mut console).await;
        assert_eq!(candidate, CityCandidate::unchanged("Pariss"));
    }
}
