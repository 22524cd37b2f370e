//! Turn Loop
//!
//! The `Orchestrator` owns the session and runs one turn at a time:
//! classify, then either answer directly or verify the city, call the
//! weather tool and synthesize the reply. No failure inside a turn ends
//! the loop.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, warn};

use agent_core::{AgentError, LlmProvider, Result, Session};

use crate::WEATHER_TOOL;
use crate::config::KnownCities;
use crate::console::Console;
use crate::intent::{IntentClassification, IntentClassifier};
use crate::synth::ResponseSynthesizer;
use crate::verify::CityVerifier;

const INPUT_PROMPT: &str = "\nHow can I help you? ";

/// What a single turn ended with
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Answered without the tool
    General,

    /// Tool called, reply rendered (including error-flagged results)
    Weather { city: String, tool_error: bool },

    /// The tool's content list could not be read
    MalformedResult { city: String },

    /// The call never produced a result
    ChannelFailure { city: String },
}

/// Conversation driver
pub struct Orchestrator {
    session: Session,
    classifier: IntentClassifier,
    verifier: CityVerifier,
    synthesizer: ResponseSynthesizer,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        session: Session,
        model: impl Into<String>,
        known_cities: KnownCities,
    ) -> Self {
        let model = model.into();
        Self {
            session,
            classifier: IntentClassifier::new(llm.clone(), model.clone()),
            verifier: CityVerifier::new(llm.clone(), model.clone(), known_cities),
            synthesizer: ResponseSynthesizer::new(llm, model),
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Print the tool catalog and the banner
    pub fn announce(&self, console: &mut dyn Console) {
        console.say(&format!("Available tools: {:?}", self.session.tool_names()));
        if !self.session.has_tool(WEATHER_TOOL) {
            warn!(tool = WEATHER_TOOL, "Tool host does not advertise the weather tool");
        }
        console.say("\nGeneric AI Assistant (with Weather capabilities)");
        console.say("Type 'exit' to quit the program\n");
    }

    /// Read and handle turns until `exit` or end of input, then close the session
    pub async fn run(&mut self, console: &mut dyn Console) -> Result<()> {
        let outcome = self.read_loop(console).await;
        let closed = self.shutdown().await;
        outcome.and(closed)
    }

    async fn read_loop(&mut self, console: &mut dyn Console) -> Result<()> {
        loop {
            let Some(line) = console.read_line(INPUT_PROMPT).await? else {
                info!("End of input");
                return Ok(());
            };

            let query = line.trim();
            if query.eq_ignore_ascii_case("exit") {
                info!("User requested exit");
                return Ok(());
            }
            if query.is_empty() {
                continue;
            }

            self.handle_turn(query, console).await;
        }
    }

    /// Process one query end to end
    pub async fn handle_turn(&self, query: &str, console: &mut dyn Console) -> TurnOutcome {
        info!(query, "Processing user query");
        console.say("Processing your query...");

        match self.classifier.classify(query).await {
            IntentClassification::Weather { city } => {
                info!(city = %city, "Query classified as weather query");
                self.weather_turn(&city, console).await
            }
            IntentClassification::General { text } => {
                info!("Query classified as general query");
                let reply = self.synthesizer.answer(&text).await;
                console.say(&format!("\n{reply}"));
                TurnOutcome::General
            }
        }
    }

    async fn weather_turn(&self, city: &str, console: &mut dyn Console) -> TurnOutcome {
        let candidate = self.verifier.verify(city, console).await;
        if candidate.is_corrected() {
            console.say(&format!("Using corrected city name: {}", candidate.chosen()));
        }
        let city = candidate.chosen().to_string();

        console.say(&format!("Fetching weather for: {city}"));
        let started = Instant::now();
        let arguments = [("city".to_string(), Value::String(city.clone()))];

        match self.session.call_tool(WEATHER_TOOL, arguments).await {
            Ok(result) => {
                info!(
                    tool = WEATHER_TOOL,
                    city = %city,
                    duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    is_error = result.is_error(),
                    "Tool call completed"
                );
                let tool_error = crate::synth::is_failure(&result);
                let reply = self.synthesizer.render(&city, &result).await;
                console.say(&format!("\n{reply}"));
                TurnOutcome::Weather { city, tool_error }
            }
            Err(AgentError::MalformedResponse(detail)) => {
                error!(city = %city, detail = %detail, "Unexpected result format from weather tool");
                console.say("\nError: Unexpected result format from weather tool");
                TurnOutcome::MalformedResult { city }
            }
            Err(e) => {
                error!(city = %city, error = %e, "Error retrieving weather");
                console.say(&format!("Error retrieving weather: {e}"));
                TurnOutcome::ChannelFailure { city }
            }
        }
    }

    /// Close the session; later calls are no-ops
    pub async fn shutdown(&mut self) -> Result<()> {
        self.session.close().await
    }
}
