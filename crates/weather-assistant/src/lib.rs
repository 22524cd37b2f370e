//! # weather-assistant
//!
//! The Orchestrator side of the assistant: one user turn at a time, a query
//! is classified by the LLM, weather requests get their city verified and
//! are sent to the Tool Host over the session, and the raw tool text is
//! turned into a reply.
//!
//! ```text
//! query ──► classify ──► general ──────────────────────────► answer
//!               │
//!               └──► weather ──► verify city ──► get_weather ──► render
//! ```

pub mod config;
pub mod console;
pub mod intent;
pub mod orchestrator;
pub mod synth;
pub mod verify;

pub use config::{AssistantConfig, KnownCities, LlmBackend};
pub use console::{Console, ScriptedConsole, StdConsole};
pub use intent::{IntentClassification, IntentClassifier};
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use synth::ResponseSynthesizer;
pub use verify::{CityCandidate, CityVerifier};

/// Tool the weather path calls
pub const WEATHER_TOOL: &str = "get_weather";

/// Printed on the way out, whatever the outcome
pub const FAREWELL: &str = "Thank you for using the assistant. Goodbye!";

/// Stderr line for a run that stopped on an error
pub fn error_line(err: &agent_core::AgentError) -> String {
    format!("Error: {}", err.user_message())
}
