//! # weather-tool
//!
//! The Tool Host's only capability: `get_weather(city)`.
//!
//! ```text
//! validate-config ──► call-provider ──► format
//!        │                  │
//!        └──────────────────┴──► error (isError: true)
//! ```
//!
//! Every invocation resolves to a `ToolResult`. Missing configuration and
//! provider failures are reported as error-flagged text, never as a failure
//! of the call itself.

pub mod error;
pub mod model;
pub mod provider;
pub mod svckit;

pub use error::{Result, WeatherError};
pub use model::WeatherReport;
pub use provider::{MockWeatherProvider, OpenWeatherClient, OpenWeatherConfig, WeatherProvider};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::GetWeatherTool;
}
