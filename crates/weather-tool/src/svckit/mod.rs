//! Service Kit - Host Tools
//!
//! Tools that implement `agent_core::Tool` for the weather host.

mod get_weather;

pub use get_weather::GetWeatherTool;
