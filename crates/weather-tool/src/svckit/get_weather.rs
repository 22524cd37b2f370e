//! Weather Lookup Tool
//!
//! Fetches current conditions for a city from the configured provider.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};

use crate::error::WeatherError;
use crate::provider::WeatherProvider;

pub const TOOL_NAME: &str = "get_weather";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Tool for looking up current weather
pub struct GetWeatherTool {
    provider: Arc<dyn WeatherProvider>,
    timeout: Duration,
}

impl GetWeatherTool {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound on a single provider lookup
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn error_text(err: &WeatherError) -> String {
        format!("Error fetching weather: {err}")
    }
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: TOOL_NAME.into(),
            description: "Get current weather for a city".into(),
            parameters: vec![ParameterSchema::required_string(
                "city",
                "City name, e.g. 'Paris' or 'New York'",
            )],
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let city = call.str_arg("city").unwrap_or_default().trim();
        if city.is_empty() {
            return Ok(ToolResult::failure(TOOL_NAME, "Error fetching weather: city is empty"));
        }

        let lookup = tokio::time::timeout(self.timeout, self.provider.current(city)).await;
        let outcome = match lookup {
            Ok(result) => result,
            Err(_) => {
                return Ok(ToolResult::failure(
                    TOOL_NAME,
                    format!(
                        "Error fetching weather: request timed out after {}ms",
                        self.timeout.as_millis()
                    ),
                ));
            }
        };

        match outcome {
            Ok(report) => {
                info!(city = %report.city, provider = self.provider.name(), "Weather fetched");
                Ok(ToolResult::success(TOOL_NAME, report.to_tool_text()))
            }
            Err(e) => {
                warn!(city, error = %e, "Weather lookup failed");
                Ok(ToolResult::failure(TOOL_NAME, Self::error_text(&e)))
            }
        }
    }
}
