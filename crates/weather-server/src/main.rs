//! Weather Tool Host
//!
//! Serves the `get_weather` tool to a single client over stdin/stdout.
//! Stdout carries protocol frames only; diagnostics go to stderr.

use std::sync::Arc;

use agent_core::ToolRegistry;
use agent_runtime::ToolServer;
use agent_runtime::logging::init_stderr_tracing;
use weather_tool::{MockWeatherProvider, OpenWeatherClient, WeatherProvider, tools::GetWeatherTool};

const SERVER_NAME: &str = "WeatherServer";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment, then the parent directory's file if run from a crate dir
    dotenvy::dotenv().ok();
    dotenvy::from_filename("../.env").ok();

    init_stderr_tracing("warn")?;

    let provider: Arc<dyn WeatherProvider> = if mock_requested() {
        tracing::warn!("OPEN_WEATHER_MOCK set - serving static readings");
        Arc::new(MockWeatherProvider::new())
    } else {
        let client = OpenWeatherClient::from_env()?;
        if !client.has_api_key() {
            tracing::warn!("OPEN_WEATHER_API_KEY not set - lookups will report an error");
        }
        Arc::new(client)
    };

    let mut tools = ToolRegistry::new();
    tools.register(GetWeatherTool::new(provider));

    let server = ToolServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), Arc::new(tools));
    tracing::info!(name = SERVER_NAME, "Weather server running on stdio");

    server.serve_stdio().await?;
    Ok(())
}

fn mock_requested() -> bool {
    std::env::var("OPEN_WEATHER_MOCK")
        .is_ok_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}
