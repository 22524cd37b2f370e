//! Weather Assistant CLI
//!
//! Spawns the weather Tool Host, opens a session over its stdio and runs
//! the interactive turn loop.

use std::process::ExitCode;

use tracing::{error, info, warn};

use agent_core::{Session, protocol::Implementation};
use agent_runtime::logging::init_tracing;
use agent_runtime::{RotatingFileSink, StdioChannel};
use weather_assistant::{AssistantConfig, FAREWELL, Orchestrator, StdConsole, error_line};

const CLIENT_NAME: &str = "GenericAssistant";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment, then the parent directory's file if run from a crate dir
    dotenvy::dotenv().ok();
    dotenvy::from_filename("../.env").ok();

    // Nothing is logged yet, so a bad config only reaches the console
    let config = match AssistantConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", error_line(&e));
            println!("{FAREWELL}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let sink = RotatingFileSink::open(&config.log)?;
    init_tracing(&sink, config.log.console, "info")?;
    info!(path = %sink.current_path().display(), "Weather assistant starting");

    let status = match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Error in assistant");
            eprintln!("{}", error_line(&e));
            ExitCode::FAILURE
        }
    };

    println!("{FAREWELL}");
    info!("Weather assistant terminated");
    sink.close()?;
    Ok(status)
}

async fn run(config: &AssistantConfig) -> agent_core::Result<()> {
    let llm = config.build_provider()?;
    let provider = llm.info();
    match llm.health_check().await {
        Ok(true) => info!(provider = %provider.name, endpoint = %provider.endpoint, model = %config.model, "LLM backend ready"),
        Ok(false) => warn!(provider = %provider.name, authenticated = provider.authenticated, "LLM backend not ready; calls may fail"),
        Err(e) => warn!(provider = %provider.name, error = %e, "LLM backend health check failed"),
    }

    let client = Implementation {
        name: CLIENT_NAME.into(),
        version: env!("CARGO_PKG_VERSION").into(),
    };
    let channel = StdioChannel::spawn(&config.server_command, &config.server_args, client).await?;
    let session = Session::open(Box::new(channel)).await?;

    let mut orchestrator = Orchestrator::new(
        llm,
        session,
        config.model.clone(),
        config.known_cities.clone(),
    );
    let mut console = StdConsole::new();
    orchestrator.announce(&mut console);
    orchestrator.run(&mut console).await
}
