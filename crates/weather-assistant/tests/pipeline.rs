//! End-to-end turns through the orchestrator, against a scripted channel
//! and against the real tool server running in-process.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agent_core::mock::MockProvider;
use agent_core::protocol::{Implementation, ToolDescriptor};
use agent_core::tool::ParameterSchema;
use agent_core::{AgentError, Result, Session, ToolCall, ToolChannel, ToolRegistry, ToolResult, ToolSchema};
use agent_runtime::{InProcessChannel, ToolServer};
use weather_assistant::{KnownCities, Orchestrator, ScriptedConsole, TurnOutcome};
use weather_tool::MockWeatherProvider;
use weather_tool::tools::GetWeatherTool;

const PARIS_TEXT: &str = "Temperature: 18.5°C, Conditions: light rain, Humidity: 72%";

enum Scripted {
    Result(ToolResult),
    Malformed,
    Down,
}

#[derive(Clone, Default)]
struct ChannelLog {
    calls: Arc<Mutex<Vec<ToolCall>>>,
    closes: Arc<AtomicUsize>,
}

impl ChannelLog {
    fn cities(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.str_arg("city").unwrap_or_default().to_string())
            .collect()
    }

    fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct FakeChannel {
    log: ChannelLog,
    replies: Mutex<VecDeque<Scripted>>,
}

impl FakeChannel {
    fn new(replies: impl IntoIterator<Item = Scripted>) -> (Self, ChannelLog) {
        let log = ChannelLog::default();
        let channel = Self {
            log: log.clone(),
            replies: Mutex::new(replies.into_iter().collect()),
        };
        (channel, log)
    }
}

#[async_trait]
impl ToolChannel for FakeChannel {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let schema = ToolSchema {
            name: "get_weather".into(),
            description: "Get current weather for a city".into(),
            parameters: vec![ParameterSchema::required_string("city", "City name")],
        };
        Ok(vec![ToolDescriptor::from(&schema)])
    }

    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult> {
        self.log.calls.lock().unwrap().push(call.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Scripted::Result(result)) => Ok(result),
            Some(Scripted::Malformed) => Err(AgentError::MalformedResponse("content: []".into())),
            Some(Scripted::Down) | None => Err(AgentError::Channel("tool host exited".into())),
        }
    }

    async fn close(&self) -> Result<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn fake_orchestrator(
    llm: &Arc<MockProvider>,
    replies: impl IntoIterator<Item = Scripted>,
) -> (Orchestrator, ChannelLog) {
    let (channel, log) = FakeChannel::new(replies);
    let session = Session::open(Box::new(channel)).await.unwrap();
    let orchestrator = Orchestrator::new(llm.clone(), session, "test-model", KnownCities::default());
    (orchestrator, log)
}

async fn served_orchestrator(llm: &Arc<MockProvider>, provider: MockWeatherProvider) -> Orchestrator {
    let mut registry = ToolRegistry::new();
    registry.register(GetWeatherTool::new(Arc::new(provider)));
    let server = Arc::new(ToolServer::new("WeatherServer", "1.0.0", Arc::new(registry)));

    let channel = InProcessChannel::in_process(server);
    channel
        .initialize(Implementation {
            name: "GenericAssistant".into(),
            version: "1.0.0".into(),
        })
        .await
        .unwrap();
    let session = Session::open(Box::new(channel)).await.unwrap();
    Orchestrator::new(llm.clone(), session, "test-model", KnownCities::default())
}

fn weather_ok(text: &str) -> Scripted {
    Scripted::Result(ToolResult::success("get_weather", text))
}

#[tokio::test]
async fn paris_query_renders_friendly_reply() {
    let llm = Arc::new(MockProvider::with_replies([
        r#"{"type": "weather", "city": "Paris"}"#,
        "Paris",
        "It's a mild 18.5°C in Paris with light rain.",
    ]));
    let mut orchestrator = served_orchestrator(&llm, MockWeatherProvider::new()).await;
    let mut console = ScriptedConsole::new(["What's the weather in Paris?"]);

    orchestrator.run(&mut console).await.unwrap();

    let transcript = console.transcript();
    assert!(transcript.contains("Processing your query..."));
    assert!(transcript.contains("Fetching weather for: Paris"));
    assert_eq!(
        console.output().last().map(String::as_str),
        Some("\nIt's a mild 18.5°C in Paris with light rain.")
    );

    let calls = llm.recorded_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[1].user.contains("\"Paris\""));
    assert!(calls[2].user.contains(PARIS_TEXT));
    assert!(!orchestrator.session().is_active());
}

#[tokio::test]
async fn misspelled_city_uses_confirmed_correction() {
    let llm = Arc::new(MockProvider::with_replies([
        r#"{"type":"weather","city":"Lndon"}"#,
        "London",
        "London is cloudy and cool.",
    ]));
    let (mut orchestrator, log) =
        fake_orchestrator(&llm, [weather_ok("Temperature: 14°C, Conditions: overcast clouds, Humidity: 81%")]).await;
    let mut console = ScriptedConsole::new(["Lndon weather", "yes"]);

    orchestrator.run(&mut console).await.unwrap();

    assert_eq!(log.cities(), vec!["London"]);
    assert!(console.prompts().contains(&"Did you mean \"London\"? (yes/no): ".to_string()));
    assert!(console.transcript().contains("Using corrected city name: London"));
}

#[tokio::test]
async fn provider_failure_is_explained_not_echoed() {
    let raw = "connection reset by peer";
    let llm = Arc::new(MockProvider::with_replies([
        r#"{"type":"weather","city":"Paris"}"#,
        "Paris",
        "Sorry, the weather service isn't answering right now. Please try again shortly.",
    ]));
    let orchestrator = served_orchestrator(&llm, MockWeatherProvider::failing(raw)).await;
    let mut console = ScriptedConsole::default();

    let outcome = orchestrator.handle_turn("Weather in Paris?", &mut console).await;

    assert_eq!(
        outcome,
        TurnOutcome::Weather {
            city: "Paris".into(),
            tool_error: true
        }
    );
    let calls = llm.recorded_calls();
    assert!(calls[2].user.contains(raw));
    assert!(!console.transcript().contains(raw));
    assert_eq!(
        console.output().last().map(String::as_str),
        Some("\nSorry, the weather service isn't answering right now. Please try again shortly.")
    );
}

#[tokio::test]
async fn exit_closes_channel_once_without_calls() {
    let llm = Arc::new(MockProvider::new());
    let (mut orchestrator, log) = fake_orchestrator(&llm, []).await;
    let mut console = ScriptedConsole::new(["EXIT", "What's the weather in Paris?"]);

    orchestrator.run(&mut console).await.unwrap();
    orchestrator.shutdown().await.unwrap();

    assert_eq!(llm.call_count(), 0);
    assert!(log.cities().is_empty());
    assert_eq!(log.close_count(), 1);
    assert_eq!(console.remaining(), 1);
}

#[tokio::test]
async fn end_of_input_closes_session() {
    let llm = Arc::new(MockProvider::new());
    let (mut orchestrator, log) = fake_orchestrator(&llm, []).await;
    let mut console = ScriptedConsole::default();

    orchestrator.run(&mut console).await.unwrap();

    assert_eq!(log.close_count(), 1);
    assert!(!orchestrator.session().is_active());
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let llm = Arc::new(MockProvider::new());
    let (mut orchestrator, _log) = fake_orchestrator(&llm, []).await;
    let mut console = ScriptedConsole::new(["", "   ", "exit"]);

    orchestrator.run(&mut console).await.unwrap();

    assert_eq!(llm.call_count(), 0);
    assert_eq!(console.prompts().len(), 3);
    assert!(console.output().is_empty());
}

#[tokio::test]
async fn unparsable_classification_answers_original_query() {
    let llm = Arc::new(MockProvider::with_replies([
        "I think this is about history.",
        "The Battle of Hastings was in 1066.",
    ]));
    let (orchestrator, log) = fake_orchestrator(&llm, []).await;
    let mut console = ScriptedConsole::default();

    let outcome = orchestrator
        .handle_turn("When was the Battle of Hastings?", &mut console)
        .await;

    assert_eq!(outcome, TurnOutcome::General);
    assert!(log.cities().is_empty());
    assert_eq!(llm.recorded_calls()[1].user, "When was the Battle of Hastings?");
    assert!(console.transcript().contains("1066"));
}

#[tokio::test]
async fn declined_correction_keeps_original_city() {
    let llm = Arc::new(MockProvider::with_replies([
        r#"{"type":"weather","city":"Lndon"}"#,
        "London",
        "Here is the weather.",
    ]));
    let (orchestrator, log) = fake_orchestrator(&llm, [weather_ok(PARIS_TEXT)]).await;
    let mut console = ScriptedConsole::new(["nope"]);

    orchestrator.handle_turn("Lndon weather", &mut console).await;

    assert_eq!(log.cities(), vec!["Lndon"]);
    assert!(!console.transcript().contains("Using corrected city name"));
}

#[tokio::test]
async fn known_city_skips_verification() {
    let llm = Arc::new(MockProvider::with_replies([
        r#"{"type":"weather","city":"Bangalore"}"#,
        "Pleasant in Bangalore.",
    ]));
    let (orchestrator, log) = fake_orchestrator(&llm, [weather_ok(PARIS_TEXT)]).await;
    let mut console = ScriptedConsole::default();

    orchestrator.handle_turn("Bangalore weather today", &mut console).await;

    assert_eq!(llm.call_count(), 2);
    assert_eq!(log.cities(), vec!["Bangalore"]);
    assert!(console.prompts().is_empty());
}

#[tokio::test]
async fn malformed_result_is_reported_without_synthesis() {
    let llm = Arc::new(MockProvider::with_replies([
        r#"{"type":"weather","city":"New York"}"#,
    ]));
    let (orchestrator, _log) = fake_orchestrator(&llm, [Scripted::Malformed]).await;
    let mut console = ScriptedConsole::default();

    let outcome = orchestrator.handle_turn("weather in new york", &mut console).await;

    assert_eq!(outcome, TurnOutcome::MalformedResult { city: "New York".into() });
    assert_eq!(llm.call_count(), 1);
    assert!(console
        .transcript()
        .contains("Error: Unexpected result format from weather tool"));
}

#[tokio::test]
async fn channel_failure_does_not_end_session() {
    let llm = Arc::new(MockProvider::with_replies([
        r#"{"type":"weather","city":"New York"}"#,
        r#"{"type":"weather","city":"New York"}"#,
        "Sunny in New York.",
    ]));
    let (mut orchestrator, log) =
        fake_orchestrator(&llm, [Scripted::Down, weather_ok("Temperature: 20.1°C, Conditions: few clouds, Humidity: 60%")]).await;
    let mut console = ScriptedConsole::new(["weather in new york", "and again?"]);

    orchestrator.run(&mut console).await.unwrap();

    let transcript = console.transcript();
    assert!(transcript.contains("Error retrieving weather:"));
    assert!(transcript.contains("Sunny in New York."));
    assert_eq!(log.cities().len(), 2);
    assert_eq!(log.close_count(), 1);
}

#[tokio::test]
async fn announce_lists_tools_and_banner() {
    let llm = Arc::new(MockProvider::new());
    let (orchestrator, _log) = fake_orchestrator(&llm, []).await;
    let mut console = ScriptedConsole::default();

    orchestrator.announce(&mut console);

    let transcript = console.transcript();
    assert!(transcript.contains("Available tools: [\"get_weather\"]"));
    assert!(transcript.contains("Generic AI Assistant (with Weather capabilities)"));
    assert!(transcript.contains("Type 'exit' to quit the program"));
}
