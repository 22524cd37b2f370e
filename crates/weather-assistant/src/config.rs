//! Assistant Configuration
//!
//! Everything is read once at startup from the process environment
//! (after `.env` loading in the binary).

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use agent_core::{AgentError, LlmProvider, Result};
use agent_runtime::{LogConfig, OllamaConfig, OllamaProvider, OpenAiConfig, OpenAiProvider};

/// City names that skip spelling verification
const BUILTIN_CITIES: &[&str] = &[
    "bengaluru",
    "bangalore",
    "mumbai",
    "delhi",
    "hyderabad",
    "chennai",
    "kolkata",
    "pune",
    "ahmedabad",
    "jaipur",
    "surat",
    "lucknow",
];

/// Allow-list of well-known city names, compared case-insensitively
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownCities(BTreeSet<String>);

impl Default for KnownCities {
    fn default() -> Self {
        Self::from_names(BUILTIN_CITIES.iter().copied())
    }
}

impl KnownCities {
    /// An empty list
    pub const fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cities = Self::empty();
        cities.extend(names);
        cities
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.0.extend(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty()),
        );
    }

    pub fn contains(&self, city: &str) -> bool {
        self.0.contains(&city.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which completion backend answers the LLM calls
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmBackend {
    #[default]
    OpenAi,
    Ollama,
}

impl std::str::FromStr for LlmBackend {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(AgentError::Config(format!("unknown LLM_PROVIDER '{other}'"))),
        }
    }
}

/// Orchestrator settings
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub backend: LlmBackend,

    /// Model used for every LLM call
    pub model: String,

    pub openai: OpenAiConfig,

    pub ollama: OllamaConfig,

    /// Tool Host executable
    pub server_command: String,

    pub server_args: Vec<String>,

    pub known_cities: KnownCities,

    pub log: LogConfig,
}

impl AssistantConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = lookup("LLM_PROVIDER")
            .filter(|v| !v.trim().is_empty())
            .map_or(Ok(LlmBackend::default()), |v| v.parse())?;

        let model = lookup("LLM_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| match backend {
                LlmBackend::OpenAi => agent_runtime::openai::DEFAULT_MODEL.into(),
                LlmBackend::Ollama => agent_runtime::ollama::DEFAULT_MODEL.into(),
            });

        let openai = OpenAiConfig::from_lookup(&lookup);
        let ollama = OllamaConfig::from_lookup(&lookup);

        let server_command = lookup("WEATHER_SERVER_CMD")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(default_server_command);
        let server_args = lookup("WEATHER_SERVER_ARGS")
            .map(|a| a.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        let mut known_cities = KnownCities::default();
        if let Some(extra) = lookup("KNOWN_CITIES") {
            known_cities.extend(extra.split(','));
        }

        let log_defaults = LogConfig::default();
        let log = LogConfig {
            dir: lookup("LOG_DIR").map_or(log_defaults.dir, PathBuf::from),
            prefix: lookup("LOG_PREFIX").unwrap_or(log_defaults.prefix),
            max_bytes: parse_or("LOG_MAX_BYTES", lookup("LOG_MAX_BYTES"), log_defaults.max_bytes)?,
            console: lookup("LOG_CONSOLE").is_some_and(|v| is_truthy(&v)),
        };

        Ok(Self {
            backend,
            model,
            openai,
            ollama,
            server_command,
            server_args,
            known_cities,
            log,
        })
    }

    /// Construct the configured completion backend
    pub fn build_provider(&self) -> Result<Arc<dyn LlmProvider>> {
        Ok(match self.backend {
            LlmBackend::OpenAi => Arc::new(OpenAiProvider::from_config(self.openai.clone())?),
            LlmBackend::Ollama => Arc::new(OllamaProvider::from_config(self.ollama.clone())),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("{key} has an invalid value '{v}'"))),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// `weather-server` next to the running executable, or on `PATH`
fn default_server_command() -> String {
    let name = format!("weather-server{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .filter(|path| path.exists())
        .map_or(name, |path| path.to_string_lossy().into_owned())
}
