//! OpenWeatherMap Client
//!
//! Current-conditions lookup against the `/data/2.5/weather` endpoint,
//! metric units.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::WeatherProvider;
use crate::error::{Result, WeatherError};
use crate::model::WeatherReport;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// OpenWeatherMap configuration
#[derive(Clone, Debug)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 10,
        }
    }
}

impl OpenWeatherConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: lookup("OPEN_WEATHER_API_KEY").filter(|k| !k.trim().is_empty()),
            base_url: lookup("OPEN_WEATHER_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: lookup("OPEN_WEATHER_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    name: String,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// OpenWeatherMap API client
pub struct OpenWeatherClient {
    client: Client,
    config: OpenWeatherConfig,
}

impl OpenWeatherClient {
    pub fn new(config: OpenWeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenWeatherConfig::from_env())
    }

    pub const fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn parse(city: &str, body: CurrentWeather) -> Result<WeatherReport> {
        let conditions = body
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| WeatherError::Payload("missing weather conditions".into()))?;
        let name = if body.name.is_empty() {
            city.to_string()
        } else {
            body.name
        };
        Ok(WeatherReport::new(
            name,
            body.main.temp,
            conditions,
            body.main.humidity,
        ))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn current(&self, city: &str) -> Result<WeatherReport> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(WeatherError::MissingApiKey)?;

        let url = format!("{}/weather", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map_or(text, |body| body.message);
            debug!(status = status.as_u16(), %message, "Weather lookup rejected");
            if status.as_u16() == 404 {
                return Err(WeatherError::NotFound(city.to_string()));
            }
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: CurrentWeather = response
            .json()
            .await
            .map_err(|e| WeatherError::Payload(e.to_string()))?;
        Self::parse(city, body)
    }

    fn name(&self) -> &str {
        "OpenWeatherMap"
    }
}
