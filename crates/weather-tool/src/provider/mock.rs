//! Mock Weather Provider
//!
//! For testing and demo purposes. Returns static readings.

use async_trait::async_trait;
use std::time::Duration;

use super::WeatherProvider;
use crate::error::{Result, WeatherError};
use crate::model::WeatherReport;

/// Mock provider with static readings
#[derive(Default)]
pub struct MockWeatherProvider {
    /// Every lookup fails with this message
    failure: Option<String>,

    /// Added latency per lookup
    delay: Option<Duration>,
}

impl MockWeatherProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose every lookup fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            delay: None,
        }
    }

    /// Delay each lookup (for timeout tests)
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn reading(city: &str) -> Option<(f64, &'static str, u8)> {
        // (temp °C, conditions, humidity %)
        match city.trim().to_lowercase().as_str() {
            "paris" => Some((18.5, "light rain", 72)),
            "london" => Some((14.0, "overcast clouds", 81)),
            "tokyo" => Some((22.3, "clear sky", 55)),
            "new york" => Some((20.1, "few clouds", 60)),
            "bengaluru" | "bangalore" => Some((26.0, "scattered clouds", 65)),
            "mumbai" => Some((31.2, "haze", 78)),
            "delhi" => Some((34.5, "smoke", 40)),
            "chennai" => Some((32.8, "broken clouds", 70)),
            _ => None,
        }
    }
}

#[async_trait]
impl WeatherProvider for MockWeatherProvider {
    async fn current(&self, city: &str) -> Result<WeatherReport> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(WeatherError::Unavailable(message.clone()));
        }

        let (temp, conditions, humidity) =
            Self::reading(city).ok_or_else(|| WeatherError::NotFound(city.to_string()))?;
        Ok(WeatherReport::new(city.trim(), temp, conditions, humidity))
    }

    fn name(&self) -> &str {
        "MockWeather"
    }
}
