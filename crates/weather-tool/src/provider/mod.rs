//! Weather Providers
//!
//! Abstractions and implementations for third-party weather services.

mod mock;
mod openweather;

pub use mock::MockWeatherProvider;
pub use openweather::{OpenWeatherClient, OpenWeatherConfig};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::WeatherReport;

/// Weather provider trait (Strategy pattern)
///
/// Implement this for each upstream service.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions for a city name
    async fn current(&self, city: &str) -> Result<WeatherReport>;

    /// Provider name
    fn name(&self) -> &str;
}
