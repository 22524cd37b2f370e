//! Error Types for the Weather Tool

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeatherError>;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("OpenWeatherMap API key not configured")]
    MissingApiKey,

    #[error("Weather service unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed with status code {status}: {message}")]
    Status { status: u16, message: String },

    #[error("City not found: {0}")]
    NotFound(String),

    #[error("Unexpected weather payload: {0}")]
    Payload(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
