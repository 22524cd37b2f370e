//! Weather Data Model

/// Current conditions for one city
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherReport {
    /// City as resolved by the provider
    pub city: String,

    /// Temperature in °C
    pub temperature_c: f64,

    /// Condition description, e.g. "light rain"
    pub conditions: String,

    /// Relative humidity in %
    pub humidity_percent: u8,
}

impl WeatherReport {
    pub fn new(
        city: impl Into<String>,
        temperature_c: f64,
        conditions: impl Into<String>,
        humidity_percent: u8,
    ) -> Self {
        Self {
            city: city.into(),
            temperature_c,
            conditions: conditions.into(),
            humidity_percent,
        }
    }

    /// Text block sent back over the channel.
    ///
    /// Field order and units are fixed: temperature, conditions, humidity.
    pub fn to_tool_text(&self) -> String {
        format!(
            "Temperature: {}°C, Conditions: {}, Humidity: {}%",
            self.temperature_c, self.conditions, self.humidity_percent
        )
    }
}
