use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Measurement systems understood by the forecast API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// SI units.
    #[default]
    Si,
    /// Same as SI, but speed in km/h.
    Ca,
    /// Same as SI, but distance in miles and speed in mph.
    Uk2,
    /// Imperial units.
    Us,
}

/// Display suffixes for each kind of measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitLabels {
    pub distance: &'static str,
    pub intensity: &'static str,
    pub accumulation: &'static str,
    pub temp: &'static str,
    pub speed: &'static str,
    pub pressure: &'static str,
}

impl Units {
    pub const ALL: [Units; 4] = [Units::Si, Units::Ca, Units::Uk2, Units::Us];

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Si => "si",
            Units::Ca => "ca",
            Units::Uk2 => "uk2",
            Units::Us => "us",
        }
    }

    pub fn labels(&self) -> UnitLabels {
        match self {
            Units::Si => UnitLabels {
                distance: "km",
                intensity: "mm/h",
                accumulation: "cm",
                temp: "℃",
                speed: "m/s",
                pressure: "hPa",
            },
            Units::Ca => UnitLabels {
                speed: "km/h",
                ..Units::Si.labels()
            },
            Units::Uk2 => UnitLabels {
                distance: "mi",
                speed: "mph",
                ..Units::Si.labels()
            },
            Units::Us => UnitLabels {
                distance: "mi",
                intensity: "″",
                accumulation: "″",
                temp: "℉",
                speed: "mph",
                pressure: "mbar",
            },
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_lowercase();
        Units::ALL
            .into_iter()
            .find(|units| units.as_str() == folded)
            .ok_or_else(|| WeatherError::UnsupportedUnits(s.to_string()))
    }
}

/// Where forecasts come from and which language they are written in.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub locale: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pirateweather.net".to_string(),
            api_key: None,
            locale: "en-US".to_string(),
        }
    }
}

/// A geocoded place.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn maps_url(&self) -> String {
        format!("https://www.google.com/maps/place/{},{}", self.lat, self.lng)
    }
}

/// Conditions right now. Any value the API left out is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentConditions {
    pub time: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub icon: Option<String>,
    pub temperature: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub visibility: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_bearing: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub ozone: Option<f64>,
    pub uv_index: Option<f64>,
    pub precip_probability: Option<f64>,
    pub precip_intensity: Option<f64>,
    pub precip_type: Option<String>,
}

/// One day of the weekly forecast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyConditions {
    pub time: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub icon: Option<String>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub apparent_temperature_min: Option<f64>,
    pub apparent_temperature_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub visibility: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_bearing: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub ozone: Option<f64>,
    pub uv_index: Option<f64>,
    pub precip_probability: Option<f64>,
    pub precip_intensity: Option<f64>,
    pub precip_type: Option<String>,
    pub precip_accumulation: Option<f64>,
    pub moon_phase: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    pub currently: CurrentConditions,
    pub daily_summary: Option<String>,
    pub daily: Vec<DailyConditions>,
}

/// Result of a `weather` lookup.
#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub location: Location,
    pub units: Units,
    pub conditions: CurrentConditions,
}

/// Result of a `forecast` lookup.
#[derive(Debug, Clone)]
pub struct WeeklyReport {
    pub location: Location,
    pub units: Units,
    pub summary: Option<String>,
    pub days: Vec<DailyConditions>,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Cannot find a place `{0}`")]
    PlaceNotFound(String),

    #[error("This command requires an API key")]
    MissingApiKey,

    #[error("Unable to get data from the forecast service: {0}")]
    Unavailable(String),

    #[error("Units \"{0}\" are not supported")]
    UnsupportedUnits(String),

    #[error("Failed to persist unit preferences: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_parse_case_insensitively() {
        assert_eq!("SI".parse::<Units>().unwrap(), Units::Si);
        assert_eq!(" uk2 ".parse::<Units>().unwrap(), Units::Uk2);
        assert!(matches!(
            "metric".parse::<Units>(),
            Err(WeatherError::UnsupportedUnits(raw)) if raw == "metric"
        ));
    }

    #[test]
    fn derived_unit_systems_only_change_what_they_say() {
        let ca = Units::Ca.labels();
        assert_eq!(ca.speed, "km/h");
        assert_eq!(ca.distance, "km");

        let uk2 = Units::Uk2.labels();
        assert_eq!(uk2.distance, "mi");
        assert_eq!(uk2.temp, "℃");

        assert_eq!(Units::Us.labels().pressure, "mbar");
    }
}
