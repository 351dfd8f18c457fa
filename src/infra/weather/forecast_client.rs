use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::core::weather::{
    CurrentConditions, DailyConditions, Forecast, ForecastProvider, Units, WeatherConfig,
    WeatherError,
};

/// Client for any forecast API that speaks the Dark Sky response format.
pub struct ForecastApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ForecastApiClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
        })
    }

    fn parse_time(value: Option<i64>) -> Option<DateTime<Utc>> {
        value.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    fn map_current(api: ApiDataPoint) -> CurrentConditions {
        CurrentConditions {
            time: Self::parse_time(api.time),
            summary: api.summary,
            icon: api.icon,
            temperature: api.temperature,
            apparent_temperature: api.apparent_temperature,
            pressure: api.pressure,
            humidity: api.humidity,
            visibility: api.visibility,
            wind_speed: api.wind_speed,
            wind_bearing: api.wind_bearing,
            cloud_cover: api.cloud_cover,
            ozone: api.ozone,
            uv_index: api.uv_index,
            precip_probability: api.precip_probability,
            precip_intensity: api.precip_intensity,
            precip_type: api.precip_type,
        }
    }

    fn map_day(api: ApiDataPoint) -> DailyConditions {
        DailyConditions {
            time: Self::parse_time(api.time),
            summary: api.summary,
            icon: api.icon,
            temperature_min: api.temperature_min,
            temperature_max: api.temperature_max,
            apparent_temperature_min: api.apparent_temperature_min,
            apparent_temperature_max: api.apparent_temperature_max,
            pressure: api.pressure,
            humidity: api.humidity,
            visibility: api.visibility,
            wind_speed: api.wind_speed,
            wind_bearing: api.wind_bearing,
            cloud_cover: api.cloud_cover,
            ozone: api.ozone,
            uv_index: api.uv_index,
            precip_probability: api.precip_probability,
            precip_intensity: api.precip_intensity,
            precip_type: api.precip_type,
            precip_accumulation: api.precip_accumulation,
            moon_phase: api.moon_phase,
        }
    }

    fn map_forecast(api: ApiForecast) -> Forecast {
        let daily = api.daily.unwrap_or_default();
        Forecast {
            currently: api.currently.map(Self::map_current).unwrap_or_default(),
            daily_summary: daily.summary,
            daily: daily.data.into_iter().map(Self::map_day).collect(),
        }
    }
}

#[async_trait]
impl ForecastProvider for ForecastApiClient {
    async fn load_forecast(
        &self,
        lat: f64,
        lng: f64,
        units: Units,
        lang: &str,
    ) -> Result<Forecast, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let url = format!("{}/forecast/{}/{},{}", self.base_url, api_key, lat, lng);

        let resp = self
            .client
            .get(url)
            .query(&[("units", units.as_str()), ("lang", lang)])
            .send()
            .await
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(WeatherError::MissingApiKey)
            }
            status if !status.is_success() => {
                return Err(WeatherError::Unavailable(format!(
                    "forecast API returned {}",
                    status
                )))
            }
            _ => {}
        }

        let forecast: ApiForecast = resp
            .json()
            .await
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;
        Ok(Self::map_forecast(forecast))
    }
}

#[derive(Debug, Deserialize)]
struct ApiForecast {
    currently: Option<ApiDataPoint>,
    daily: Option<ApiDataBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiDataBlock {
    summary: Option<String>,
    #[serde(default)]
    data: Vec<ApiDataPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDataPoint {
    time: Option<i64>,
    summary: Option<String>,
    icon: Option<String>,
    temperature: Option<f64>,
    apparent_temperature: Option<f64>,
    temperature_min: Option<f64>,
    temperature_max: Option<f64>,
    apparent_temperature_min: Option<f64>,
    apparent_temperature_max: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
    visibility: Option<f64>,
    wind_speed: Option<f64>,
    wind_bearing: Option<f64>,
    cloud_cover: Option<f64>,
    ozone: Option<f64>,
    uv_index: Option<f64>,
    precip_probability: Option<f64>,
    precip_intensity: Option<f64>,
    precip_type: Option<String>,
    precip_accumulation: Option<f64>,
    moon_phase: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "latitude": 59.91,
        "longitude": 10.75,
        "currently": {
            "time": 1700000000,
            "summary": "Overcast",
            "icon": "cloudy",
            "temperature": 3.4,
            "apparentTemperature": 0.9,
            "humidity": 0.81,
            "windBearing": 200,
            "uvIndex": 0
        },
        "daily": {
            "summary": "Light rain throughout the week.",
            "data": [
                { "time": 1699999200, "temperatureMin": 1.0, "temperatureMax": 4.5, "moonPhase": 0.55 },
                { "time": 1700085600, "precipType": "snow", "precipAccumulation": 2.1 }
            ]
        }
    }"#;

    #[test]
    fn maps_dark_sky_payload() {
        let api: ApiForecast = serde_json::from_str(SAMPLE).unwrap();

        let forecast = ForecastApiClient::map_forecast(api);

        assert_eq!(forecast.currently.summary.as_deref(), Some("Overcast"));
        assert_eq!(forecast.currently.apparent_temperature, Some(0.9));
        assert_eq!(forecast.currently.wind_bearing, Some(200.0));
        assert_eq!(forecast.currently.pressure, None);
        assert_eq!(
            forecast.currently.time,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(
            forecast.daily_summary.as_deref(),
            Some("Light rain throughout the week.")
        );
        assert_eq!(forecast.daily.len(), 2);
        assert_eq!(forecast.daily[0].moon_phase, Some(0.55));
        assert_eq!(forecast.daily[1].precip_type.as_deref(), Some("snow"));
    }

    #[test]
    fn missing_blocks_become_empty() {
        let api: ApiForecast = serde_json::from_str("{}").unwrap();

        let forecast = ForecastApiClient::map_forecast(api);

        assert_eq!(forecast, Forecast::default());
    }

    #[tokio::test]
    async fn no_key_means_no_request() {
        let client = ForecastApiClient::new(&WeatherConfig {
            api_key: Some("  ".into()),
            ..WeatherConfig::default()
        })
        .unwrap();

        let err = client
            .load_forecast(0.0, 0.0, Units::Si, "en")
            .await
            .unwrap_err();

        assert!(matches!(err, WeatherError::MissingApiKey));
    }
}
