use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::core::weather::{Geocoder, Location, WeatherError};

/// OpenStreetMap geocoder. Nominatim rejects requests without a user agent.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self, WeatherError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(concat!("leveler_bot/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: "https://nominatim.openstreetmap.org".to_string(),
        })
    }

    fn map_place(api: ApiPlace) -> Option<Location> {
        Some(Location {
            lat: api.lat.parse().ok()?,
            lng: api.lon.parse().ok()?,
            address: api.display_name,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, place: &str) -> Result<Option<Location>, WeatherError> {
        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", place), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WeatherError::Unavailable(format!(
                "geocoder returned {}",
                resp.status()
            )));
        }

        let places: Vec<ApiPlace> = resp
            .json()
            .await
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;
        tracing::debug!(place, results = places.len(), "Geocoded place");

        Ok(places.into_iter().next().and_then(Self::map_place))
    }
}

#[derive(Debug, Deserialize)]
struct ApiPlace {
    lat: String,
    lon: String,
    display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_search_results() {
        let places: Vec<ApiPlace> = serde_json::from_str(
            r#"[{"place_id": 1, "lat": "59.9133301", "lon": "10.7389701", "display_name": "Oslo, Norge"}]"#,
        )
        .unwrap();

        let location = places
            .into_iter()
            .next()
            .and_then(NominatimGeocoder::map_place)
            .unwrap();

        assert_eq!(location.address, "Oslo, Norge");
        assert!((location.lat - 59.9133301).abs() < 1e-9);
        assert!((location.lng - 10.7389701).abs() < 1e-9);
    }

    #[test]
    fn garbled_coordinates_are_skipped() {
        let place = ApiPlace {
            lat: "north".into(),
            lon: "10.0".into(),
            display_name: "Nowhere".into(),
        };
        assert_eq!(NominatimGeocoder::map_place(place), None);
    }
}
