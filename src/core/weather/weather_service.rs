// Weather lookups: geocode a place, fetch its forecast in the caller's units.
// The HTTP clients and the preference file live in `infra/weather`.

use super::weather_format::forecast_language;
use super::weather_models::{
    Forecast, Location, Units, WeatherError, WeatherReport, WeeklyReport,
};
use async_trait::async_trait;

/// Days shown by the weekly forecast menu (today plus the next seven).
pub const FORECAST_DAYS: usize = 8;

// ============================================================================
// PORTS
// ============================================================================

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free text to coordinates. `None` when nothing matches.
    async fn locate(&self, place: &str) -> Result<Option<Location>, WeatherError>;
}

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn load_forecast(
        &self,
        lat: f64,
        lng: f64,
        units: Units,
        lang: &str,
    ) -> Result<Forecast, WeatherError>;
}

/// Per-guild defaults and per-user overrides for measurement units.
#[async_trait]
pub trait UnitPreferenceStore: Send + Sync {
    async fn guild_units(&self, guild_id: u64) -> Result<Option<Units>, WeatherError>;
    async fn set_guild_units(&self, guild_id: u64, units: Units) -> Result<(), WeatherError>;
    async fn user_units(&self, user_id: u64) -> Result<Option<Units>, WeatherError>;
    async fn set_user_units(&self, user_id: u64, units: Option<Units>)
        -> Result<(), WeatherError>;
}

/// Who is asking, for unit resolution.
#[derive(Debug, Clone, Copy)]
pub struct UnitScope {
    pub user_id: u64,
    pub guild_id: Option<u64>,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct WeatherService<G: Geocoder, F: ForecastProvider, S: UnitPreferenceStore> {
    geocoder: G,
    forecasts: F,
    prefs: S,
    language: String,
}

impl<G: Geocoder, F: ForecastProvider, S: UnitPreferenceStore> WeatherService<G, F, S> {
    pub fn new(geocoder: G, forecasts: F, prefs: S, locale: &str) -> Self {
        Self {
            geocoder,
            forecasts,
            prefs,
            language: forecast_language(locale),
        }
    }

    /// The guild default, or SI when the guild never chose.
    pub async fn guild_units(&self, guild_id: u64) -> Result<Units, WeatherError> {
        Ok(self.prefs.guild_units(guild_id).await?.unwrap_or_default())
    }

    pub async fn user_units(&self, user_id: u64) -> Result<Option<Units>, WeatherError> {
        self.prefs.user_units(user_id).await
    }

    /// A user's own choice wins over the guild default, which wins over SI.
    pub async fn effective_units(&self, scope: UnitScope) -> Result<Units, WeatherError> {
        if let Some(units) = self.prefs.user_units(scope.user_id).await? {
            return Ok(units);
        }
        match scope.guild_id {
            Some(guild_id) => self.guild_units(guild_id).await,
            None => Ok(Units::default()),
        }
    }

    pub async fn set_user_units(&self, user_id: u64, raw: &str) -> Result<Units, WeatherError> {
        let units: Units = raw.parse()?;
        self.prefs.set_user_units(user_id, Some(units)).await?;
        tracing::debug!(user_id, %units, "User units updated");
        Ok(units)
    }

    pub async fn clear_user_units(&self, user_id: u64) -> Result<(), WeatherError> {
        self.prefs.set_user_units(user_id, None).await
    }

    pub async fn set_guild_units(&self, guild_id: u64, raw: &str) -> Result<Units, WeatherError> {
        let units: Units = raw.parse()?;
        self.prefs.set_guild_units(guild_id, units).await?;
        tracing::debug!(guild_id, %units, "Guild units updated");
        Ok(units)
    }

    async fn lookup(
        &self,
        place: &str,
        scope: UnitScope,
    ) -> Result<(Location, Units, Forecast), WeatherError> {
        let location = self
            .geocoder
            .locate(place)
            .await?
            .ok_or_else(|| WeatherError::PlaceNotFound(place.to_string()))?;
        let units = self.effective_units(scope).await?;
        let forecast = self
            .forecasts
            .load_forecast(location.lat, location.lng, units, &self.language)
            .await?;
        Ok((location, units, forecast))
    }

    /// Current conditions at `place`.
    pub async fn current(
        &self,
        place: &str,
        scope: UnitScope,
    ) -> Result<WeatherReport, WeatherError> {
        let (location, units, forecast) = self.lookup(place, scope).await?;
        Ok(WeatherReport {
            location,
            units,
            conditions: forecast.currently,
        })
    }

    /// Daily forecast at `place`, at most [`FORECAST_DAYS`] days.
    pub async fn week(&self, place: &str, scope: UnitScope) -> Result<WeeklyReport, WeatherError> {
        let (location, units, forecast) = self.lookup(place, scope).await?;
        let mut days = forecast.daily;
        days.truncate(FORECAST_DAYS);
        Ok(WeeklyReport {
            location,
            units,
            summary: forecast.daily_summary,
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::weather::weather_models::{CurrentConditions, DailyConditions};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn locate(&self, place: &str) -> Result<Option<Location>, WeatherError> {
            Ok((place == "Oslo").then(|| Location {
                address: "Oslo, Norway".into(),
                lat: 59.91,
                lng: 10.75,
            }))
        }
    }

    /// Echoes the requested units and language back through the summary.
    struct EchoForecasts;

    #[async_trait]
    impl ForecastProvider for EchoForecasts {
        async fn load_forecast(
            &self,
            _: f64,
            _: f64,
            units: Units,
            lang: &str,
        ) -> Result<Forecast, WeatherError> {
            Ok(Forecast {
                currently: CurrentConditions {
                    summary: Some(format!("{}/{}", units, lang)),
                    ..Default::default()
                },
                daily_summary: Some("Mild week".into()),
                daily: vec![DailyConditions::default(); 10],
            })
        }
    }

    #[derive(Default)]
    struct MemoryPrefs {
        guilds: Mutex<HashMap<u64, Units>>,
        users: Mutex<HashMap<u64, Units>>,
    }

    #[async_trait]
    impl UnitPreferenceStore for MemoryPrefs {
        async fn guild_units(&self, guild_id: u64) -> Result<Option<Units>, WeatherError> {
            Ok(self.guilds.lock().unwrap().get(&guild_id).copied())
        }

        async fn set_guild_units(&self, guild_id: u64, units: Units) -> Result<(), WeatherError> {
            self.guilds.lock().unwrap().insert(guild_id, units);
            Ok(())
        }

        async fn user_units(&self, user_id: u64) -> Result<Option<Units>, WeatherError> {
            Ok(self.users.lock().unwrap().get(&user_id).copied())
        }

        async fn set_user_units(
            &self,
            user_id: u64,
            units: Option<Units>,
        ) -> Result<(), WeatherError> {
            let mut users = self.users.lock().unwrap();
            match units {
                Some(units) => users.insert(user_id, units),
                None => users.remove(&user_id),
            };
            Ok(())
        }
    }

    fn service() -> WeatherService<FixedGeocoder, EchoForecasts, MemoryPrefs> {
        WeatherService::new(FixedGeocoder, EchoForecasts, MemoryPrefs::default(), "de-DE")
    }

    const IN_GUILD: UnitScope = UnitScope {
        user_id: 1,
        guild_id: Some(7),
    };

    #[tokio::test]
    async fn units_resolve_user_then_guild_then_default() {
        let svc = service();
        assert_eq!(svc.effective_units(IN_GUILD).await.unwrap(), Units::Si);

        svc.set_guild_units(7, "US").await.unwrap();
        assert_eq!(svc.effective_units(IN_GUILD).await.unwrap(), Units::Us);

        svc.set_user_units(1, "uk2").await.unwrap();
        assert_eq!(svc.effective_units(IN_GUILD).await.unwrap(), Units::Uk2);

        svc.clear_user_units(1).await.unwrap();
        assert_eq!(svc.effective_units(IN_GUILD).await.unwrap(), Units::Us);
    }

    #[tokio::test]
    async fn unsupported_units_are_not_stored() {
        let svc = service();

        let err = svc.set_user_units(1, "kelvin").await.unwrap_err();

        assert!(matches!(err, WeatherError::UnsupportedUnits(_)));
        assert_eq!(svc.user_units(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn current_uses_resolved_units_and_language() {
        let svc = service();
        svc.set_user_units(1, "ca").await.unwrap();

        let report = svc.current("Oslo", IN_GUILD).await.unwrap();

        assert_eq!(report.units, Units::Ca);
        assert_eq!(report.conditions.summary.as_deref(), Some("ca/de"));
        assert_eq!(report.location.address, "Oslo, Norway");
    }

    #[tokio::test]
    async fn unknown_places_are_reported() {
        let err = service().current("Atlantis", IN_GUILD).await.unwrap_err();
        assert!(matches!(err, WeatherError::PlaceNotFound(place) if place == "Atlantis"));
    }

    #[tokio::test]
    async fn week_is_capped_at_eight_days() {
        let report = service().week("Oslo", IN_GUILD).await.unwrap();
        assert_eq!(report.days.len(), FORECAST_DAYS);
        assert_eq!(report.summary.as_deref(), Some("Mild week"));
    }
}
