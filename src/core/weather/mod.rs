pub mod weather_format;
pub mod weather_models;
pub mod weather_service;

pub use weather_models::{
    CurrentConditions, DailyConditions, Forecast, Location, UnitLabels, Units, WeatherConfig,
    WeatherError, WeatherReport, WeeklyReport,
};
pub use weather_service::{
    ForecastProvider, Geocoder, UnitPreferenceStore, UnitScope, WeatherService, FORECAST_DAYS,
};
