pub mod forecast_client;
pub mod json_store;
pub mod nominatim_client;

pub use forecast_client::ForecastApiClient;
pub use json_store::JsonUnitStore;
pub use nominatim_client::NominatimGeocoder;
