//! Upstream HTTP providers: Open-Meteo for the forecast, OpenWeatherMap for
//! reverse geocoding.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{FetchError, GeocodeError},
    model::{Coordinates, ForecastSample, Units},
};

pub mod open_meteo;
pub mod openweather;

pub use open_meteo::OpenMeteoFetcher;
pub use openweather::OpenWeatherGeocoder;

#[async_trait]
pub trait ForecastFetcher: Send + Sync + Debug {
    /// Current temperature, today's high/low and the current weather code.
    async fn fetch_forecast(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<ForecastSample, FetchError>;
}

#[async_trait]
pub trait GeocodeResolver: Send + Sync + Debug {
    /// Human-friendly name of the place at `coords`.
    async fn resolve_name(&self, coords: Coordinates, api_key: &str)
    -> Result<String, GeocodeError>;
}

/// Round half away from zero and narrow to whole degrees.
pub(crate) fn round_temp(value: f64) -> Option<i32> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
        return None;
    }
    Some(rounded as i32)
}
