use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::DEFAULT_FORECAST_BASE_URL,
    error::{FetchError, truncate_body},
    model::{Coordinates, ForecastSample, Units},
};

use super::{ForecastFetcher, round_temp};

#[derive(Debug, Clone)]
pub struct OpenMeteoFetcher {
    base_url: String,
    http: Client,
}

impl OpenMeteoFetcher {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, DEFAULT_FORECAST_BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current: OmCurrent,
    daily: OmDaily,
}

impl OmForecastResponse {
    fn into_sample(self) -> Result<ForecastSample, FetchError> {
        let high = first_day(&self.daily.temperature_2m_max, "temperature_2m_max")?;
        let low = first_day(&self.daily.temperature_2m_min, "temperature_2m_min")?;

        Ok(ForecastSample {
            current_temp: whole(self.current.temperature_2m, "temperature_2m")?,
            high_temp: whole(high, "temperature_2m_max")?,
            low_temp: whole(low, "temperature_2m_min")?,
            code: self.current.weather_code,
        })
    }
}

fn first_day(values: &[Option<f64>], field: &str) -> Result<f64, FetchError> {
    values
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| FetchError::Malformed(format!("daily.{field} has no value for today")))
}

fn whole(value: f64, field: &str) -> Result<i32, FetchError> {
    round_temp(value).ok_or_else(|| FetchError::Malformed(format!("{field} is not a usable number")))
}

#[async_trait]
impl ForecastFetcher for OpenMeteoFetcher {
    async fn fetch_forecast(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<ForecastSample, FetchError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let latitude = coords.latitude.to_string();
        let longitude = coords.longitude.to_string();

        tracing::debug!("Requesting forecast for {coords} in {}", units.temperature_unit());

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", "temperature_2m,weather_code"),
                ("daily", "temperature_2m_max,temperature_2m_min"),
                ("temperature_unit", units.temperature_unit()),
                ("timezone", "auto"),
                ("forecast_days", "1"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OmForecastResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        parsed.into_sample()
    }
}
