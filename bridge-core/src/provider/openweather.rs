use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::DEFAULT_GEOCODE_BASE_URL,
    error::{GeocodeError, truncate_body},
    model::Coordinates,
};

use super::GeocodeResolver;

/// OpenWeatherMap reverse geocoding.
#[derive(Debug, Clone)]
pub struct OpenWeatherGeocoder {
    base_url: String,
    http: Client,
}

impl OpenWeatherGeocoder {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, DEFAULT_GEOCODE_BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwPlace {
    name: String,
}

fn first_name(body: &str) -> Result<String, GeocodeError> {
    let places: Vec<OwPlace> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

    places
        .into_iter()
        .next()
        .map(|place| place.name)
        .ok_or(GeocodeError::Empty)
}

#[async_trait]
impl GeocodeResolver for OpenWeatherGeocoder {
    async fn resolve_name(
        &self,
        coords: Coordinates,
        api_key: &str,
    ) -> Result<String, GeocodeError> {
        let url = format!("{}/geo/1.0/reverse", self.base_url);
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();

        tracing::debug!("Reverse geocoding {coords}");

        let res = self
            .http
            .get(&url)
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("appid", api_key)])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let name = first_name(&body)?;
        tracing::debug!("Reverse geocoded {coords} to {name}");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_place() {
        let name = first_name(r#"[{"name":"Springfield","country":"US"},{"name":"Shelbyville"}]"#);
        assert_eq!(name.unwrap(), "Springfield");
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(matches!(first_name("[]"), Err(GeocodeError::Empty)));
    }

    #[test]
    fn non_list_is_malformed() {
        let err = first_name(r#"{"cod":401,"message":"Invalid API key"}"#).unwrap_err();
        assert!(matches!(err, GeocodeError::Malformed(_)));
    }

    #[test]
    fn place_without_name_is_malformed() {
        let err = first_name(r#"[{"lat":1.0}]"#).unwrap_err();
        assert!(matches!(err, GeocodeError::Malformed(_)));
    }
}
