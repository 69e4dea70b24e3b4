//! Where is the device?
//!
//! [`Locator`] mimics the browser-style geolocation call the watch companion
//! relies on: a fix younger than `maximum_age` is reused, otherwise a fresh
//! one is acquired within `timeout`. Failures are not retried here.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, sync::Mutex, time::Duration};

use crate::{
    config::DEFAULT_IPINFO_BASE_URL,
    error::PositionError,
    model::{Coordinates, Fix},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);
pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, maximum_age: DEFAULT_MAXIMUM_AGE }
    }
}

#[async_trait]
pub trait PositionProvider: Send + Sync + Debug {
    async fn position(&self, options: &PositionOptions) -> Result<Fix, PositionError>;
}

/// Something that can produce a brand-new fix.
#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn acquire(&self) -> Result<Coordinates, PositionError>;
}

#[derive(Debug)]
pub struct Locator<S> {
    source: S,
    last_fix: Mutex<Option<Fix>>,
}

impl<S: PositionSource> Locator<S> {
    pub fn new(source: S) -> Self {
        Self { source, last_fix: Mutex::new(None) }
    }

    fn cached(&self, maximum_age: Duration) -> Option<Fix> {
        let guard = self.last_fix.lock().unwrap_or_else(|e| e.into_inner());
        let fix = (*guard)?;

        let max = chrono::Duration::from_std(maximum_age).ok();
        let age = Utc::now() - fix.obtained_at;
        match max {
            Some(max) if age < max => Some(fix),
            Some(_) => None,
            // Larger than chrono can represent: anything counts as fresh.
            None => Some(fix),
        }
    }

    fn remember(&self, fix: Fix) {
        let mut guard = self.last_fix.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(fix);
    }
}

#[async_trait]
impl<S: PositionSource> PositionProvider for Locator<S> {
    async fn position(&self, options: &PositionOptions) -> Result<Fix, PositionError> {
        if let Some(fix) = self.cached(options.maximum_age) {
            tracing::debug!("Reusing cached fix {} from {}", fix.coords, fix.obtained_at);
            return Ok(fix);
        }

        let coords = match tokio::time::timeout(options.timeout, self.source.acquire()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PositionError::Unavailable(format!(
                    "no fix within {} ms",
                    options.timeout.as_millis()
                )));
            }
        };

        let fix = Fix::now(coords);
        self.remember(fix);
        Ok(fix)
    }
}

/// Coordinates supplied by configuration or the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub Coordinates);

#[async_trait]
impl PositionSource for FixedSource {
    async fn acquire(&self) -> Result<Coordinates, PositionError> {
        Ok(self.0)
    }
}

/// Coarse position from the public IP address, via ipinfo.io.
#[derive(Debug, Clone)]
pub struct IpInfoSource {
    base_url: String,
    token: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: Option<String>,
}

impl IpInfoSource {
    pub fn new(http: Client, token: Option<String>) -> Self {
        Self::with_base_url(http, DEFAULT_IPINFO_BASE_URL, token)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http,
        }
    }
}

fn parse_loc(loc: &str) -> Result<Coordinates, PositionError> {
    let unavailable = || PositionError::Unavailable(format!("unusable ipinfo location {loc:?}"));

    let (lat, lon) = loc.split_once(',').ok_or_else(unavailable)?;
    let lat: f64 = lat.trim().parse().map_err(|_| unavailable())?;
    let lon: f64 = lon.trim().parse().map_err(|_| unavailable())?;

    Coordinates::new(lat, lon)
}

#[async_trait]
impl PositionSource for IpInfoSource {
    async fn acquire(&self) -> Result<Coordinates, PositionError> {
        let url = format!("{}/json", self.base_url);

        let mut req = self.http.get(&url);
        if let Some(token) = &self.token {
            req = req.query(&[("token", token.as_str())]);
        }

        let res = req
            .send()
            .await
            .map_err(|e| PositionError::Unavailable(format!("ipinfo request failed: {e}")))?;

        if !res.status().is_success() {
            return Err(PositionError::Unavailable(format!(
                "ipinfo returned status {}",
                res.status()
            )));
        }

        let body: IpInfoResponse = res
            .json()
            .await
            .map_err(|e| PositionError::Unavailable(format!("ipinfo parse error: {e}")))?;

        let loc = body
            .loc
            .ok_or_else(|| PositionError::Unavailable("ipinfo response has no loc".into()))?;

        parse_loc(&loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PositionSource for CountingSource {
        async fn acquire(&self) -> Result<Coordinates, PositionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Coordinates::new(10.0 + n as f64, 20.0)
        }
    }

    #[derive(Debug)]
    struct SlowSource;

    #[async_trait]
    impl PositionSource for SlowSource {
        async fn acquire(&self) -> Result<Coordinates, PositionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Coordinates::new(0.0, 0.0)
        }
    }

    #[test]
    fn default_options_match_watch_app() {
        let opts = PositionOptions::default();
        assert_eq!(opts.timeout, Duration::from_millis(15_000));
        assert_eq!(opts.maximum_age, Duration::from_millis(60_000));
    }

    #[tokio::test]
    async fn reuses_fresh_fix() {
        let locator = Locator::new(CountingSource::default());
        let opts = PositionOptions::default();

        let first = locator.position(&opts).await.unwrap();
        let second = locator.position(&opts).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(locator.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_max_age_always_acquires() {
        let locator = Locator::new(CountingSource::default());
        let opts = PositionOptions { maximum_age: Duration::ZERO, ..Default::default() };

        let first = locator.position(&opts).await.unwrap();
        let second = locator.position(&opts).await.unwrap();

        assert_ne!(first.coords, second.coords);
        assert_eq!(locator.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let locator = Locator::new(SlowSource);
        let opts = PositionOptions { timeout: Duration::from_millis(20), ..Default::default() };

        let err = locator.position(&opts).await.unwrap_err();
        assert!(matches!(err, PositionError::Unavailable(_)));
    }

    #[test]
    fn parses_ipinfo_loc() {
        let coords = parse_loc("52.3740,4.8897").unwrap();
        assert_eq!(coords.latitude, 52.374);
        assert_eq!(coords.longitude, 4.8897);

        assert!(parse_loc("nowhere").is_err());
        assert!(parse_loc("95.0,0.0").is_err());
    }
}
