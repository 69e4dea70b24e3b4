use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Coordinates;

pub const DEFAULT_FORECAST_BASE_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_GEOCODE_BASE_URL: &str = "http://api.openweathermap.org";
pub const DEFAULT_IPINFO_BASE_URL: &str = "https://ipinfo.io";

/// Run-level behaviour switches. Both default to the watch app's historical
/// behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPolicy {
    /// Only the most recently triggered run may send.
    pub drop_stale_runs: bool,

    /// Send with the configured name when reverse geocoding fails, instead of
    /// abandoning the run.
    pub fallback_on_geocode_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl FixedPosition {
    pub fn coordinates(&self) -> Result<Coordinates> {
        Coordinates::new(self.latitude, self.longitude)
            .context("Invalid [position] in bridge configuration")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// POST each message here instead of printing it.
    pub relay_url: Option<String>,
}

/// Operational configuration of the bridge process.
///
/// Example TOML:
/// ```toml
/// http_timeout_secs = 20
///
/// [position]
/// latitude = 52.37
/// longitude = 4.89
///
/// [policy]
/// drop_stale_runs = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub forecast_base_url: String,
    pub geocode_base_url: String,
    pub ipinfo_base_url: String,
    pub ipinfo_token: Option<String>,

    /// Use these coordinates instead of IP geolocation.
    pub position: Option<FixedPosition>,

    /// Request timeout for the HTTP clients; unset leaves reqwest's default.
    pub http_timeout_secs: Option<u64>,

    pub policy: RunPolicy,
    pub delivery: DeliveryConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: DEFAULT_FORECAST_BASE_URL.to_string(),
            geocode_base_url: DEFAULT_GEOCODE_BASE_URL.to_string(),
            ipinfo_base_url: DEFAULT_IPINFO_BASE_URL.to_string(),
            ipinfo_token: None,
            position: None,
            http_timeout_secs: None,
            policy: RunPolicy::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load config from the default location, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: BridgeConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-bridge", "weather-bridge")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    /// Shared HTTP client for all providers.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.http_timeout() {
            builder = builder.timeout(timeout);
        }

        builder.build().context("Failed to build HTTP client")
    }
}
