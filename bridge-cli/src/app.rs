use anyhow::{Context, Result};
use bridge_core::{
    BridgeConfig, Coordinates, FixedSource, HttpSink, IpInfoSource, JsonFileSettings,
    JsonLinesSink, Locator, MessageSink, OpenMeteoFetcher, OpenWeatherGeocoder, Pipeline,
    PositionProvider, SettingsReader,
};
use std::{path::PathBuf, sync::Arc};

/// Everything the host needs to assemble a pipeline.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub config_path: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub position: Option<Coordinates>,
    pub relay_url: Option<String>,
}

pub struct App {
    pub config: BridgeConfig,
    pub settings: Arc<JsonFileSettings>,
}

impl App {
    pub fn load(opts: &AppOptions) -> Result<Self> {
        let config = match &opts.config_path {
            Some(path) => BridgeConfig::load_from(path)?,
            None => BridgeConfig::load()?,
        };

        let settings_path = match &opts.settings_path {
            Some(path) => path.clone(),
            None => JsonFileSettings::default_path()?,
        };

        Ok(Self { config, settings: Arc::new(JsonFileSettings::new(settings_path)) })
    }

    pub fn pipeline(&self, opts: &AppOptions) -> Result<Arc<Pipeline>> {
        let http = self.config.http_client()?;

        let fixed = match opts.position {
            Some(coords) => Some(coords),
            None => self.config.position.map(|p| p.coordinates()).transpose()?,
        };

        let locator: Arc<dyn PositionProvider> = match fixed {
            Some(coords) => {
                tracing::debug!("Using fixed position {coords}");
                Arc::new(Locator::new(FixedSource(coords)))
            }
            None => Arc::new(Locator::new(IpInfoSource::with_base_url(
                http.clone(),
                self.config.ipinfo_base_url.as_str(),
                self.config.ipinfo_token.clone(),
            ))),
        };

        let relay = opts.relay_url.as_ref().or(self.config.delivery.relay_url.as_ref());
        let sink: Arc<dyn MessageSink> = match relay {
            Some(url) => {
                check_relay_url(url)?;
                Arc::new(HttpSink::new(http.clone(), url.as_str()))
            }
            None => Arc::new(JsonLinesSink::stdout()),
        };

        let settings: Arc<dyn SettingsReader> = self.settings.clone();

        let pipeline = Pipeline::new(
            settings,
            locator,
            Arc::new(OpenMeteoFetcher::with_base_url(
                http.clone(),
                self.config.forecast_base_url.as_str(),
            )),
            Arc::new(OpenWeatherGeocoder::with_base_url(
                http,
                self.config.geocode_base_url.as_str(),
            )),
            sink,
        )
        .with_policy(self.config.policy);

        Ok(Arc::new(pipeline))
    }
}

fn check_relay_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Relay URL must start with http:// or https://"))
            .with_context(|| format!("Invalid relay URL: {url}"))
    }
}
