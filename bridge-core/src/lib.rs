//! Core library for the watch weather bridge.
//!
//! This crate defines:
//! - The settings snapshot and bridge configuration
//! - Position, forecast and reverse-geocoding providers
//! - Weather-code classification into the watch's icon set
//! - The pipeline that turns a trigger into one message for the watch
//!
//! It is used by `bridge-cli`, but the pipeline takes its collaborators as
//! trait objects so other hosts can drive it too.

pub mod condition;
pub mod config;
pub mod delivery;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod position;
pub mod provider;
pub mod settings;

pub use condition::{IconCategory, classify};
pub use config::{BridgeConfig, RunPolicy};
pub use delivery::{HttpSink, JsonLinesSink, MessageSink};
pub use error::{DeliveryError, FetchError, GeocodeError, PositionError, RunError};
pub use model::{Coordinates, Fix, ForecastSample, OutboundMessage, Trigger, Units};
pub use pipeline::{Pipeline, RunOutcome, RunReport, RunState};
pub use position::{FixedSource, IpInfoSource, Locator, PositionOptions, PositionProvider};
pub use provider::{ForecastFetcher, GeocodeResolver, OpenMeteoFetcher, OpenWeatherGeocoder};
pub use settings::{JsonFileSettings, Settings, SettingsReader, StaticSettings};
