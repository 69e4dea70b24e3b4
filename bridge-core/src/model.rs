use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{condition::IconCategory, error::PositionError};

/// Temperature scale requested from the forecast provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Value of Open-Meteo's `temperature_unit` parameter.
    pub fn temperature_unit(&self) -> &'static str {
        match self {
            Units::Metric => "celsius",
            Units::Imperial => "fahrenheit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PositionError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(PositionError::OutOfRange { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// A position together with the moment it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub coords: Coordinates,
    pub obtained_at: DateTime<Utc>,
}

impl Fix {
    pub fn now(coords: Coordinates) -> Self {
        Self { coords, obtained_at: Utc::now() }
    }
}

/// Today's numbers, already rounded to whole degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastSample {
    pub current_temp: i32,
    pub high_temp: i32,
    pub low_temp: i32,
    pub code: i32,
}

/// The record handed to the paired device.
///
/// Serializes with exactly five keys. An unmapped condition is sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "CUR_TEMP")]
    pub cur_temp: i32,
    #[serde(rename = "HIGH_TEMP")]
    pub high_temp: i32,
    #[serde(rename = "LOW_TEMP")]
    pub low_temp: i32,
    #[serde(rename = "CONDITIONS")]
    pub conditions: Option<IconCategory>,
    #[serde(rename = "LOCATION")]
    pub location: String,
}

impl OutboundMessage {
    pub fn assemble(sample: &ForecastSample, location: impl Into<String>) -> Self {
        Self {
            cur_temp: sample.current_temp,
            high_temp: sample.high_temp,
            low_temp: sample.low_temp,
            conditions: crate::condition::classify(sample.code),
            location: location.into(),
        }
    }

    /// Replace the location before the message is sent.
    pub fn with_location(self, location: impl Into<String>) -> Self {
        Self { location: location.into(), ..self }
    }
}

/// What started a run. The pipeline treats all of them the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Bridge start-up.
    Ready,
    /// The watch asked for a refresh.
    InboundMessage,
    /// Periodic refresh from the host.
    Interval,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Trigger::Ready => "ready",
            Trigger::InboundMessage => "appmessage",
            Trigger::Interval => "interval",
        })
    }
}
