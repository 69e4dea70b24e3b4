//! Error taxonomy for a pipeline run.
//!
//! Each stage has its own error type; [`RunError`] is what a run reports when
//! any stage gives up. None of these are retried: the next trigger is the only
//! recovery path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    /// No fix within the timeout, or the location source reported a failure.
    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("coordinates out of range: lat {latitude}, lon {longitude}")]
    OutOfRange { latitude: f64, longitude: f64 },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("forecast request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("forecast request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed forecast response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocode request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("geocode request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed geocode response: {0}")]
    Malformed(String),

    #[error("geocode response contained no places")]
    Empty,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write message: {0}")]
    Io(#[from] std::io::Error),

    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay rejected message with status {0}")]
    Rejected(u16),
}

/// Why a run ended without sending.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    Forecast(#[from] FetchError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl RunError {
    /// Short stage label used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            RunError::Position(_) => "position",
            RunError::Forecast(_) => "forecast",
            RunError::Geocode(_) => "geocode",
            RunError::Delivery(_) => "delivery",
        }
    }
}

/// Keep error bodies short enough for a log line.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn truncate_cuts_long_bodies_on_char_boundary() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }

    #[test]
    fn run_error_reports_stage() {
        let err = RunError::from(GeocodeError::Empty);
        assert_eq!(err.stage(), "geocode");
        assert_eq!(err.to_string(), "geocode response contained no places");
    }
}
