//! One end-to-end refresh: position, forecast, optional geocode, send.
//!
//! Every trigger starts an independent run. Runs are never cancelled, so two
//! overlapping runs both send and the one finishing last wins, unless
//! [`RunPolicy::drop_stale_runs`] is set.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::task::JoinHandle;

use crate::{
    config::RunPolicy,
    delivery::MessageSink,
    error::RunError,
    model::{OutboundMessage, Trigger},
    position::{PositionOptions, PositionProvider},
    provider::{ForecastFetcher, GeocodeResolver},
    settings::{Settings, SettingsReader},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AwaitingPosition,
    AwaitingForecast,
    AwaitingGeocode,
    Ready,
    Sent,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunState::Idle => "idle",
            RunState::AwaitingPosition => "awaiting-position",
            RunState::AwaitingForecast => "awaiting-forecast",
            RunState::AwaitingGeocode => "awaiting-geocode",
            RunState::Ready => "ready",
            RunState::Sent => "sent",
            RunState::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Sent(OutboundMessage),
    /// A newer run was triggered before this one could send.
    Superseded(OutboundMessage),
}

impl RunOutcome {
    pub fn message(&self) -> &OutboundMessage {
        match self {
            RunOutcome::Sent(m) | RunOutcome::Superseded(m) => m,
        }
    }

    pub fn was_sent(&self) -> bool {
        matches!(self, RunOutcome::Sent(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: u64,
    pub trigger: Trigger,
    pub outcome: RunOutcome,
}

struct Run {
    id: u64,
    state: RunState,
}

impl Run {
    fn advance(&mut self, next: RunState) {
        tracing::debug!(run = self.id, "{} -> {}", self.state, next);
        self.state = next;
    }
}

pub struct Pipeline {
    settings: Arc<dyn SettingsReader>,
    locator: Arc<dyn PositionProvider>,
    forecast: Arc<dyn ForecastFetcher>,
    geocoder: Arc<dyn GeocodeResolver>,
    sink: Arc<dyn MessageSink>,
    position_options: PositionOptions,
    policy: RunPolicy,
    generation: AtomicU64,
}

impl Pipeline {
    pub fn new(
        settings: Arc<dyn SettingsReader>,
        locator: Arc<dyn PositionProvider>,
        forecast: Arc<dyn ForecastFetcher>,
        geocoder: Arc<dyn GeocodeResolver>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            settings,
            locator,
            forecast,
            geocoder,
            sink,
            position_options: PositionOptions::default(),
            policy: RunPolicy::default(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_position_options(mut self, options: PositionOptions) -> Self {
        self.position_options = options;
        self
    }

    /// Start a run in the background without touching runs already in flight.
    pub fn spawn(self: &Arc<Self>, trigger: Trigger) -> JoinHandle<Result<RunReport, RunError>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(trigger).await })
    }

    /// Perform one complete run. Any stage failure ends the run without
    /// sending anything.
    pub async fn run(&self, trigger: Trigger) -> Result<RunReport, RunError> {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut run = Run { id, state: RunState::Idle };
        tracing::debug!(run = id, "Run triggered by {trigger}");

        let settings = self.settings.read();

        match self.drive(&mut run, &settings).await {
            Ok(outcome) => Ok(RunReport { run_id: id, trigger, outcome }),
            Err(e) => {
                run.advance(RunState::Failed);
                tracing::warn!(run = id, stage = e.stage(), "Weather update abandoned: {e}");
                Err(e)
            }
        }
    }

    async fn drive(&self, run: &mut Run, settings: &Settings) -> Result<RunOutcome, RunError> {
        run.advance(RunState::AwaitingPosition);
        let fix = self.locator.position(&self.position_options).await?;

        run.advance(RunState::AwaitingForecast);
        let sample = self.forecast.fetch_forecast(fix.coords, settings.units).await?;

        let mut message = OutboundMessage::assemble(&sample, settings.display_location_name.as_str());
        if message.conditions.is_none() {
            tracing::warn!(run = run.id, code = sample.code, "Unmapped weather code, sending without an icon");
        }

        if let Some(api_key) = &settings.weather_api_key {
            run.advance(RunState::AwaitingGeocode);
            match self.geocoder.resolve_name(fix.coords, api_key).await {
                Ok(name) => message = message.with_location(name),
                Err(e) if self.policy.fallback_on_geocode_error => {
                    tracing::warn!(run = run.id, "Geocoding failed, keeping {:?}: {e}", message.location);
                }
                Err(e) => return Err(e.into()),
            }
        }

        run.advance(RunState::Ready);

        if self.policy.drop_stale_runs && self.generation.load(Ordering::SeqCst) != run.id {
            tracing::info!(run = run.id, "Newer run in flight, dropping this update");
            return Ok(RunOutcome::Superseded(message));
        }

        self.sink.send(&message).await?;
        run.advance(RunState::Sent);
        tracing::info!(
            run = run.id,
            cur = message.cur_temp,
            high = message.high_temp,
            low = message.low_temp,
            "Weather info sent for {}",
            message.location
        );

        Ok(RunOutcome::Sent(message))
    }
}
