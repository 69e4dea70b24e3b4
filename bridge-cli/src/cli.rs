use anyhow::{Context, Result, bail};
use bridge_core::{Coordinates, Pipeline, SettingsReader, Trigger, classify};
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};

use crate::app::{App, AppOptions};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-bridge", version, about = "Weather bridge for a paired watch")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Log pipeline state transitions and requests.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Bridge configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Saved watch settings (JSON).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Fixed latitude; skips IP geolocation.
    #[arg(long, global = true, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Fixed longitude; skips IP geolocation.
    #[arg(long, global = true, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// POST messages to this URL instead of printing them.
    #[arg(long, global = true)]
    pub relay: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh on start-up and whenever the watch asks (one line on stdin per request).
    Run {
        /// Also refresh every N minutes.
        #[arg(long, value_name = "MINUTES")]
        every: Option<u64>,
    },

    /// Perform a single refresh and exit.
    Once,

    /// Show the settings snapshot the next run would use.
    Settings,

    /// Show which icon a weather code maps to.
    Classify {
        code: i32,
    },
}

impl GlobalArgs {
    fn app_options(&self) -> Result<AppOptions> {
        let position = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                Some(Coordinates::new(lat, lon).context("Invalid --lat/--lon")?)
            }
            _ => None,
        };

        Ok(AppOptions {
            config_path: self.config.clone(),
            settings_path: self.settings.clone(),
            position,
            relay_url: self.relay.clone(),
        })
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Classify { code } => {
                match classify(code) {
                    Some(icon) => println!("{code} -> {icon} ({})", icon.ordinal()),
                    None => println!("{code} -> unknown"),
                }
                Ok(())
            }
            Command::Settings => {
                let opts = self.global.app_options()?;
                let app = App::load(&opts)?;
                let settings = app.settings.read();

                println!("settings file: {}", app.settings.path().display());
                println!("units:         {}", settings.units.temperature_unit());
                println!("location name: {}", settings.display_location_name);
                println!(
                    "geocoding:     {}",
                    if settings.geocoding_enabled() { "enabled" } else { "disabled" }
                );
                Ok(())
            }
            Command::Once => {
                let opts = self.global.app_options()?;
                let pipeline = App::load(&opts)?.pipeline(&opts)?;

                match pipeline.run(Trigger::Ready).await {
                    Ok(_) => Ok(()),
                    Err(e) => bail!("Weather update failed: {e}"),
                }
            }
            Command::Run { every } => {
                let opts = self.global.app_options()?;
                let pipeline = App::load(&opts)?.pipeline(&opts)?;
                let every = every.map(|m| Duration::from_secs(m.max(1) * 60));
                serve(pipeline, every).await
            }
        }
    }
}

/// Trigger loop: one run at start-up, one per stdin line, one per tick.
/// Ends on EOF (after in-flight runs finish) or Ctrl-C.
async fn serve(pipeline: Arc<Pipeline>, every: Option<Duration>) -> Result<()> {
    let mut runs = JoinSet::new();
    runs.spawn(run_logged(pipeline.clone(), Trigger::Ready));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut ticker = every.map(|period| {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval
    });

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read watch requests from stdin")? {
                    Some(_) => {
                        runs.spawn(run_logged(pipeline.clone(), Trigger::InboundMessage));
                    }
                    None => {
                        stdin_open = false;
                        if ticker.is_none() {
                            break;
                        }
                    }
                }
            }
            _ = tick(&mut ticker) => {
                runs.spawn(run_logged(pipeline.clone(), Trigger::Interval));
            }
            Some(_) = runs.join_next(), if !runs.is_empty() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                runs.abort_all();
                return Ok(());
            }
        }
    }

    while runs.join_next().await.is_some() {}
    Ok(())
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_logged(pipeline: Arc<Pipeline>, trigger: Trigger) {
    // Failures are already logged by the pipeline.
    let _ = pipeline.run(trigger).await;
}
