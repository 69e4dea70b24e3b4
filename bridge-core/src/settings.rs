//! User preferences saved by the watch's configuration page.
//!
//! The store itself belongs to the configuration page; this module only reads
//! it. A missing store or missing keys are never errors, they just mean
//! defaults.

use directories::ProjectDirs;
use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::model::Units;

pub const KEY_UNITS: &str = "UNITS";
pub const KEY_API_KEY: &str = "OWM_API_KEY";
pub const KEY_LOCATION_NAME: &str = "LOCATION_NAME";

pub const DEFAULT_LOCATION_NAME: &str = "My Location";

/// Immutable snapshot of the user's preferences for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub units: Units,
    /// OpenWeatherMap key; enables reverse geocoding when present.
    pub weather_api_key: Option<String>,
    pub display_location_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            weather_api_key: None,
            display_location_name: DEFAULT_LOCATION_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Build a snapshot from raw key/value pairs, applying defaults.
    ///
    /// `UNITS` must be exactly `"F"` to select imperial. Empty strings count
    /// as absent.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Settings::default();

        for (key, value) in pairs {
            match key {
                KEY_UNITS => {
                    settings.units = if value == "F" { Units::Imperial } else { Units::Metric };
                }
                KEY_API_KEY if !value.is_empty() => {
                    settings.weather_api_key = Some(value.to_string());
                }
                KEY_LOCATION_NAME if !value.is_empty() => {
                    settings.display_location_name = value.to_string();
                }
                _ => {}
            }
        }

        settings
    }

    pub fn geocoding_enabled(&self) -> bool {
        self.weather_api_key.is_some()
    }
}

/// Source of the settings snapshot. Called once at the start of every run.
pub trait SettingsReader: Send + Sync {
    fn read(&self) -> Settings;
}

/// Reads the flat JSON object the configuration page persists, e.g.
/// `{"UNITS": "F", "OWM_API_KEY": "...", "LOCATION_NAME": "Home"}`.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `settings.json` in the platform config directory.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-bridge", "weather-bridge")
            .ok_or_else(|| anyhow::anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("settings.json"))
    }

    fn load(&self) -> Result<Settings, String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", self.path.display())),
        };

        // The page writes `null` before anything was saved.
        let raw: Option<HashMap<String, Value>> = serde_json::from_str(&contents)
            .map_err(|e| format!("failed to parse {}: {e}", self.path.display()))?;

        let raw = raw.unwrap_or_default();
        let pairs = raw
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)));

        Ok(Settings::from_pairs(pairs))
    }
}

impl SettingsReader for JsonFileSettings {
    fn read(&self) -> Settings {
        match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring saved settings, using defaults: {e}");
                Settings::default()
            }
        }
    }
}

/// In-memory key/value snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: HashMap<String, String>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl SettingsReader for StaticSettings {
    fn read(&self) -> Settings {
        Settings::from_pairs(self.values.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_snapshot_uses_defaults() {
        let settings = StaticSettings::new().read();

        assert_eq!(settings.units, Units::Metric);
        assert_eq!(settings.weather_api_key, None);
        assert_eq!(settings.display_location_name, "My Location");
        assert!(!settings.geocoding_enabled());
    }

    #[test]
    fn only_capital_f_selects_imperial() {
        let f = StaticSettings::new().with(KEY_UNITS, "F").read();
        assert_eq!(f.units, Units::Imperial);

        for other in ["C", "f", "fahrenheit", ""] {
            let s = StaticSettings::new().with(KEY_UNITS, other).read();
            assert_eq!(s.units, Units::Metric, "UNITS={other:?}");
        }
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let settings = StaticSettings::new()
            .with(KEY_API_KEY, "")
            .with(KEY_LOCATION_NAME, "")
            .read();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn api_key_and_name_are_kept() {
        let settings = StaticSettings::new()
            .with(KEY_API_KEY, "KEY")
            .with(KEY_LOCATION_NAME, "Home")
            .read();

        assert_eq!(settings.weather_api_key.as_deref(), Some("KEY"));
        assert_eq!(settings.display_location_name, "Home");
        assert!(settings.geocoding_enabled());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let reader = JsonFileSettings::new(dir.path().join("settings.json"));

        assert_eq!(reader.read(), Settings::default());
    }

    #[test]
    fn reads_saved_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"UNITS":"F","OWM_API_KEY":"abc","LOCATION_NAME":"Cabin","UPDATE_INTERVAL":30}}"#
        )
        .unwrap();

        let settings = JsonFileSettings::new(&path).read();

        assert_eq!(settings.units, Units::Imperial);
        assert_eq!(settings.weather_api_key.as_deref(), Some("abc"));
        assert_eq!(settings.display_location_name, "Cabin");
    }

    #[test]
    fn null_or_garbage_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, "null").unwrap();
        assert_eq!(JsonFileSettings::new(&path).read(), Settings::default());

        fs::write(&path, "{not json").unwrap();
        assert_eq!(JsonFileSettings::new(&path).read(), Settings::default());
    }

    #[test]
    fn reread_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let reader = JsonFileSettings::new(&path);

        fs::write(&path, r#"{"LOCATION_NAME":"First"}"#).unwrap();
        assert_eq!(reader.read().display_location_name, "First");

        fs::write(&path, r#"{"LOCATION_NAME":"Second"}"#).unwrap();
        assert_eq!(reader.read().display_location_name, "Second");
    }
}
