//! Settings management

use mosaic_core::time::TICK_RATE_HZ;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write settings to '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings are not valid JSON")]
    Parse(#[from] serde_json::Error),

    #[error("unknown log level '{value}'")]
    InvalidLogLevel { value: String },
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub log_level: String,
    pub simulation: SimulationSettings,
    pub demo: DemoSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_rate_hz: u32,
    /// Stop after this many ticks; `None` runs until the process is killed.
    pub max_ticks: Option<u64>,
    /// Pace ticks against the wall clock instead of running flat out.
    pub realtime: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub actors: u32,
    /// Every n-th actor spawns frozen; 0 disables freezing.
    pub frozen_every: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            simulation: SimulationSettings::default(),
            demo: DemoSettings::default(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            max_ticks: Some(600),
            realtime: false,
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            actors: 8,
            frozen_every: 3,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Like `load`, but a missing file yields the defaults. A file that exists
    /// and fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(SettingsError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn level(&self) -> Result<tracing::Level, SettingsError> {
        self.log_level
            .parse()
            .map_err(|_| SettingsError::InvalidLogLevel {
                value: self.log_level.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mosaic-settings-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings = Settings::from_json(r#"{ "simulation": { "tick_rate_hz": 30 } }"#).unwrap();
        assert_eq!(settings.simulation.tick_rate_hz, 30);
        assert_eq!(settings.simulation.max_ticks, Some(600));
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.demo, DemoSettings::default());
    }

    #[test]
    fn max_ticks_can_be_unbounded() {
        let settings = Settings::from_json(r#"{ "simulation": { "max_ticks": null } }"#).unwrap();
        assert_eq!(settings.simulation.max_ticks, None);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Settings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn log_level_parses() {
        let mut settings = Settings::default();
        assert_eq!(settings.level().unwrap(), tracing::Level::INFO);

        settings.log_level = "DEBUG".to_string();
        assert_eq!(settings.level().unwrap(), tracing::Level::DEBUG);

        settings.log_level = "chatty".to_string();
        assert!(matches!(settings.level(), Err(SettingsError::InvalidLogLevel { .. })));
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let mut settings = Settings::default();
        settings.demo.actors = 42;
        settings.simulation.realtime = true;

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_or_default_tolerates_a_missing_file() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);

        assert_eq!(Settings::load_or_default(&path).unwrap(), Settings::default());
        assert!(matches!(Settings::load(&path), Err(SettingsError::Read { .. })));
    }

    #[test]
    fn load_or_default_still_rejects_bad_files() {
        let path = temp_path("corrupt");
        fs::write(&path, "[1, 2").unwrap();
        let result = Settings::load_or_default(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }
}
