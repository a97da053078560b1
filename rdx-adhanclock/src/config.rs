//! Defines all configuration structures for the Adhanclock engine.
//!
//! These structs are deserialized with `serde` through the `config` crate, so
//! the engine's time zone, tick speed, sound catalogue and timetable source
//! can live in a TOML file and be overridden from the environment
//! (`ADHAN_TIMEZONE=Europe/Istanbul`, `ADHAN_PROVIDER__METHOD=13`, ...).

use crate::common::SoundIndex;
use crate::error::{AdhanError, Result};
use crate::provider::LocationQuery;
use crate::timetable::{DailyTimetable, Timetable};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// The top-level configuration for the `AdhanEngine`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdhanConfig {
    /// The time zone prayer times are read in. Uses IANA names
    /// (e.g., "Asia/Karachi"). Defaults to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Milliseconds between clock ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Default `tracing` filter for the binaries, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// The alert sounds the user can choose from.
    #[serde(default = "default_sounds")]
    pub sounds: Vec<SoundConfig>,

    /// Index into `sounds` used for scheduled alerts.
    #[serde(default)]
    pub selected_sound: SoundIndex,

    #[serde(default)]
    pub provider: ProviderConfig,

    /// Where to fetch the timetable for on startup.
    #[serde(default)]
    pub location: Option<LocationQuery>,

    /// A fixed timetable, e.g. `Fajr = "05:00"`. Used instead of the
    /// provider when present.
    #[serde(default)]
    pub timetable: Option<BTreeMap<String, String>>,
}

/// A named alert sound.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SoundConfig {
    pub name: String,
    /// A URL or path handed to the audio output's `load`.
    pub source: String,
}

/// Settings for the remote timetable service.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// The service's calculation method id.
    #[serde(default = "default_method")]
    pub method: u8,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AdhanConfig {
    /// Loads a TOML file (if given) and then `ADHAN_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        let config: AdhanConfig = builder
            .add_source(
                config::Environment::with_prefix("ADHAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AdhanConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.sounds.is_empty() {
            return Err(AdhanError::InvalidConfig(
                "the sound catalogue is empty".to_string(),
            ));
        }
        if self.selected_sound >= self.sounds.len() {
            return Err(AdhanError::UnknownSound {
                index: self.selected_sound,
                available: self.sounds.len(),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(AdhanError::InvalidConfig(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// The configured fixed timetable, validated.
    pub fn static_timetable(&self) -> Result<Option<DailyTimetable>> {
        self.timetable
            .as_ref()
            .map(|entries| Timetable::from_entries(entries).map(DailyTimetable::from))
            .transpose()
    }
}

impl Default for AdhanConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            tick_interval_ms: default_tick_interval_ms(),
            log_level: default_log_level(),
            sounds: default_sounds(),
            selected_sound: 0,
            provider: ProviderConfig::default(),
            location: None,
            timetable: None,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            method: default_method(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// --- Default value functions for serde ---

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://api.aladhan.com/v1".to_string()
}

fn default_method() -> u8 {
    2
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_sounds() -> Vec<SoundConfig> {
    [
        ("Makkah - Masjid al-Haram", "https://www.islamcan.com/audio/adhan/azan1.mp3"),
        ("Madinah - Masjid an-Nabawi", "https://www.islamcan.com/audio/adhan/azan2.mp3"),
        ("Egypt - Sheikh Abdul Basit", "https://www.islamcan.com/audio/adhan/azan15.mp3"),
        ("Mishary Rashid Alafasy", "https://www.islamcan.com/audio/adhan/azan16.mp3"),
        ("Jerusalem - Masjid al-Aqsa", "https://www.islamcan.com/audio/adhan/azan3.mp3"),
    ]
    .into_iter()
    .map(|(name, source)| SoundConfig {
        name: name.to_string(),
        source: source.to_string(),
    })
    .collect()
}
