//! Error types for the Adhanclock engine.
//!
//! None of these are fatal. The engine converts every failure into a no-op
//! state (no countdown, no alert) and reports it through the return value or
//! the event bus.

use crate::audio::AudioError;
use crate::common::{PrayerName, SoundIndex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdhanError {
    /// No valid timetable is loaded, so neither the countdown nor the alert
    /// check can run.
    #[error("no prayer timetable is loaded")]
    MissingTimetable,

    /// A timetable entry was absent or not a valid 24-hour `HH:MM` time.
    #[error("malformed timetable: {prayer} {detail}")]
    MalformedTimetable { prayer: PrayerName, detail: String },

    /// The audio output refused to start playback.
    #[error("playback denied: {0}")]
    PlaybackDenied(#[from] AudioError),

    /// The action is only available to a signed-in user.
    #[error("this action requires a signed-in session")]
    NotSignedIn,

    #[error("unknown sound #{index} (the catalogue has {available})")]
    UnknownSound { index: SoundIndex, available: usize },

    /// The timetable service answered, but not with a usable day.
    #[error("timetable provider error: {0}")]
    Provider(String),

    #[error("timetable request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = AdhanError> = std::result::Result<T, E>;
