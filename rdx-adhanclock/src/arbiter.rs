//! The alert playback arbiter.
//!
//! Owns the one channel scheduled alerts play on. The state machine is
//! `Idle -> Alerting -> Idle`: `start` while alerting and `stop` while idle
//! are both no-ops.

use crate::audio::{AudioError, AudioOutput};
use crate::config::SoundConfig;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Alerting,
}

pub struct AlertArbiter {
    output: Box<dyn AudioOutput>,
    state: AlertState,
}

impl AlertArbiter {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            state: AlertState::Idle,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn is_alerting(&self) -> bool {
        self.state == AlertState::Alerting
    }

    /// Plays `sound` from its beginning.
    ///
    /// On failure the arbiter stays `Idle` and the error is handed back to
    /// the caller to log.
    pub fn start(&mut self, sound: &SoundConfig) -> Result<(), AudioError> {
        if self.is_alerting() {
            return Ok(());
        }
        self.output.load(&sound.source)?;
        self.output.reset_position();
        if let Err(e) = self.output.play() {
            self.output.reset_position();
            return Err(e);
        }
        self.state = AlertState::Alerting;
        info!(sound = %sound.name, "Alert playback started.");
        Ok(())
    }

    /// Halts playback and rewinds. Returns `true` if an alert was sounding.
    pub fn stop(&mut self) -> bool {
        if !self.is_alerting() {
            return false;
        }
        self.output.pause();
        self.output.reset_position();
        self.state = AlertState::Idle;
        true
    }

    /// Silent play-then-pause used to unlock autonomous playback when the
    /// user switches alerts on. Best effort: failures are only logged.
    pub fn arm(&mut self, sound: &SoundConfig) {
        if self.is_alerting() {
            return;
        }
        let volume = self.output.volume();
        self.output.set_volume(0.0);
        let probe = self.output.load(&sound.source).and_then(|()| self.output.play());
        match probe {
            Ok(()) => {
                self.output.pause();
                self.output.reset_position();
                debug!("Alert channel armed.");
            }
            Err(e) => debug!(error = %e, "Arming the alert channel failed; continuing."),
        }
        self.output.set_volume(volume);
    }

    /// Returns to `Idle` if the alert sound finished on its own.
    pub(crate) fn poll_ended(&mut self) -> bool {
        if !self.output.take_ended() || !self.is_alerting() {
            return false;
        }
        self.output.reset_position();
        self.state = AlertState::Idle;
        true
    }
}
