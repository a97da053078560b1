//! A terminal "speaker" for the shell.
//!
//! There is no audio device behind it: playing a source rings the terminal
//! bell and prints what would be heard, and the source "ends" after a fixed
//! length of wall-clock play time.

use adhanclock::audio::{AudioError, AudioOutput};
use colored::Colorize;
use std::io::Write;
use std::time::{Duration, Instant};

pub struct BellOutput {
    label: &'static str,
    length: Duration,
    source: Option<String>,
    volume: f32,
    /// Play time accumulated before the current `play`.
    played: Duration,
    started: Option<Instant>,
}

impl BellOutput {
    pub fn new(label: &'static str, length: Duration) -> Self {
        Self {
            label,
            length,
            source: None,
            volume: 1.0,
            played: Duration::ZERO,
            started: None,
        }
    }

    fn position(&self) -> Duration {
        self.played + self.started.map_or(Duration::ZERO, |at| at.elapsed())
    }
}

impl AudioOutput for BellOutput {
    fn load(&mut self, source: &str) -> Result<(), AudioError> {
        if source.trim().is_empty() {
            return Err(AudioError::Load(source.to_string()));
        }
        self.source = Some(source.to_string());
        self.played = Duration::ZERO;
        self.started = None;
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let source = self.source.as_deref().ok_or(AudioError::NoSource)?;
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        // Muted plays are the unlock dance; stay quiet.
        if self.volume > 0.0 {
            print!("\x07");
            println!("\n<-- [{}] ♪ {}", self.label, source.green());
            std::io::stdout().flush().ok();
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(at) = self.started.take() {
            self.played += at.elapsed();
        }
    }

    fn reset_position(&mut self) {
        self.played = Duration::ZERO;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn take_ended(&mut self) -> bool {
        if self.started.is_some() && self.position() >= self.length {
            self.started = None;
            self.played = Duration::ZERO;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_once_after_its_length() {
        let mut bell = BellOutput::new("TEST", Duration::ZERO);
        assert!(!bell.take_ended());
        bell.set_volume(0.0);
        bell.load("adhan.mp3").unwrap();
        bell.play().unwrap();
        assert!(bell.take_ended());
        assert!(!bell.take_ended());
    }

    #[test]
    fn paused_sources_never_end() {
        let mut bell = BellOutput::new("TEST", Duration::ZERO);
        bell.set_volume(0.0);
        bell.load("adhan.mp3").unwrap();
        bell.play().unwrap();
        bell.pause();
        bell.reset_position();
        assert!(!bell.take_ended());
    }

    #[test]
    fn play_needs_a_source() {
        let mut bell = BellOutput::new("TEST", Duration::from_secs(1));
        assert_eq!(bell.play(), Err(AudioError::NoSource));
        assert_eq!(bell.load(" "), Err(AudioError::Load(" ".into())));
    }
}
