//! The audio output capability the engine plays through.
//!
//! The engine never waits on playback. It issues `load`/`play`/`pause` calls
//! and polls `take_ended` once per tick to learn that a sound finished on its
//! own. Hosts plug in a real device; `MemoryOutput` records the calls and is
//! used for headless runs and tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// The host refused playback, e.g. autonomous playback is blocked.
    #[error("the audio output refused to play: {0}")]
    Denied(String),
    #[error("could not load audio source '{0}'")]
    Load(String),
    #[error("no audio source is loaded")]
    NoSource,
}

/// A single playback channel.
pub trait AudioOutput: Send + Sync {
    /// Replaces the current source. Playback is not started.
    fn load(&mut self, source: &str) -> Result<(), AudioError>;

    /// Starts (or resumes) the loaded source.
    fn play(&mut self) -> Result<(), AudioError>;

    fn pause(&mut self);

    /// Rewinds the loaded source to its beginning.
    fn reset_position(&mut self);

    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    /// Returns `true` exactly once after the source played to its end.
    fn take_ended(&mut self) -> bool;
}

/// A call made against a `MemoryOutput`.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Load(String),
    Play,
    Pause,
    ResetPosition,
    SetVolume(f32),
}

#[derive(Debug)]
struct MemoryState {
    calls: Vec<AudioCall>,
    source: Option<String>,
    playing: bool,
    volume: f32,
    deny: Option<String>,
    ended: bool,
}

/// An output with no device behind it.
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another.
#[derive(Debug, Clone)]
pub struct MemoryOutput {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                calls: Vec::new(),
                source: None,
                playing: false,
                volume: 1.0,
                deny: None,
                ended: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every following `play` fail with `AudioError::Denied`.
    pub fn deny_playback(&self, reason: impl Into<String>) {
        self.lock().deny = Some(reason.into());
    }

    pub fn allow_playback(&self) {
        self.lock().deny = None;
    }

    /// Simulates the current source reaching its end.
    pub fn finish(&self) {
        let mut state = self.lock();
        if state.playing {
            state.playing = false;
            state.ended = true;
        }
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of `play` calls made so far, successful or not.
    pub fn play_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == AudioCall::Play)
            .count()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn source(&self) -> Option<String> {
        self.lock().source.clone()
    }
}

impl AudioOutput for MemoryOutput {
    fn load(&mut self, source: &str) -> Result<(), AudioError> {
        let mut state = self.lock();
        state.calls.push(AudioCall::Load(source.to_string()));
        if source.trim().is_empty() {
            return Err(AudioError::Load(source.to_string()));
        }
        trace!(source, "memory output loaded source");
        state.source = Some(source.to_string());
        state.playing = false;
        state.ended = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let mut state = self.lock();
        state.calls.push(AudioCall::Play);
        if let Some(reason) = state.deny.clone() {
            return Err(AudioError::Denied(reason));
        }
        if state.source.is_none() {
            return Err(AudioError::NoSource);
        }
        state.playing = true;
        state.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        state.calls.push(AudioCall::Pause);
        state.playing = false;
    }

    fn reset_position(&mut self) {
        self.lock().calls.push(AudioCall::ResetPosition);
    }

    fn set_volume(&mut self, volume: f32) {
        let mut state = self.lock();
        state.calls.push(AudioCall::SetVolume(volume));
        state.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.lock().volume
    }

    fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.lock().ended)
    }
}
