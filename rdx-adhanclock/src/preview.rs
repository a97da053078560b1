//! The preview channel, for auditioning sounds from the catalogue.
//!
//! It plays on its own output and never reads or writes trigger memory. While
//! it is active the scheduler does not fire alerts.

use crate::audio::{AudioError, AudioOutput};
use crate::common::SoundIndex;
use crate::config::SoundConfig;

/// What a call to [`PreviewChannel::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewChange {
    Started(SoundIndex),
    /// A different sound was previewing and was replaced.
    Switched { from: SoundIndex, to: SoundIndex },
    Stopped(SoundIndex),
}

pub struct PreviewChannel {
    output: Box<dyn AudioOutput>,
    previewing: Option<SoundIndex>,
}

impl PreviewChannel {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            previewing: None,
        }
    }

    pub fn current(&self) -> Option<SoundIndex> {
        self.previewing
    }

    pub fn is_active(&self) -> bool {
        self.previewing.is_some()
    }

    /// Stops `index` if it is the one previewing, otherwise switches to it
    /// from the beginning.
    pub fn toggle(
        &mut self,
        index: SoundIndex,
        sound: &SoundConfig,
    ) -> Result<PreviewChange, AudioError> {
        if self.previewing == Some(index) {
            self.stop();
            return Ok(PreviewChange::Stopped(index));
        }

        let previous = self.previewing.take();
        if previous.is_some() {
            self.output.pause();
        }
        self.output.load(&sound.source)?;
        self.output.reset_position();
        self.output.play()?;
        self.previewing = Some(index);

        Ok(match previous {
            Some(from) => PreviewChange::Switched { from, to: index },
            None => PreviewChange::Started(index),
        })
    }

    /// Stops whatever is previewing and returns its index.
    pub fn stop(&mut self) -> Option<SoundIndex> {
        let stopped = self.previewing.take()?;
        self.output.pause();
        Some(stopped)
    }

    /// Clears the channel if the preview finished on its own.
    pub(crate) fn poll_ended(&mut self) -> Option<SoundIndex> {
        if self.output.take_ended() {
            self.previewing.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCall, MemoryOutput};

    fn sound(n: usize) -> SoundConfig {
        SoundConfig {
            name: format!("Sound {n}"),
            source: format!("azan{n}.mp3"),
        }
    }

    fn channel() -> (PreviewChannel, MemoryOutput) {
        let output = MemoryOutput::new();
        (PreviewChannel::new(Box::new(output.clone())), output)
    }

    #[test]
    fn toggling_the_same_index_stops_it() {
        let (mut preview, output) = channel();
        assert_eq!(preview.toggle(2, &sound(2)), Ok(PreviewChange::Started(2)));
        assert!(output.is_playing());
        assert_eq!(preview.toggle(2, &sound(2)), Ok(PreviewChange::Stopped(2)));
        assert_eq!(preview.current(), None);
        assert!(!output.is_playing());
    }

    #[test]
    fn another_index_switches_from_the_start() {
        let (mut preview, output) = channel();
        preview.toggle(0, &sound(0)).unwrap();
        output.clear_calls();
        assert_eq!(
            preview.toggle(3, &sound(3)),
            Ok(PreviewChange::Switched { from: 0, to: 3 })
        );
        assert_eq!(preview.current(), Some(3));
        assert_eq!(
            output.calls(),
            vec![
                AudioCall::Pause,
                AudioCall::Load("azan3.mp3".into()),
                AudioCall::ResetPosition,
                AudioCall::Play
            ]
        );
    }

    #[test]
    fn failed_playback_leaves_the_channel_inactive() {
        let (mut preview, output) = channel();
        output.deny_playback("blocked");
        assert!(preview.toggle(1, &sound(1)).is_err());
        assert!(!preview.is_active());
    }

    #[test]
    fn natural_end_clears_the_preview() {
        let (mut preview, output) = channel();
        preview.toggle(4, &sound(4)).unwrap();
        assert_eq!(preview.poll_ended(), None);
        output.finish();
        assert_eq!(preview.poll_ended(), Some(4));
        assert!(!preview.is_active());
    }
}
