//! The scheduling core: everything the engine decides on a tick or a user
//! intent, with no clock and no runtime of its own.
//!
//! `tick` is given one frozen clock reading and evaluates, in order:
//! natural-end notifications from both audio channels, the next-prayer
//! resolver, and the trigger check. Every intent that takes alerts away
//! (disable, sign-out, a preview) stops a sounding alert in the same call.

use crate::arbiter::AlertArbiter;
use crate::audio::AudioOutput;
use crate::common::{PrayerName, SoundIndex};
use crate::config::SoundConfig;
use crate::countdown::Countdown;
use crate::error::{AdhanError, Result};
use crate::events::{AlertEvent, EventBus, PreviewEvent, StopReason, SystemEvent};
use crate::preview::{PreviewChange, PreviewChannel};
use crate::resolver::{resolve, NextPrayer};
use crate::session::{Session, UserProfile};
use crate::timetable::{DailyTimetable, Timetable};
use crate::trigger::{FiringGate, TriggerDeduplicator};
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info, trace, warn};

/// What the shared audio output is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Alerting,
    Previewing(SoundIndex),
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSnapshot {
    pub now: DateTime<Tz>,
    /// `None` while no timetable is loaded.
    pub next: Option<NextPrayer>,
    pub countdown: Option<Countdown>,
    pub playback: PlaybackState,
    pub alerts_enabled: bool,
    pub signed_in: bool,
}

impl ScheduleSnapshot {
    pub fn alert_active(&self) -> bool {
        self.playback == PlaybackState::Alerting
    }
}

pub struct Scheduler {
    bus: EventBus,
    sounds: Vec<SoundConfig>,
    selected_sound: SoundIndex,
    daily: Option<DailyTimetable>,
    alerts_enabled: bool,
    session: Session,
    trigger: TriggerDeduplicator,
    arbiter: AlertArbiter,
    preview: PreviewChannel,
}

impl Scheduler {
    /// Creates a scheduler with alerts off, nobody signed in and no
    /// timetable.
    ///
    /// # Errors
    /// `UnknownSound` if `selected_sound` is not in `sounds`.
    pub fn new(
        bus: EventBus,
        sounds: Vec<SoundConfig>,
        selected_sound: SoundIndex,
        alert_output: Box<dyn AudioOutput>,
        preview_output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        if selected_sound >= sounds.len() {
            return Err(AdhanError::UnknownSound {
                index: selected_sound,
                available: sounds.len(),
            });
        }
        Ok(Self {
            bus,
            sounds,
            selected_sound,
            daily: None,
            alerts_enabled: false,
            session: Session::default(),
            trigger: TriggerDeduplicator::new(),
            arbiter: AlertArbiter::new(alert_output),
            preview: PreviewChannel::new(preview_output),
        })
    }

    // --- Tick ---

    /// Runs one tick against a single clock reading.
    pub fn tick(&mut self, now: &DateTime<Tz>) -> ScheduleSnapshot {
        if self.arbiter.poll_ended() {
            info!("Alert finished playing.");
            self.bus.alert(AlertEvent::AlertStopped {
                reason: StopReason::Finished,
            });
        }
        if let Some(sound) = self.preview.poll_ended() {
            debug!(sound, "Preview finished playing.");
            self.bus.preview(PreviewEvent::Stopped { sound });
        }

        if let Some(daily) = &self.daily {
            let gate = self.firing_gate();
            if let Some(prayer) = self.trigger.check(now, &daily.timetable, gate) {
                self.fire(prayer);
            }
        }

        let snapshot = self.snapshot(now);
        trace!(
            next = ?snapshot.next.as_ref().map(|n| n.name),
            countdown = ?snapshot.countdown.map(|c| c.to_string()),
            "Tick evaluated."
        );
        snapshot
    }

    /// The derived state at `now`, without changing anything.
    pub fn snapshot(&self, now: &DateTime<Tz>) -> ScheduleSnapshot {
        let next = self.timetable().map(|timetable| resolve(now, timetable));
        let countdown = next.as_ref().map(|next| next.countdown(now));
        ScheduleSnapshot {
            now: *now,
            next,
            countdown,
            playback: self.playback_state(),
            alerts_enabled: self.alerts_enabled,
            signed_in: self.session.is_signed_in(),
        }
    }

    fn firing_gate(&self) -> FiringGate {
        FiringGate {
            alerts_enabled: self.alerts_enabled,
            signed_in: self.session.is_signed_in(),
            alerting: self.arbiter.is_alerting(),
            previewing: self.preview.is_active(),
        }
    }

    fn fire(&mut self, prayer: PrayerName) {
        let minute = self.trigger.last_fired().unwrap_or_default().to_string();
        let sound = &self.sounds[self.selected_sound];
        match self.arbiter.start(sound) {
            Ok(()) => {
                info!(%prayer, %minute, sound = %sound.name, "Adhan alert fired.");
                self.bus.alert(AlertEvent::AlertStarted {
                    prayer,
                    sound: self.selected_sound,
                    minute,
                });
            }
            Err(e) => {
                warn!(%prayer, error = %e, "Adhan alert could not play.");
                self.bus.alert(AlertEvent::PlaybackDenied {
                    prayer,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn stop_alert_for(&mut self, reason: StopReason) -> bool {
        let stopped = self.arbiter.stop();
        if stopped {
            info!(?reason, "Alert stopped.");
            self.bus.alert(AlertEvent::AlertStopped { reason });
        }
        stopped
    }

    // --- Session ---

    pub fn sign_in(&mut self, profile: UserProfile) {
        info!(user = %profile.email, "Signed in.");
        self.session.sign_in(profile);
        self.bus.system(SystemEvent::SessionChanged { signed_in: true });
    }

    /// Signs out, switches alerts off and silences any alert, whatever the
    /// previous state of the flag.
    pub fn sign_out(&mut self) {
        let user = self.session.sign_out();
        self.stop_alert_for(StopReason::SignedOut);
        if std::mem::take(&mut self.alerts_enabled) {
            self.bus.alert(AlertEvent::EnabledChanged { enabled: false });
        }
        if let Some(user) = user {
            info!(user = %user.email, "Signed out.");
            self.bus.system(SystemEvent::SessionChanged { signed_in: false });
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_signed_in()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session.user()
    }

    // --- Alerts ---

    /// Switches alerts on or off.
    ///
    /// Turning them on requires a session and arms the alert channel.
    /// Turning them off stops a sounding alert.
    pub fn set_alerts_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled && !self.session.is_signed_in() {
            return Err(AdhanError::NotSignedIn);
        }
        if enabled == self.alerts_enabled {
            return Ok(());
        }
        self.alerts_enabled = enabled;
        if enabled {
            self.arbiter.arm(&self.sounds[self.selected_sound]);
        } else {
            self.stop_alert_for(StopReason::Disabled);
        }
        info!(enabled, "Adhan alerts toggled.");
        self.bus.alert(AlertEvent::EnabledChanged { enabled });
        Ok(())
    }

    /// Flips the alert flag and returns the new value.
    pub fn toggle_alerts(&mut self) -> Result<bool> {
        let enabled = !self.alerts_enabled;
        self.set_alerts_enabled(enabled)?;
        Ok(enabled)
    }

    pub fn alerts_enabled(&self) -> bool {
        self.alerts_enabled
    }

    /// Stops a sounding alert at the user's request.
    pub fn stop_alert(&mut self) -> bool {
        self.stop_alert_for(StopReason::Manual)
    }

    /// The minute label of the last fired alert.
    pub fn last_triggered(&self) -> Option<&str> {
        self.trigger.last_fired()
    }

    // --- Sounds ---

    pub fn sounds(&self) -> &[SoundConfig] {
        &self.sounds
    }

    pub fn selected_sound(&self) -> SoundIndex {
        self.selected_sound
    }

    fn sound(&self, index: SoundIndex) -> Result<&SoundConfig> {
        self.sounds.get(index).ok_or(AdhanError::UnknownSound {
            index,
            available: self.sounds.len(),
        })
    }

    /// Makes `index` the sound for future alerts. If that sound is the one
    /// previewing, the preview stops.
    pub fn select_sound(&mut self, index: SoundIndex) -> Result<()> {
        self.sound(index)?;
        self.selected_sound = index;
        if self.preview.current() == Some(index) {
            self.preview.stop();
            self.bus.preview(PreviewEvent::Stopped { sound: index });
        }
        info!(sound = %self.sounds[index].name, "Alert sound selected.");
        Ok(())
    }

    /// Starts, switches or stops the preview of `index`.
    ///
    /// A preview that starts playing stops a sounding alert: both share
    /// one speaker and the preview is the user's explicit choice. A preview
    /// that fails to play leaves the alert alone.
    pub fn preview_sound(&mut self, index: SoundIndex) -> Result<Option<SoundIndex>> {
        let sound = self.sound(index)?.clone();
        let displaced = self.preview.current();
        match self.preview.toggle(index, &sound) {
            Ok(PreviewChange::Started(sound)) => {
                self.stop_alert_for(StopReason::PreviewOverride);
                self.bus.preview(PreviewEvent::Started { sound });
            }
            Ok(PreviewChange::Switched { from, to }) => {
                self.stop_alert_for(StopReason::PreviewOverride);
                self.bus.preview(PreviewEvent::Stopped { sound: from });
                self.bus.preview(PreviewEvent::Started { sound: to });
            }
            Ok(PreviewChange::Stopped(sound)) => {
                self.bus.preview(PreviewEvent::Stopped { sound });
            }
            Err(e) => {
                warn!(sound = %sound.name, error = %e, "Preview could not play.");
                // The channel dropped the old preview before trying the new one.
                if let Some(from) = displaced {
                    self.bus.preview(PreviewEvent::Stopped { sound: from });
                }
                return Err(e.into());
            }
        }
        Ok(self.preview.current())
    }

    pub fn stop_preview(&mut self) -> Option<SoundIndex> {
        let stopped = self.preview.stop()?;
        self.bus.preview(PreviewEvent::Stopped { sound: stopped });
        Some(stopped)
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.arbiter.is_alerting() {
            PlaybackState::Alerting
        } else if let Some(index) = self.preview.current() {
            PlaybackState::Previewing(index)
        } else {
            PlaybackState::Idle
        }
    }

    // --- Timetable ---

    /// Replaces the timetable wholesale.
    pub fn load_timetable(&mut self, daily: DailyTimetable) {
        let location = daily.location.as_ref().map(|l| l.to_string());
        info!(location = ?location, "Timetable loaded.");
        self.daily = Some(daily);
        self.bus.system(SystemEvent::TimetableLoaded { location });
    }

    /// Drops the timetable. Countdown and alerts stay off until the next
    /// `load_timetable`.
    pub fn clear_timetable(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "Timetable unavailable.");
        self.daily = None;
        self.bus.system(SystemEvent::TimetableUnavailable { reason });
    }

    pub fn timetable(&self) -> Option<&Timetable> {
        self.daily.as_ref().map(|daily| &daily.timetable)
    }

    pub fn daily(&self) -> Option<&DailyTimetable> {
        self.daily.as_ref()
    }

    /// Silences both channels on teardown.
    pub fn shutdown(&mut self) {
        self.stop_alert_for(StopReason::EngineShutdown);
        self.stop_preview();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MemoryOutput;
    use crate::config::AdhanConfig;
    use chrono::TimeZone;

    struct Fixture {
        scheduler: Scheduler,
        alert: MemoryOutput,
        preview: MemoryOutput,
        bus: EventBus,
    }

    fn fixture() -> Fixture {
        let bus = EventBus::new();
        let alert = MemoryOutput::new();
        let preview = MemoryOutput::new();
        let scheduler = Scheduler::new(
            bus.clone(),
            AdhanConfig::default().sounds,
            0,
            Box::new(alert.clone()),
            Box::new(preview.clone()),
        )
        .unwrap();
        Fixture {
            scheduler,
            alert,
            preview,
            bus,
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: "Abdullah Rahman".into(),
            email: "abdullah@example.org".into(),
            avatar: None,
        }
    }

    fn day() -> DailyTimetable {
        Timetable::from_entries([
            ("Fajr", "05:00"),
            ("Sunrise", "06:20"),
            ("Dhuhr", "12:30"),
            ("Asr", "15:45"),
            ("Maghrib", "18:30"),
            ("Isha", "20:00"),
        ])
        .unwrap()
        .into()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2026, 6, 1, h, m, s).unwrap()
    }

    fn armed() -> Fixture {
        let mut f = fixture();
        f.scheduler.load_timetable(day());
        f.scheduler.sign_in(profile());
        f.scheduler.set_alerts_enabled(true).unwrap();
        f.alert.clear_calls();
        f
    }

    #[test]
    fn enabling_requires_a_session() {
        let mut f = fixture();
        assert!(matches!(
            f.scheduler.set_alerts_enabled(true),
            Err(AdhanError::NotSignedIn)
        ));
        assert!(!f.scheduler.alerts_enabled());
        f.scheduler.sign_in(profile());
        assert!(f.scheduler.toggle_alerts().unwrap());
    }

    #[test]
    fn enabling_arms_the_alert_channel_silently() {
        let mut f = fixture();
        f.scheduler.sign_in(profile());
        f.scheduler.set_alerts_enabled(true).unwrap();
        assert_eq!(f.alert.play_count(), 1);
        assert!(!f.alert.is_playing());
        assert_eq!(f.alert.volume(), 1.0);
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Idle);
    }

    #[test]
    fn fires_once_at_the_start_of_the_matching_minute() {
        let mut f = armed();
        let mut alerts = f.bus.subscribe_alert();
        for s in 0..60 {
            f.scheduler.tick(&at(12, 30, s));
            if s == 0 {
                assert_eq!(f.scheduler.playback_state(), PlaybackState::Alerting);
            }
            // The user silences it straight away; the minute must not refire.
            f.scheduler.stop_alert();
        }
        assert_eq!(f.alert.play_count(), 1);
        assert_eq!(f.scheduler.last_triggered(), Some("12:30"));
        assert_eq!(
            alerts.try_recv().unwrap(),
            AlertEvent::AlertStarted {
                prayer: PrayerName::Dhuhr,
                sound: 0,
                minute: "12:30".into()
            }
        );
    }

    #[test]
    fn no_timetable_means_no_countdown_and_no_fire() {
        let mut f = armed();
        f.scheduler.clear_timetable("fetch failed");
        let snapshot = f.scheduler.tick(&at(12, 30, 0));
        assert_eq!(snapshot.next, None);
        assert_eq!(snapshot.countdown, None);
        assert_eq!(f.alert.play_count(), 0);
    }

    #[test]
    fn preview_suppresses_the_whole_minute() {
        let mut f = armed();
        f.scheduler.preview_sound(2).unwrap();
        for s in 0..60 {
            f.scheduler.tick(&at(12, 30, s));
        }
        assert_eq!(f.alert.play_count(), 0);
        assert_eq!(f.scheduler.last_triggered(), None);
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Previewing(2));
    }

    #[test]
    fn denied_playback_stays_idle_and_spends_the_minute() {
        let mut f = armed();
        f.alert.deny_playback("autoplay blocked");
        let mut alerts = f.bus.subscribe_alert();
        f.scheduler.tick(&at(12, 30, 0));
        f.alert.allow_playback();
        f.scheduler.tick(&at(12, 30, 1));
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Idle);
        assert_eq!(f.alert.play_count(), 1);
        assert!(matches!(
            alerts.try_recv().unwrap(),
            AlertEvent::PlaybackDenied {
                prayer: PrayerName::Dhuhr,
                ..
            }
        ));
    }

    #[test]
    fn sign_out_forces_idle_and_disables() {
        let mut f = armed();
        f.scheduler.tick(&at(12, 30, 0));
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Alerting);
        f.scheduler.sign_out();
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Idle);
        assert!(!f.scheduler.alerts_enabled());
        assert!(!f.alert.is_playing());
    }

    #[test]
    fn disabling_stops_a_sounding_alert() {
        let mut f = armed();
        let mut alerts = f.bus.subscribe_alert();
        f.scheduler.tick(&at(15, 45, 0));
        f.scheduler.set_alerts_enabled(false).unwrap();
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Idle);
        let events: Vec<_> = std::iter::from_fn(|| alerts.try_recv().ok()).collect();
        assert!(events.contains(&AlertEvent::AlertStopped {
            reason: StopReason::Disabled
        }));
        assert!(events.contains(&AlertEvent::EnabledChanged { enabled: false }));
    }

    #[test]
    fn natural_end_returns_to_idle_on_the_next_tick() {
        let mut f = armed();
        f.scheduler.tick(&at(18, 30, 0));
        f.alert.finish();
        let snapshot = f.scheduler.tick(&at(18, 30, 1));
        assert!(!snapshot.alert_active());
        // Same minute: the memory still blocks a second fire.
        assert_eq!(f.alert.play_count(), 1);
    }

    #[test]
    fn preview_takes_over_from_a_sounding_alert() {
        let mut f = armed();
        f.scheduler.tick(&at(20, 0, 0));
        f.scheduler.preview_sound(1).unwrap();
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Previewing(1));
        assert!(!f.alert.is_playing());
        assert!(f.preview.is_playing());
    }

    #[test]
    fn selecting_the_previewing_sound_stops_its_preview() {
        let mut f = armed();
        f.scheduler.preview_sound(3).unwrap();
        f.scheduler.select_sound(1).unwrap();
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Previewing(3));
        f.scheduler.select_sound(3).unwrap();
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Idle);
        assert_eq!(f.scheduler.selected_sound(), 3);
        assert!(matches!(
            f.scheduler.select_sound(9),
            Err(AdhanError::UnknownSound { index: 9, .. })
        ));
    }

    #[test]
    fn finished_preview_lets_alerts_fire_again() {
        let mut f = armed();
        f.scheduler.preview_sound(0).unwrap();
        f.scheduler.tick(&at(12, 30, 0));
        f.preview.finish();
        f.scheduler.tick(&at(12, 30, 1));
        assert_eq!(f.alert.play_count(), 1);
        assert_eq!(f.scheduler.playback_state(), PlaybackState::Alerting);
    }

    #[test]
    fn fired_alert_uses_the_selected_sound() {
        let mut f = armed();
        f.scheduler.select_sound(4).unwrap();
        f.scheduler.tick(&at(5, 0, 0));
        assert_eq!(f.alert.source().as_deref(), Some(f.scheduler.sounds()[4].source.as_str()));
    }
}
