//! Defines all public event types broadcast by the Adhanclock engine.
//!
//! This module is the public face of the engine's event system. Renderers
//! subscribe to these strongly-typed streams instead of polling the engine.

use crate::common::{PrayerName, SoundIndex};
use crate::scheduler::ScheduleSnapshot;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tokio::sync::broadcast;

/// Events related to the lifecycle and inputs of the engine itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemEvent {
    /// Fired once when the engine's run loop begins.
    EngineStarted { timestamp: DateTime<Tz> },
    /// Fired once when the engine's run loop is about to exit.
    EngineShutdown,
    /// A new timetable replaced the previous one.
    TimetableLoaded { location: Option<String> },
    /// The timetable was dropped; no countdown and no alerts until the next
    /// successful fetch.
    TimetableUnavailable { reason: String },
    SessionChanged { signed_in: bool },
}

/// Why an alert stopped sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The sound played to its end.
    Finished,
    /// The user pressed stop.
    Manual,
    /// Alerts were switched off.
    Disabled,
    SignedOut,
    /// The user started a preview, which takes the shared output.
    PreviewOverride,
    EngineShutdown,
}

/// Events from the alert channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    EnabledChanged { enabled: bool },
    /// The "alert active" signal.
    AlertStarted {
        prayer: PrayerName,
        sound: SoundIndex,
        minute: String,
    },
    AlertStopped { reason: StopReason },
    /// The prayer matched but the output refused to play. The minute is
    /// still spent.
    PlaybackDenied { prayer: PrayerName, reason: String },
}

/// Events from the preview channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewEvent {
    Started { sound: SoundIndex },
    Stopped { sound: SoundIndex },
}

/// The derived display state, published once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEvent {
    pub tick_count: u64,
    pub snapshot: ScheduleSnapshot,
}

/// Calendar events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEvent {
    /// Fired once when the local calendar date changes.
    DateChanged { new_date: NaiveDate },
}

/// The set of broadcast senders, one per event category.
#[derive(Debug, Clone)]
pub struct EventBus {
    pub(crate) system: broadcast::Sender<SystemEvent>,
    pub(crate) alert: broadcast::Sender<AlertEvent>,
    pub(crate) preview: broadcast::Sender<PreviewEvent>,
    pub(crate) schedule: broadcast::Sender<ScheduleEvent>,
    pub(crate) day: broadcast::Sender<DayEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (system, _) = broadcast::channel(64);
        let (alert, _) = broadcast::channel(64);
        let (preview, _) = broadcast::channel(64);
        let (schedule, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (day, _) = broadcast::channel(16);
        Self {
            system,
            alert,
            preview,
            schedule,
            day,
        }
    }

    // Sends are fire-and-forget: no subscriber is not an error.

    pub(crate) fn system(&self, event: SystemEvent) {
        self.system.send(event).ok();
    }

    pub(crate) fn alert(&self, event: AlertEvent) {
        self.alert.send(event).ok();
    }

    pub(crate) fn preview(&self, event: PreviewEvent) {
        self.preview.send(event).ok();
    }

    pub fn subscribe_system(&self) -> broadcast::Receiver<SystemEvent> {
        self.system.subscribe()
    }

    pub fn subscribe_alert(&self) -> broadcast::Receiver<AlertEvent> {
        self.alert.subscribe()
    }

    pub fn subscribe_preview(&self) -> broadcast::Receiver<PreviewEvent> {
        self.preview.subscribe()
    }

    pub fn subscribe_schedule(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.schedule.subscribe()
    }

    pub fn subscribe_day(&self) -> broadcast::Receiver<DayEvent> {
        self.day.subscribe()
    }
}
