//! The core engine that orchestrates the entire Adhanclock system.

use crate::audio::AudioOutput;
use crate::common::SoundIndex;
use crate::components::day_watcher::DayWatcher;
use crate::config::{AdhanConfig, SoundConfig};
use crate::error::{AdhanError, Result};
use crate::events::{
    AlertEvent, DayEvent, EventBus, PreviewEvent, ScheduleEvent, SystemEvent,
};
use crate::provider::{LocationQuery, TimetableProvider};
use crate::scheduler::{PlaybackState, ScheduleSnapshot, Scheduler};
use crate::session::UserProfile;
use crate::time::{now_in, SystemClock, TickEvent};
use crate::timetable::DailyTimetable;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, trace, warn};

/// The main Adhanclock engine.
///
/// This struct is the central point of control. It holds the configuration,
/// owns the scheduler behind a lock, and drives the tick loop. The engine is
/// designed to be cloned and shared across tasks; every clone is a handle to
/// the same running instance.
#[derive(Clone)]
pub struct AdhanEngine {
    config: Arc<AdhanConfig>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
    bus: EventBus,
    scheduler: Arc<RwLock<Scheduler>>,
}

// Core implementation block for internal logic.
impl AdhanEngine {
    /// Creates a new engine that plays alerts on `alert_output` and previews
    /// on `preview_output`.
    ///
    /// A fixed timetable in the configuration is loaded straight away.
    pub fn new(
        config: AdhanConfig,
        alert_output: Box<dyn AudioOutput>,
        preview_output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        config.validate()?;
        let (tick_sender, _) = broadcast::channel(256);
        let bus = EventBus::new();
        let mut scheduler = Scheduler::new(
            bus.clone(),
            config.sounds.clone(),
            config.selected_sound,
            alert_output,
            preview_output,
        )?;
        if let Some(daily) = config.static_timetable()? {
            scheduler.load_timetable(daily);
        }

        Ok(Self {
            config: Arc::new(config),
            tick_sender,
            bus,
            scheduler: Arc::new(RwLock::new(scheduler)),
        })
    }

    /// Runs the engine until Ctrl+C.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await
    }

    /// Runs the engine's main loop until `shutdown` completes.
    ///
    /// This method will:
    /// 1. Spawn the `SystemClock` task.
    /// 2. Spawn the dispatcher task that evaluates every tick.
    /// 3. Wait for `shutdown`, then stop both tasks and silence playback.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        info!("AdhanEngine starting up...");
        let (shutdown_tx, _) = broadcast::channel(1);

        let clock = SystemClock::new(
            self.config.tick_interval(),
            self.config.timezone,
            self.tick_sender.clone(),
        );
        let clock_task = tokio::spawn(clock.run(shutdown_tx.subscribe()));

        let dispatcher = self.clone();
        let tick_rx = self.tick_sender.subscribe();
        let dispatcher_shutdown_rx = shutdown_tx.subscribe();
        let dispatcher_task =
            tokio::spawn(async move { dispatcher.dispatcher_loop(tick_rx, dispatcher_shutdown_rx).await });

        info!(
            "Engine running every {:?} in {}.",
            self.config.tick_interval(),
            self.config.timezone
        );
        shutdown.await;

        info!("Shutdown signal received. Broadcasting to all tasks...");
        if shutdown_tx.send(()).is_err() {
            error!("Failed to send shutdown signal. Some tasks may not terminate gracefully.");
        }
        let (clock_result, dispatcher_result) = tokio::join!(clock_task, dispatcher_task);
        clock_result?;
        dispatcher_result?;

        self.scheduler.write().await.shutdown();
        self.bus.system(SystemEvent::EngineShutdown);
        info!("AdhanEngine has shut down.");
        Ok(())
    }

    #[doc(hidden)]
    async fn dispatcher_loop(
        self,
        mut tick_rx: broadcast::Receiver<Arc<TickEvent>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut day_watcher = DayWatcher::new();
        self.bus.system(SystemEvent::EngineStarted {
            timestamp: now_in(self.config.timezone),
        });
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                tick = tick_rx.recv() => match tick {
                    Ok(tick) => self.process_tick(&tick, &mut day_watcher).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Dispatcher fell behind the clock; ticks skipped.");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    /// Evaluates one tick. The scheduler lock is held for the whole tick, so
    /// user intents land either before or after it, never in between.
    #[doc(hidden)]
    async fn process_tick(&self, tick: &TickEvent, day_watcher: &mut DayWatcher) {
        trace!("Tick #{} received.", tick.tick_count);
        day_watcher.process_tick(tick, &self.bus.day);
        let snapshot = self.scheduler.write().await.tick(&tick.timestamp);
        self.bus
            .schedule
            .send(ScheduleEvent {
                tick_count: tick.tick_count,
                snapshot,
            })
            .ok();
    }
}

// Public API implementation block.
impl AdhanEngine {
    pub fn config(&self) -> &AdhanConfig {
        &self.config
    }

    /// The derived state right now, for renderers that poll.
    pub async fn snapshot(&self) -> ScheduleSnapshot {
        let now = now_in(self.config.timezone);
        self.scheduler.read().await.snapshot(&now)
    }

    pub async fn sign_in(&self, profile: UserProfile) {
        self.scheduler.write().await.sign_in(profile);
    }

    /// Signs out. Alerts are switched off and any sounding alert stops
    /// before this returns.
    pub async fn sign_out(&self) {
        self.scheduler.write().await.sign_out();
    }

    pub async fn signed_in_user(&self) -> Option<UserProfile> {
        self.scheduler.read().await.user().cloned()
    }

    /// Switches alerts on (requires a session) or off (stops any alert).
    pub async fn set_alerts_enabled(&self, enabled: bool) -> Result<()> {
        self.scheduler.write().await.set_alerts_enabled(enabled)
    }

    /// Flips alerts and returns the new state.
    pub async fn toggle_alerts(&self) -> Result<bool> {
        self.scheduler.write().await.toggle_alerts()
    }

    pub async fn alerts_enabled(&self) -> bool {
        self.scheduler.read().await.alerts_enabled()
    }

    /// Stops a sounding alert. Returns `false` if nothing was sounding.
    pub async fn stop_alert(&self) -> bool {
        self.scheduler.write().await.stop_alert()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.scheduler.read().await.playback_state()
    }

    pub fn sounds(&self) -> &[SoundConfig] {
        &self.config.sounds
    }

    pub async fn selected_sound(&self) -> SoundIndex {
        self.scheduler.read().await.selected_sound()
    }

    pub async fn select_sound(&self, index: SoundIndex) -> Result<()> {
        self.scheduler.write().await.select_sound(index)
    }

    /// Toggles the preview of `index`; returns what is previewing afterwards.
    pub async fn preview_sound(&self, index: SoundIndex) -> Result<Option<SoundIndex>> {
        self.scheduler.write().await.preview_sound(index)
    }

    pub async fn stop_preview(&self) -> Option<SoundIndex> {
        self.scheduler.write().await.stop_preview()
    }

    /// Replaces the current timetable.
    pub async fn load_timetable(&self, daily: DailyTimetable) {
        self.scheduler.write().await.load_timetable(daily);
    }

    pub async fn daily_timetable(&self) -> Option<DailyTimetable> {
        self.scheduler.read().await.daily().cloned()
    }

    /// Fetches a timetable and swaps it in.
    ///
    /// The fetch runs without holding the scheduler, so ticks continue
    /// meanwhile. On any failure the current timetable is dropped and the
    /// error is returned for the caller to report.
    pub async fn refresh_timetable<P: TimetableProvider>(
        &self,
        provider: &P,
        query: &LocationQuery,
    ) -> Result<()> {
        match provider.fetch_timetable(query).await {
            Ok(daily) => {
                self.scheduler.write().await.load_timetable(daily);
                Ok(())
            }
            Err(e) => {
                self.scheduler.write().await.clear_timetable(e.to_string());
                Err(e)
            }
        }
    }

    /// Looks up the timetable for a city. Requires a session; a blank query
    /// does nothing.
    pub async fn search<P: TimetableProvider>(&self, provider: &P, city: &str) -> Result<()> {
        if !self.scheduler.read().await.is_signed_in() {
            return Err(AdhanError::NotSignedIn);
        }
        let city = city.trim();
        if city.is_empty() {
            return Ok(());
        }
        self.refresh_timetable(provider, &LocationQuery::address(city))
            .await
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.bus.subscribe_system()
    }

    /// Subscribes to the `AlertEvent` stream.
    pub fn subscribe_alert_events(&self) -> broadcast::Receiver<AlertEvent> {
        self.bus.subscribe_alert()
    }

    /// Subscribes to the `PreviewEvent` stream.
    pub fn subscribe_preview_events(&self) -> broadcast::Receiver<PreviewEvent> {
        self.bus.subscribe_preview()
    }

    /// Subscribes to the per-tick `ScheduleEvent` stream.
    pub fn subscribe_schedule_events(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.bus.subscribe_schedule()
    }

    /// Subscribes to the `DayEvent` stream.
    pub fn subscribe_day_events(&self) -> broadcast::Receiver<DayEvent> {
        self.bus.subscribe_day()
    }

    /// Subscribes to the raw tick stream.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<Arc<TickEvent>> {
        self.tick_sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MemoryOutput;
    use crate::common::PrayerName;
    use crate::provider::StaticProvider;
    use crate::timetable::Timetable;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use std::time::Duration;

    fn engine() -> (AdhanEngine, MemoryOutput) {
        let alert = MemoryOutput::new();
        let engine = AdhanEngine::new(
            AdhanConfig::default(),
            Box::new(alert.clone()),
            Box::new(MemoryOutput::new()),
        )
        .unwrap();
        (engine, alert)
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

    fn tick(tick_count: u64, h: u32, m: u32, s: u32) -> TickEvent {
        TickEvent {
            tick_count,
            timestamp: Tz::UTC.with_ymd_and_hms(2026, 8, 20, h, m, s).unwrap(),
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: "Test".into(),
            email: "test@example.org".into(),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn ticks_publish_snapshots_and_fire_once() {
        let (engine, alert) = engine();
        engine.load_timetable(day()).await;
        engine.sign_in(profile()).await;
        engine.set_alerts_enabled(true).await.unwrap();
        alert.clear_calls();

        let mut schedule = engine.subscribe_schedule_events();
        let mut watcher = DayWatcher::new();
        for s in 0..60 {
            engine.process_tick(&tick(s + 1, 12, 30, s as u32), &mut watcher).await;
        }
        assert_eq!(alert.play_count(), 1);

        let first = schedule.recv().await.unwrap();
        assert_eq!(first.tick_count, 1);
        assert!(first.snapshot.alert_active());
        assert_eq!(first.snapshot.next.unwrap().name, PrayerName::Asr);
    }

    #[tokio::test]
    async fn failed_refresh_drops_the_timetable() {
        let (engine, _) = engine();
        engine.load_timetable(day()).await;
        let mut system = engine.subscribe_system_events();

        let result = engine
            .refresh_timetable(&StaticProvider::default(), &LocationQuery::address("Nowhere"))
            .await;
        assert!(matches!(result, Err(AdhanError::MissingTimetable)));
        assert!(engine.daily_timetable().await.is_none());
        assert!(engine.snapshot().await.next.is_none());
        assert!(matches!(
            system.recv().await.unwrap(),
            SystemEvent::TimetableUnavailable { .. }
        ));

        engine
            .refresh_timetable(&StaticProvider::new(Some(day())), &LocationQuery::address("Somewhere"))
            .await
            .unwrap();
        assert_eq!(engine.daily_timetable().await, Some(day()));
    }

    #[tokio::test]
    async fn search_requires_a_session_and_ignores_blank_queries() {
        let (engine, _) = engine();
        let provider = StaticProvider::new(Some(day()));
        assert!(matches!(
            engine.search(&provider, "Cairo").await,
            Err(AdhanError::NotSignedIn)
        ));
        engine.sign_in(profile()).await;
        engine.search(&provider, "   ").await.unwrap();
        assert!(engine.daily_timetable().await.is_none());
        engine.search(&provider, "Cairo").await.unwrap();
        assert!(engine.daily_timetable().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_ticks_and_shuts_down_cleanly() {
        let (engine, _) = engine();
        let mut system = engine.subscribe_system_events();
        let mut schedule = engine.subscribe_schedule_events();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let runner = engine.clone();
        let handle = tokio::spawn(async move {
            runner
                .run_until(async {
                    stop_rx.await.ok();
                })
                .await
        });

        let event = schedule.recv().await.unwrap();
        assert!(event.snapshot.next.is_none());
        tokio::time::sleep(Duration::from_secs(3)).await;
        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        let mut saw_started = false;
        let mut saw_shutdown = false;
        while let Ok(event) = system.try_recv() {
            match event {
                SystemEvent::EngineStarted { .. } => saw_started = true,
                SystemEvent::EngineShutdown => saw_shutdown = true,
                _ => {}
            }
        }
        assert!(saw_started);
        assert!(saw_shutdown);
    }
}
