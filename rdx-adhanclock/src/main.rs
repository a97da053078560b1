use adhanclock::prelude::*;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long the simulated outputs "play" before reporting that they ended.
const SIMULATED_PLAYBACK: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load the configuration: a path argument, then $ADHAN_CONFIG.
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("ADHAN_CONFIG").map(PathBuf::from));
    let config = AdhanConfig::load(path.as_deref()).context("failed to load configuration")?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // 3. Create the engine with in-memory outputs standing in for speakers.
    let alert_output = MemoryOutput::new();
    let preview_output = MemoryOutput::new();
    let provider = AladhanProvider::new(&config.provider)?;
    let location = config.location.clone();
    let engine = AdhanEngine::new(
        config,
        Box::new(alert_output.clone()),
        Box::new(preview_output),
    )?;

    // 4. Spawn concurrent tasks to listen to different event streams.
    spawn_event_listeners(&engine, alert_output);

    // 5. Fetch a timetable unless a fixed one was configured.
    if engine.daily_timetable().await.is_none() {
        match &location {
            Some(query) => {
                if let Err(e) = engine.refresh_timetable(&provider, query).await {
                    warn!("Initial timetable fetch failed: {}", e);
                }
                spawn_daily_refresh(&engine, provider, query.clone());
            }
            None => warn!("No timetable and no location configured; nothing to schedule."),
        }
    }

    // 6. Sign in a local profile and arm alerts.
    engine
        .sign_in(UserProfile {
            name: "Local".to_string(),
            email: "local@localhost".to_string(),
            avatar: None,
        })
        .await;
    engine.set_alerts_enabled(true).await?;

    // 7. Run the engine.
    engine.run().await?;

    Ok(())
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &AdhanEngine, alert_output: MemoryOutput) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut alert_rx = engine.subscribe_alert_events();
    tokio::spawn(async move {
        while let Ok(event) = alert_rx.recv().await {
            info!("[ALERT] => {:?}", event);
            if let AlertEvent::AlertStarted { .. } = event {
                let output = alert_output.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(SIMULATED_PLAYBACK).await;
                    output.finish();
                });
            }
        }
    });

    let mut preview_rx = engine.subscribe_preview_events();
    tokio::spawn(async move {
        while let Ok(event) = preview_rx.recv().await {
            info!("[PREVIEW] => {:?}", event);
        }
    });

    let mut schedule_rx = engine.subscribe_schedule_events();
    tokio::spawn(async move {
        while let Ok(event) = schedule_rx.recv().await {
            // Once a minute is plenty for a log.
            if event.tick_count % 60 != 1 {
                continue;
            }
            match (&event.snapshot.next, event.snapshot.countdown) {
                (Some(next), Some(countdown)) => info!(
                    "[SCHEDULE] => Next: {} at {} (in {})",
                    next.name,
                    next.at.format("%H:%M"),
                    countdown
                ),
                _ => info!("[SCHEDULE] => No timetable loaded."),
            }
        }
    });
}

/// Refetches the timetable whenever the local date changes.
fn spawn_daily_refresh(engine: &AdhanEngine, provider: AladhanProvider, query: LocationQuery) {
    let engine = engine.clone();
    let mut day_rx = engine.subscribe_day_events();
    tokio::spawn(async move {
        while let Ok(DayEvent::DateChanged { new_date }) = day_rx.recv().await {
            info!("[DAY] => {} begins, refreshing timetable.", new_date);
            if let Err(e) = engine.refresh_timetable(&provider, &query).await {
                warn!("Timetable refresh failed: {}", e);
            }
        }
    });
}
