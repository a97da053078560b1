mod bell;

use adhanclock::prelude::*;
use adhanclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use anyhow::{Context, Result};
use bell::BellOutput;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");
const ALERT_LENGTH: Duration = Duration::from_secs(30);
const PREVIEW_LENGTH: Duration = Duration::from_secs(10);

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHighlighter;

impl Highlighter for ShellHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// The location the current timetable came from, reused on date changes.
type LastQuery = Arc<RwLock<Option<LocationQuery>>>;

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    let rule = "-".repeat(72);
    println!("{}", "  adhanshell - prayer times at the prompt".cyan().bold());
    println!("{}", rule.dimmed());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";
    println!("{}", license_blurb.dimmed());
    println!("{}", rule.dimmed());
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(
    engine: &AdhanEngine,
    provider: AladhanProvider,
    last_query: LastQuery,
    is_watching: Arc<AtomicBool>,
) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            match event {
                SystemEvent::TimetableLoaded { location } => println!(
                    "\n<-- [TIMETABLE] Loaded for {}.",
                    location.as_deref().unwrap_or("the configured times")
                ),
                SystemEvent::TimetableUnavailable { reason } => {
                    println!("\n<-- [TIMETABLE] {} {}", "Unavailable:".red(), reason)
                }
                other => println!("\n<-- [SYSTEM EVENT] {:?}", other),
            }
        }
    });

    let mut alert_rx = engine.subscribe_alert_events();
    tokio::spawn(async move {
        while let Ok(event) = alert_rx.recv().await {
            match event {
                AlertEvent::AlertStarted { prayer, minute, .. } => println!(
                    "\n<-- [ALERT] {} It is time for {} ({}). Type 'stop' to silence.",
                    "ADHAN".red().bold(),
                    prayer.to_string().bold(),
                    minute
                ),
                AlertEvent::PlaybackDenied { prayer, reason } => println!(
                    "\n<-- [ALERT] {} could not sound: {}",
                    prayer, reason
                ),
                other => println!("\n<-- [ALERT] {:?}", other),
            }
        }
    });

    let mut preview_rx = engine.subscribe_preview_events();
    tokio::spawn(async move {
        while let Ok(event) = preview_rx.recv().await {
            println!("\n<-- [PREVIEW] {:?}", event);
        }
    });

    // Schedule listener (controlled by the shared flag)
    let mut schedule_rx = engine.subscribe_schedule_events();
    tokio::spawn(async move {
        while let Ok(event) = schedule_rx.recv().await {
            if is_watching.load(Ordering::Relaxed) && event.tick_count % 5 == 0 {
                println!("<-- [SCHEDULE] {}", describe_countdown(&event.snapshot));
            }
        }
    });

    let engine = engine.clone();
    let mut day_rx = engine.subscribe_day_events();
    tokio::spawn(async move {
        while let Ok(DayEvent::DateChanged { new_date }) = day_rx.recv().await {
            let query = last_query.read().await.clone();
            if let Some(query) = query {
                info!("{} begins, refreshing timetable.", new_date);
                if let Err(e) = engine.refresh_timetable(&provider, &query).await {
                    println!("\n<-- [TIMETABLE] Refresh failed: {}", e);
                }
            }
        }
    });
}

/// Tracks the location behind the loaded timetable. A failed fetch dropped
/// the timetable, so its location is forgotten as well.
async fn remember_query(
    last_query: &LastQuery,
    query: LocationQuery,
    result: &adhanclock::error::Result<()>,
) {
    match result {
        Ok(()) => *last_query.write().await = Some(query),
        Err(AdhanError::NotSignedIn) => {}
        Err(_) => *last_query.write().await = None,
    }
}

fn describe_countdown(snapshot: &ScheduleSnapshot) -> String {
    match (&snapshot.next, snapshot.countdown) {
        (Some(next), Some(countdown)) => format!(
            "Next: {} at {} in {}",
            next.name.to_string().bold(),
            next.at.format("%H:%M"),
            countdown.to_string().cyan()
        ),
        _ => "No timetable loaded.".dimmed().to_string(),
    }
}

async fn print_status(engine: &AdhanEngine) {
    let snapshot = engine.snapshot().await;
    println!("  Now:      {}", snapshot.now.format("%Y-%m-%d %H:%M:%S %Z"));
    println!("  {}", describe_countdown(&snapshot));
    let user = engine.signed_in_user().await;
    println!(
        "  User:     {}",
        user.map_or_else(|| "signed out".dimmed().to_string(), |u| u.name)
    );
    let alerts = if snapshot.alerts_enabled {
        "on".green()
    } else {
        "off".red()
    };
    println!("  Alerts:   {}", alerts);
    let sounds = engine.sounds();
    let selected = engine.selected_sound().await;
    if let Some(sound) = sounds.get(selected) {
        println!("  Sound:    #{} {}", selected + 1, sound.name);
    }
    let playback = match snapshot.playback {
        PlaybackState::Idle => "idle".to_string(),
        PlaybackState::Alerting => "alert sounding".red().bold().to_string(),
        PlaybackState::Previewing(i) => format!("previewing #{}", i + 1),
    };
    println!("  Playback: {}", playback);
}

async fn print_times(engine: &AdhanEngine) {
    let Some(daily) = engine.daily_timetable().await else {
        println!("No timetable loaded. Try 'search <city>' or 'locate'.");
        return;
    };
    if let Some(location) = &daily.location {
        println!("  {}", location.to_string().bold());
    }
    if let Some(hijri) = &daily.hijri {
        println!("  {}", hijri.to_string().dimmed());
    }
    let next = engine.snapshot().await.next.map(|n| n.name);
    for (name, _) in daily.timetable.iter() {
        let line = format!("  {:<8} {}", name.as_str(), daily.timetable.minute_label(name));
        if Some(name) == next {
            println!("{}  <--", line.green().bold());
        } else {
            println!("{}", line);
        }
    }
}

fn print_sounds(engine: &AdhanEngine, selected: SoundIndex) {
    for (i, sound) in engine.sounds().iter().enumerate() {
        let marker = if i == selected { "*" } else { " " };
        println!("  {} #{} {}", marker, i + 1, sound.name);
    }
}

/// Parses a 1-based sound number as typed by the user.
fn parse_sound(arg: Option<&&str>) -> Option<SoundIndex> {
    arg?.parse::<usize>().ok()?.checked_sub(1)
}

fn print_help() {
    println!("Available commands:");
    println!("  status                - Shows the countdown, session and playback.");
    println!("  times                 - Shows today's timetable.");
    println!("  signin [NAME] [EMAIL] - Signs in (required for alerts and search).");
    println!("  signout               - Signs out and switches alerts off.");
    println!("  enable | disable      - Switches scheduled alerts on or off.");
    println!("  toggle                - Flips scheduled alerts.");
    println!("  stop                  - Silences a sounding alert.");
    println!("  sounds                - Lists the alert sounds.");
    println!("  select <N>            - Uses sound #N for alerts.");
    println!("  preview <N> | stop    - Plays or stops a preview of sound #N.");
    println!("  search <CITY>         - Fetches the timetable for a city.");
    println!("  locate                - Fetches the timetable for the configured location.");
    println!("  watch on|off          - Prints the countdown every few seconds.");
    println!("  exit                  - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    let path = env::var_os("ADHAN_CONFIG").map(PathBuf::from);
    let config = AdhanConfig::load(path.as_deref()).context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let provider = AladhanProvider::new(&config.provider)?;
    let configured_location = config.location.clone();
    let engine = AdhanEngine::new(
        config,
        Box::new(BellOutput::new("ADHAN", ALERT_LENGTH)),
        Box::new(BellOutput::new("PREVIEW", PREVIEW_LENGTH)),
    )?;
    let engine_handle = engine.clone();

    let last_query: LastQuery = Arc::new(RwLock::new(None));
    let is_watching = Arc::new(AtomicBool::new(false));
    spawn_event_listeners(
        &engine_handle,
        provider.clone(),
        last_query.clone(),
        is_watching.clone(),
    );

    info!("Spawning {} in the background...", ENGINE_NAME.cyan());
    tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ShellHighlighter));

    println!(
        "{} is running. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting adhanshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "status" => print_status(&engine_handle).await,
            "times" => print_times(&engine_handle).await,
            "signin" => {
                let name = args.get(1).copied().unwrap_or("Guest").to_string();
                let email = args
                    .get(2)
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| format!("{}@localhost", name.to_lowercase()));
                engine_handle
                    .sign_in(UserProfile {
                        name: name.clone(),
                        email,
                        avatar: None,
                    })
                    .await;
                println!("--> Signed in as {}.", name.bold());
            }
            "signout" => {
                engine_handle.sign_out().await;
                println!("--> Signed out. Alerts are off.");
            }
            "enable" | "disable" => {
                let enabled = *command == "enable";
                match engine_handle.set_alerts_enabled(enabled).await {
                    Ok(()) => println!("--> Alerts {}.", if enabled { "on" } else { "off" }),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "toggle" => match engine_handle.toggle_alerts().await {
                Ok(enabled) => println!("--> Alerts {}.", if enabled { "on" } else { "off" }),
                Err(e) => println!("Error: {}", e),
            },
            "stop" => {
                if !engine_handle.stop_alert().await {
                    println!("--> No alert is sounding.");
                }
            }
            "sounds" => print_sounds(&engine_handle, engine_handle.selected_sound().await),
            "select" => match parse_sound(args.get(1)) {
                Some(index) => match engine_handle.select_sound(index).await {
                    Ok(()) => println!("--> Alerts will use #{}.", index + 1),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: select <N>"),
            },
            "preview" => {
                if let Some(&"stop") = args.get(1) {
                    if engine_handle.stop_preview().await.is_none() {
                        println!("--> Nothing is previewing.");
                    }
                } else if let Some(index) = parse_sound(args.get(1)) {
                    if let Err(e) = engine_handle.preview_sound(index).await {
                        println!("Error: {}", e);
                    }
                } else {
                    println!("Usage: preview <N> | preview stop");
                }
            }
            "search" => {
                let city = args[1..].join(" ");
                if city.is_empty() {
                    println!("Usage: search <CITY>");
                    continue;
                }
                let result = engine_handle.search(&provider, &city).await;
                remember_query(&last_query, LocationQuery::address(city), &result).await;
                match result {
                    Ok(()) => print_times(&engine_handle).await,
                    Err(e) => println!("Error: {}", e),
                }
            }
            "locate" => match &configured_location {
                Some(query) => {
                    let result = engine_handle.refresh_timetable(&provider, query).await;
                    remember_query(&last_query, query.clone(), &result).await;
                    match result {
                        Ok(()) => print_times(&engine_handle).await,
                        Err(e) => println!("Error: {}", e),
                    }
                }
                None => println!("No location configured. Set [location] in the config file."),
            },
            "watch" => match args.get(1) {
                Some(&"on") => {
                    is_watching.store(true, Ordering::Relaxed);
                    println!("--> Watching the countdown.");
                }
                Some(&"off") => {
                    is_watching.store(false, Ordering::Relaxed);
                    println!("--> Stopped watching the countdown.");
                }
                _ => println!("Usage: watch on|off"),
            },
            "help" => print_help(),
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line.trim()),
        }
    }

    Ok(())
}
