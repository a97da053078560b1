//! # Adhanclock
//!
//! An event-driven prayer-time scheduling and alert engine for Rust.
//!
//! Adhanclock keeps a daily timetable of the six prayer times, works out which
//! one is next and how long until it, and sounds an alert exactly once when the
//! clock reaches an eligible prayer's minute. It also runs a separate preview
//! channel for auditioning alert sounds.
//!
//! ## Core Concepts
//!
//! - **SystemClock**: A periodic ticker that acts as the single source of time.
//!   Each tick carries one frozen clock reading.
//! - **Scheduler**: The synchronous core. On every tick it resolves the next
//!   prayer, computes the countdown and decides whether an alert fires.
//! - **Event-Driven**: Renderers subscribe to strongly-typed event streams
//!   (`ScheduleEvent`, `AlertEvent`, `PreviewEvent`, ...) instead of polling.
//! - **Pluggable edges**: Audio playback (`AudioOutput`) and timetable
//!   retrieval (`TimetableProvider`) are traits, so the engine runs the same
//!   against real devices, the Aladhan service or in-memory doubles.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use adhanclock::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load the configuration from a file and the environment.
//!     let config = AdhanConfig::load(Some("adhan.toml".as_ref()))?;
//!
//!     // 2. Create the engine with one output for alerts and one for previews.
//!     let engine = AdhanEngine::new(
//!         config,
//!         Box::new(MemoryOutput::new()),
//!         Box::new(MemoryOutput::new()),
//!     )?;
//!
//!     // 3. Subscribe to an event stream before starting the engine.
//!     let mut alerts = engine.subscribe_alert_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = alerts.recv().await {
//!             println!("Alert event: {:?}", event);
//!         }
//!     });
//!
//!     // 4. Alerts need a signed-in user.
//!     engine
//!         .sign_in(UserProfile {
//!             name: "Local".into(),
//!             email: "local@localhost".into(),
//!             avatar: None,
//!         })
//!         .await;
//!     engine.set_alerts_enabled(true).await?;
//!
//!     // 5. Run the engine. It will shut down on Ctrl+C.
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Adhan Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod arbiter;
pub mod audio;
pub mod common;
pub(crate) mod components;
pub mod config;
pub mod countdown;
pub mod engine;
pub mod error;
pub mod events;
pub mod preview;
pub mod provider;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod time;
pub mod timetable;
pub mod trigger;

/// A prelude module for easy importing of the most common Adhanclock types.
pub mod prelude {
    pub use crate::audio::{AudioError, AudioOutput, MemoryOutput};
    pub use crate::common::{PrayerName, SoundIndex};
    pub use crate::config::{AdhanConfig, ProviderConfig, SoundConfig};
    pub use crate::countdown::Countdown;
    pub use crate::engine::AdhanEngine;
    pub use crate::error::AdhanError;
    pub use crate::events::{
        AlertEvent, DayEvent, PreviewEvent, ScheduleEvent, StopReason, SystemEvent,
    };
    pub use crate::provider::{AladhanProvider, LocationQuery, StaticProvider, TimetableProvider};
    pub use crate::resolver::NextPrayer;
    pub use crate::scheduler::{PlaybackState, ScheduleSnapshot};
    pub use crate::session::UserProfile;
    pub use crate::timetable::{DailyTimetable, HijriDate, LocationInfo, Timetable};
}
