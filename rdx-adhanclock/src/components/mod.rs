//! Contains the building blocks that react to the passing of time.
//!
//! The `AdhanEngine` feeds every tick through these components alongside the
//! scheduler.

pub(crate) mod day_watcher;
