//! Priority-ordered task scheduling for the three update phases.

pub mod priority;
pub mod tick_manager;
pub mod updater;

pub use priority::{PriorityOverride, PriorityTable};
pub use tick_manager::TickManager;
pub use updater::{TaskUpdater, UpdaterState};
