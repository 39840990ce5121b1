//! tetra-services: timing driver and command layer for the tetra engine

pub mod clock_driver;
pub mod command;
pub mod offline;

pub use clock_driver::{ClockDriver, ClockError, TickBatch};
pub use command::{apply_all, Command};
pub use offline::{render_offline, render_offline_with, OfflineTicks};
