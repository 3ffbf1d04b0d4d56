//! Hourglass Simulation Core Library
//!
//! A cellular-automaton hourglass: sand grains occupy cells of two square
//! chambers joined at a single neck cell, and migrate one cell per tick toward
//! a live gravity vector supplied by a motion sensor.
//!
//! ## Overview
//!
//! - [`ChamberGrid`] owns the occupancy array and the signed coordinate mapping
//! - [`HourglassSimulation`] advances the grid and publishes chamber snapshots
//! - [`gravity_feed`] carries sensor readings to the engine, latest value wins
//! - [`FixedTicker`] schedules steps at a fixed period, dropping late ticks
//!
//! ```rust
//! use hourglass_core::HourglassSimulation;
//!
//! let mut sim = HourglassSimulation::new(8)?;
//! sim.set_gravity(1.0, 1.0);
//! let grains = sim.grid().occupied_count();
//! sim.step();
//! assert_eq!(sim.grid().occupied_count(), grains);
//! # Ok::<(), hourglass_core::HourglassError>(())
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod gravity;
pub mod grid;
pub mod sensor;
pub mod simulation;

/// Largest supported chamber side length
pub const MAX_CHAMBER_SIZE: usize = 4096;

pub use config::HourglassConfig;
pub use driver::{run_ticks, DriverReport, FixedTicker};
pub use error::HourglassError;
pub use gravity::{gravity_feed, GravityReceiver, GravitySender};
pub use grid::ChamberGrid;
pub use sensor::gravity_from_device_motion;
pub use simulation::{
    ChamberSnapshot, ChannelSink, HourglassSimulation, SimulationStats, SnapshotSink,
};
