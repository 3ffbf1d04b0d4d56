//! Hourglass grain-migration engine
//!
//! `HourglassSimulation` owns the grid, the current gravity vector and the
//! random source used for tie-breaking and neck rejection. The driver holds it
//! by value and calls [`HourglassSimulation::step`] once per tick; display code
//! either polls [`HourglassSimulation::top`]/[`HourglassSimulation::bottom`] or
//! registers a [`SnapshotSink`].

pub mod neighbors;
pub mod publish;

pub use neighbors::{downhill_candidates, is_neck_crossing, Candidate, ScanOrder};
pub use publish::{ChamberSnapshot, ChannelSink, SnapshotSink};

use crate::config::HourglassConfig;
use crate::error::HourglassError;
use crate::gravity::GravityReceiver;
use crate::grid::ChamberGrid;
use nalgebra::Vector2;
use neighbors::is_usable_gravity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

/// Running counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    pub steps: u64,
    /// Steps that moved at least one grain
    pub changed_steps: u64,
    /// Grains moved by the most recent step
    pub moves_last_step: usize,
    pub total_moves: u64,
    pub neck_crossings: u64,
    /// Neck crossings refused by the neck probability roll
    pub neck_rejections: u64,
}

/// Two-chamber sand simulation
pub struct HourglassSimulation<R: Rng = StdRng> {
    grid: ChamberGrid,
    gravity: Vector2<f64>,
    neck_probability: f64,
    rng: R,

    // Publishing
    published: ChamberSnapshot,
    sinks: Vec<Box<dyn SnapshotSink>>,

    gravity_feed: Option<GravityReceiver>,
    stats: SimulationStats,
}

impl HourglassSimulation<StdRng> {
    /// Default-configured hourglass with chamber size `n`, seeded from the OS.
    ///
    /// # Errors
    ///
    /// Returns [`HourglassError::InvalidSize`] if `n` is zero or too large.
    pub fn new(n: usize) -> Result<Self, HourglassError> {
        Self::with_config(HourglassConfig::with_size(n), StdRng::from_os_rng())
    }
}

impl<R: Rng> HourglassSimulation<R> {
    /// Build the initial grid from `config` and take ownership of `rng`.
    ///
    /// # Errors
    ///
    /// Returns the validation error for any out-of-range parameter.
    pub fn with_config(config: HourglassConfig, rng: R) -> Result<Self, HourglassError> {
        config.validate()?;
        let grid = ChamberGrid::with_fill(config.size, config.fill_ratio)?;
        Self::from_grid(grid, &config, rng)
    }

    /// Start from an explicit grid. `config.fill_ratio` is ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or [`HourglassError::SizeMismatch`] if the grid
    /// size differs from `config.size`.
    pub fn from_grid(
        grid: ChamberGrid,
        config: &HourglassConfig,
        rng: R,
    ) -> Result<Self, HourglassError> {
        config.validate()?;
        if grid.size() != config.size {
            return Err(HourglassError::SizeMismatch {
                expected: config.size,
                actual: grid.size(),
            });
        }

        info!(
            "Hourglass initialized: {}x{} chambers, {} grains, neck probability {:.2}",
            config.size,
            config.size,
            grid.occupied_count(),
            config.neck_probability
        );

        Ok(Self {
            published: ChamberSnapshot::from_grid(&grid, 0),
            grid,
            gravity: config.initial_gravity,
            neck_probability: config.neck_probability,
            rng,
            sinks: Vec::new(),
            gravity_feed: None,
            stats: SimulationStats::default(),
        })
    }

    /// Store the gravity vector for the next step. Not validated.
    pub fn set_gravity(&mut self, gx: f64, gy: f64) {
        self.gravity = Vector2::new(gx, gy);
    }

    pub fn gravity(&self) -> Vector2<f64> {
        self.gravity
    }

    pub fn neck_probability(&self) -> f64 {
        self.neck_probability
    }

    /// # Errors
    ///
    /// Returns [`HourglassError::InvalidNeckProbability`] outside `[0, 1]`.
    pub fn set_neck_probability(&mut self, p: f64) -> Result<(), HourglassError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(HourglassError::InvalidNeckProbability(p));
        }
        self.neck_probability = p;
        Ok(())
    }

    /// Read gravity from `feed` at the start of every step.
    ///
    /// Steps with no pending update keep the previous vector.
    pub fn attach_gravity_feed(&mut self, feed: GravityReceiver) {
        self.gravity_feed = Some(feed);
    }

    /// True while an attached gravity feed still has a live sender.
    pub fn has_gravity_source(&self) -> bool {
        self.gravity_feed
            .as_ref()
            .is_some_and(GravityReceiver::is_connected)
    }

    /// Register a sink that receives every published snapshot.
    pub fn add_sink(&mut self, sink: impl SnapshotSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Advance one tick. Returns true if any grain moved.
    pub fn step(&mut self) -> bool {
        if let Some(latest) = self
            .gravity_feed
            .as_ref()
            .and_then(GravityReceiver::take_latest)
        {
            self.gravity = latest;
        }

        self.stats.steps += 1;
        self.stats.moves_last_step = 0;

        let gravity = self.gravity;
        if !is_usable_gravity(gravity) {
            debug!(
                "Skipping step {}: gravity ({}, {}) has no direction",
                self.stats.steps, gravity.x, gravity.y
            );
            return false;
        }

        let candidates = downhill_candidates(gravity, &mut self.rng);
        let order = ScanOrder::from_gravity(gravity, self.grid.size() as i32);

        let mut moves = 0;
        for x in order.xs() {
            for y in order.ys() {
                let Some(source) = self.grid.position_to_index(x, y) else {
                    continue;
                };
                if !self.grid.cells()[source] {
                    continue;
                }

                for c in &candidates {
                    let Some(target) = self.grid.position_to_index(x + c.dx, y + c.dy) else {
                        continue;
                    };
                    if self.grid.cells()[target] {
                        continue;
                    }

                    if is_neck_crossing(x, y, c.dx, c.dy) {
                        if self.rng.random_bool(self.neck_probability) {
                            self.stats.neck_rejections += 1;
                            continue;
                        }
                        self.stats.neck_crossings += 1;
                    }

                    let cells = self.grid.cells_mut();
                    cells[target] = true;
                    cells[source] = false;
                    moves += 1;
                    break;
                }
            }
        }

        self.stats.moves_last_step = moves;
        self.stats.total_moves += moves as u64;

        if moves == 0 {
            return false;
        }

        self.stats.changed_steps += 1;
        self.publish();
        true
    }

    fn publish(&mut self) {
        let generation = self.published.generation + 1;
        self.published = ChamberSnapshot::from_grid(&self.grid, generation);

        trace!(
            "Published generation {} ({} moves) to {} sinks",
            generation,
            self.stats.moves_last_step,
            self.sinks.len()
        );

        for sink in &mut self.sinks {
            sink.publish(&self.published);
        }
    }

    /// Last published top chamber
    pub fn top(&self) -> &[bool] {
        &self.published.top
    }

    /// Last published bottom chamber
    pub fn bottom(&self) -> &[bool] {
        &self.published.bottom
    }

    /// Last published snapshot of both chambers
    pub fn snapshot(&self) -> &ChamberSnapshot {
        &self.published
    }

    /// Live grid
    pub fn grid(&self) -> &ChamberGrid {
        &self.grid
    }

    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }
}
