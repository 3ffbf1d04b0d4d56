//! Simulation configuration
//!
//! Defaults give a 40×40 chamber with half of all neck crossings rejected,
//! 90% of the bottom chamber filled and a 20ms tick.

use crate::error::HourglassError;
use crate::MAX_CHAMBER_SIZE;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default chamber side length
pub const DEFAULT_CHAMBER_SIZE: usize = 40;
/// Default per-attempt chance that a neck crossing is rejected
pub const DEFAULT_NECK_PROBABILITY: f64 = 0.5;
/// Default share of the bottom chamber filled at start
pub const DEFAULT_FILL_RATIO: f64 = 0.9;
/// Default driver period in milliseconds
pub const DEFAULT_TICK_MS: u64 = 20;
/// Gravity assumed when no sensor reading is available
pub const FALLBACK_GRAVITY: (f64, f64) = (1.0, 1.0);

/// Hourglass simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HourglassConfig {
    /// Chamber side length `n`; the grid holds `2*n*n` cells
    pub size: usize,

    /// Probability in `[0, 1]` that a grain is blocked from crossing the neck
    /// on a single attempt. 0 lets every crossing through, 1 seals the neck.
    pub neck_probability: f64,

    /// Share of the bottom chamber occupied at start, by raw index order
    pub fill_ratio: f64,

    /// Gravity used until the first sensor update arrives
    pub initial_gravity: Vector2<f64>,

    /// Fixed driver period in milliseconds
    pub tick_ms: u64,
}

impl Default for HourglassConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHAMBER_SIZE,
            neck_probability: DEFAULT_NECK_PROBABILITY,
            fill_ratio: DEFAULT_FILL_RATIO,
            initial_gravity: Vector2::new(FALLBACK_GRAVITY.0, FALLBACK_GRAVITY.1),
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl HourglassConfig {
    /// Default configuration with a different chamber size
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Check every parameter against its valid range.
    ///
    /// # Errors
    ///
    /// Returns the first [`HourglassError`] found.
    pub fn validate(&self) -> Result<(), HourglassError> {
        if self.size == 0 || self.size > MAX_CHAMBER_SIZE {
            return Err(HourglassError::InvalidSize(self.size));
        }
        if !(0.0..=1.0).contains(&self.neck_probability) {
            return Err(HourglassError::InvalidNeckProbability(self.neck_probability));
        }
        if !(0.0..=1.0).contains(&self.fill_ratio) {
            return Err(HourglassError::InvalidFillRatio(self.fill_ratio));
        }
        if self.tick_ms == 0 {
            return Err(HourglassError::InvalidTickPeriod);
        }
        Ok(())
    }

    /// Driver period as a [`Duration`]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HourglassConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.size, 40);
        assert_eq!(config.tick_period(), Duration::from_millis(20));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let cfg = HourglassConfig {
            neck_probability: -0.1,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(HourglassError::InvalidNeckProbability(-0.1))
        );

        let cfg = HourglassConfig {
            neck_probability: f64::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        assert_eq!(
            HourglassConfig::with_size(0).validate(),
            Err(HourglassError::InvalidSize(0))
        );

        let cfg = HourglassConfig {
            tick_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(HourglassError::InvalidTickPeriod));
    }
}
