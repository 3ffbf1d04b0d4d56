//! Error types for hourglass construction and configuration

use std::fmt;

/// Precondition violations detected while building a simulation.
///
/// Stepping never fails: every error here is raised once, at construction or
/// configuration time.
#[derive(Debug, Clone, PartialEq)]
pub enum HourglassError {
    /// Chamber side length must be positive and no larger than [`crate::MAX_CHAMBER_SIZE`].
    InvalidSize(usize),
    /// Neck probability must be finite and within `[0, 1]`.
    InvalidNeckProbability(f64),
    /// Initial fill ratio must be finite and within `[0, 1]`.
    InvalidFillRatio(f64),
    /// Tick period must be non-zero.
    InvalidTickPeriod,
    /// A grid handed to the engine does not match the configured chamber size.
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for HourglassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize(n) => write!(
                f,
                "chamber size must be in 1..={}, got {n}",
                crate::MAX_CHAMBER_SIZE
            ),
            Self::InvalidNeckProbability(p) => {
                write!(f, "neck probability must be within [0, 1], got {p}")
            }
            Self::InvalidFillRatio(r) => write!(f, "fill ratio must be within [0, 1], got {r}"),
            Self::InvalidTickPeriod => write!(f, "tick period must be greater than zero"),
            Self::SizeMismatch { expected, actual } => write!(
                f,
                "grid chamber size {actual} does not match configured size {expected}"
            ),
        }
    }
}

impl std::error::Error for HourglassError {}
