//! Fixed-period tick driver
//!
//! Steps never catch up: if the caller falls behind, the missed ticks are
//! counted and dropped and the schedule resumes from the current time.

use crate::simulation::HourglassSimulation;
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Tick schedule with a fixed period
#[derive(Debug, Clone)]
pub struct FixedTicker {
    period: Duration,
    next_tick: Instant,
    dropped: u64,
}

impl FixedTicker {
    /// First tick is due immediately at `now`.
    ///
    /// `period` must be non-zero; [`crate::HourglassConfig::validate`] enforces this
    /// for configured periods.
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period: period.max(Duration::from_nanos(1)),
            next_tick: now,
            dropped: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Total ticks skipped because the caller was late
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped
    }

    /// Returns true if a tick is due at `now` and advances the schedule.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }

        let behind = now - self.next_tick;
        let missed = (behind.as_nanos() / self.period.as_nanos()) as u64;
        if missed > 0 {
            self.dropped += missed;
            debug!("Tick driver behind by {:?}, dropping {} ticks", behind, missed);
        }

        let advance = u32::try_from(missed + 1).unwrap_or(u32::MAX);
        self.next_tick += self.period * advance;
        true
    }

    /// Time left until the next tick is due
    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_tick.saturating_duration_since(now)
    }
}

/// Outcome of a blocking driver run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverReport {
    /// Steps executed
    pub steps: u64,
    /// Steps that moved at least one grain
    pub changed_steps: u64,
    /// Ticks dropped because a step or the scheduler ran late
    pub dropped_ticks: u64,
}

/// Run `ticks` steps on the calling thread, sleeping between ticks.
pub fn run_ticks<R: Rng>(
    sim: &mut HourglassSimulation<R>,
    period: Duration,
    ticks: u64,
) -> DriverReport {
    let mut ticker = FixedTicker::new(period, Instant::now());
    let mut report = DriverReport::default();

    while report.steps < ticks {
        let now = Instant::now();
        if ticker.poll(now) {
            report.steps += 1;
            if sim.step() {
                report.changed_steps += 1;
            }
        } else {
            thread::sleep(ticker.time_until_next(now));
        }
    }

    report.dropped_ticks = ticker.dropped_ticks();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HourglassConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ticker_schedule() {
        let start = Instant::now();
        let period = Duration::from_millis(20);
        let mut ticker = FixedTicker::new(period, start);

        assert!(ticker.poll(start));
        assert!(!ticker.poll(start + Duration::from_millis(10)));
        assert_eq!(
            ticker.time_until_next(start + Duration::from_millis(10)),
            Duration::from_millis(10)
        );
        assert!(ticker.poll(start + Duration::from_millis(20)));
        assert_eq!(ticker.dropped_ticks(), 0);
    }

    #[test]
    fn test_ticker_drops_missed_ticks() {
        let start = Instant::now();
        let mut ticker = FixedTicker::new(Duration::from_millis(20), start);
        assert!(ticker.poll(start));

        // Ticks at 20, 40, 60 and 80ms are overdue at 85ms: one runs, three drop.
        assert!(ticker.poll(start + Duration::from_millis(85)));
        assert_eq!(ticker.dropped_ticks(), 3);
        assert!(!ticker.poll(start + Duration::from_millis(90)));
        assert!(ticker.poll(start + Duration::from_millis(100)));
    }

    #[test]
    fn test_run_ticks_steps_simulation() {
        let config = HourglassConfig {
            size: 4,
            neck_probability: 0.0,
            ..Default::default()
        };
        let mut sim = HourglassSimulation::with_config(config, StdRng::seed_from_u64(11)).unwrap();

        let report = run_ticks(&mut sim, Duration::from_millis(1), 5);
        assert_eq!(report.steps, 5);
        assert!(report.changed_steps >= 1);
        assert_eq!(sim.stats().steps, 5);
    }
}
