//! Snapshot publishing to the display layer
//!
//! The engine publishes only after a step that moved at least one grain, so
//! sinks can redraw on every message without diffing.

use crate::grid::ChamberGrid;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::trace;

/// Read-only copy of both chambers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChamberSnapshot {
    /// Incremented on every publish; 0 is the initial state
    pub generation: u64,
    /// Bottom chamber cells (grid indices `[0, n*n)`)
    pub bottom: Vec<bool>,
    /// Top chamber cells (grid indices `[n*n, 2*n*n)`)
    pub top: Vec<bool>,
}

impl ChamberSnapshot {
    /// Copy both chambers out of `grid`.
    pub fn from_grid(grid: &ChamberGrid, generation: u64) -> Self {
        Self {
            generation,
            bottom: grid.bottom_cells().to_vec(),
            top: grid.top_cells().to_vec(),
        }
    }

    /// Chamber side length
    pub fn size(&self) -> usize {
        (self.top.len() as f64).sqrt().round() as usize
    }

    /// Occupancy at a signed grid position, `None` outside both chambers.
    ///
    /// Uses the same layout as [`ChamberGrid::position_to_index`], so renderers
    /// can draw a published snapshot without holding the live grid.
    pub fn get(&self, x: i32, y: i32) -> Option<bool> {
        let n = self.size() as i32;
        let (cells, cx, cy) = if (0..n).contains(&x) && (0..n).contains(&y) {
            (&self.top, x, y)
        } else if (-n..0).contains(&x) && (-n..0).contains(&y) {
            (&self.bottom, x + n, y + n)
        } else {
            return None;
        };
        cells.get((cx + n * cy) as usize).copied()
    }
}

/// Receiver of published snapshots
pub trait SnapshotSink: Send {
    fn publish(&mut self, snapshot: &ChamberSnapshot);
}

impl<F> SnapshotSink for F
where
    F: FnMut(&ChamberSnapshot) + Send,
{
    fn publish(&mut self, snapshot: &ChamberSnapshot) {
        self(snapshot);
    }
}

/// Forwards snapshots over an `mpsc` channel, typically to a render thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<ChamberSnapshot>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn channel() -> (Self, Receiver<ChamberSnapshot>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl SnapshotSink for ChannelSink {
    fn publish(&mut self, snapshot: &ChamberSnapshot) {
        if self.tx.send(snapshot.clone()).is_err() {
            trace!(
                "Snapshot receiver dropped, discarding generation {}",
                snapshot.generation
            );
        }
    }
}
