//! Latest-value-wins gravity feed
//!
//! Sensor callbacks run at their own rate, usually much faster than the step
//! rate. Producers overwrite a shared slot and the engine drains it once at the
//! start of each step, so intermediate readings are simply dropped.

use crate::sensor::gravity_from_device_motion;
use nalgebra::Vector2;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot = Arc<Mutex<Option<Vector2<f64>>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Vector2<f64>>> {
    // The slot holds a plain value, so a panic mid-write cannot leave it torn.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create a connected sender/receiver pair.
pub fn gravity_feed() -> (GravitySender, GravityReceiver) {
    let slot: Slot = Arc::new(Mutex::new(None));
    (
        GravitySender { slot: slot.clone() },
        GravityReceiver { slot },
    )
}

/// Producer half, cloneable across sensor threads
#[derive(Debug, Clone)]
pub struct GravitySender {
    slot: Slot,
}

impl GravitySender {
    /// Replace the pending vector. No validation is done here.
    pub fn send(&self, gx: f64, gy: f64) {
        self.send_vector(Vector2::new(gx, gy));
    }

    pub fn send_vector(&self, gravity: Vector2<f64>) {
        *lock(&self.slot) = Some(gravity);
    }

    /// Convert a raw device-motion reading and send it.
    ///
    /// Missing components select the fallback vector.
    pub fn send_device_motion(&self, x: Option<f64>, y: Option<f64>) {
        self.send_vector(gravity_from_device_motion(x, y));
    }
}

/// Consumer half, owned by the engine
#[derive(Debug)]
pub struct GravityReceiver {
    slot: Slot,
}

impl GravityReceiver {
    /// Take the most recent vector sent since the last call, if any.
    pub fn take_latest(&self) -> Option<Vector2<f64>> {
        lock(&self.slot).take()
    }

    /// True while at least one sender is alive.
    pub fn is_connected(&self) -> bool {
        Arc::strong_count(&self.slot) > 1
    }
}
