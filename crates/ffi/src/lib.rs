//! C API for the hourglass simulation.
//!
//! Every entry point returns a [`HourglassErrorCode`]; on failure a message is
//! kept per thread and can be read with [`hourglass_get_last_error`].
//!
//! A typical host loop creates one instance with [`hourglass_new`], forwards
//! sensor readings from its motion callback with
//! [`hourglass_set_device_motion`], calls [`hourglass_step`] from a 20 ms timer
//! and redraws from [`hourglass_copy_top`] and [`hourglass_copy_bottom`] when
//! the step reports a change.

mod error;
mod helpers;
mod instance;
mod queries;

pub use error::{hourglass_get_last_error, hourglass_get_last_error_code, HourglassErrorCode};
pub use instance::{
    hourglass_destroy, hourglass_new, hourglass_set_device_motion, hourglass_set_gravity,
    hourglass_step, HourglassInstance, HourglassParams,
};
pub use queries::{
    hourglass_copy_bottom, hourglass_copy_top, hourglass_get_counts, hourglass_get_generation,
    hourglass_get_size,
};
