use hourglass_core::{gravity_feed, GravitySender, HourglassConfig, HourglassSimulation};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ptr;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{DefaultHourglassError, HourglassErrorCode};
use crate::helpers::{instance_from_ptr, result_code, track_error, track_result, with_simulation};

/// Construction parameters passed by value from C.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HourglassParams {
    /// Chamber side length `n` (grid holds `2*n*n` cells).
    pub size: usize,
    /// Per-attempt probability in `[0, 1]` that a neck crossing is rejected.
    pub neck_probability: f64,
    /// Share of the bottom chamber filled at start, in `[0, 1]`.
    pub fill_ratio: f64,
    /// Seed for tie-breaking and neck rolls. Ignored unless `use_seed` is true.
    pub seed: u64,
    /// Use `seed` instead of OS entropy.
    pub use_seed: bool,
}

/// Opaque hourglass handle.
///
/// # Thread Safety
/// Stepping and snapshot copies lock the simulation mutex. Gravity updates go
/// through a latest-value-wins feed and never wait on a running step, so a
/// sensor callback thread can call `hourglass_set_gravity` at any rate.
pub struct HourglassInstance {
    pub(crate) sim: Mutex<HourglassSimulation>,
    pub(crate) gravity: GravitySender,
}

impl HourglassInstance {
    /// # Errors
    ///
    /// Returns `HourglassErrorCode::InvalidParameter` for out-of-range parameters.
    pub(crate) fn new(params: &HourglassParams) -> Result<Box<Self>, DefaultHourglassError> {
        let config = HourglassConfig {
            size: params.size,
            neck_probability: params.neck_probability,
            fill_ratio: params.fill_ratio,
            ..Default::default()
        };
        let rng = if params.use_seed {
            StdRng::seed_from_u64(params.seed)
        } else {
            StdRng::from_os_rng()
        };

        let mut sim = HourglassSimulation::with_config(config, rng)?;
        let (sender, receiver) = gravity_feed();
        sim.attach_gravity_feed(receiver);

        Ok(Box::new(Self {
            sim: Mutex::new(sim),
            gravity: sender,
        }))
    }
}

/// Create a new hourglass and return it via out-parameter.
///
/// Returns
/// - `HourglassErrorCode::Ok` (0) on success, `out_instance` contains valid pointer
/// - `HourglassErrorCode::NullPointer` if `out_instance` is null
/// - `HourglassErrorCode::InvalidParameter` if size, neck probability or fill ratio out of range
///
/// Call `hourglass_get_last_error()` for a human-readable description.
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller owns the returned instance and MUST call `hourglass_destroy` exactly once.
///
/// Example (C)
/// ```c
/// HourglassParams params = { 40, 0.5, 0.9, 0, false };
/// HourglassInstance* sim = NULL;
/// if (hourglass_new(params, &sim) != Ok) {
///     fprintf(stderr, "%s\n", hourglass_get_last_error());
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn hourglass_new(
    params: HourglassParams,
    out_instance: *mut *mut HourglassInstance,
) -> HourglassErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultHourglassError::null_pointer("out_instance"));
    }

    match track_result(HourglassInstance::new(&params)) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            HourglassErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                // Set to null on error (per documentation contract)
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroy an instance created by `hourglass_new`. Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `hourglass_new` and not destroyed already.
/// - The caller must not use the pointer afterwards.
#[no_mangle]
pub unsafe extern "C" fn hourglass_destroy(ptr: *mut HourglassInstance) {
    if ptr.is_null() {
        return;
    }

    debug!("Destroying hourglass instance");
    // SAFETY: the pointer came from `Box::into_raw` in `hourglass_new`.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

/// Advance one tick.
///
/// `out_changed` may be null; otherwise it receives whether any grain moved
/// (and therefore whether the snapshots changed).
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `hourglass_new`.
/// - `out_changed` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn hourglass_step(
    ptr: *const HourglassInstance,
    out_changed: *mut bool,
) -> HourglassErrorCode {
    // SAFETY: caller contract.
    let result = unsafe { with_simulation(ptr, HourglassSimulation::step) };
    match track_result(result) {
        Ok(changed) => {
            if !out_changed.is_null() {
                unsafe {
                    *out_changed = changed;
                }
            }
            HourglassErrorCode::Ok
        }
        Err(code) => code,
    }
}

/// Store the gravity vector used from the next step on. Never blocks on a step.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `hourglass_new`.
#[no_mangle]
pub unsafe extern "C" fn hourglass_set_gravity(
    ptr: *const HourglassInstance,
    gx: f64,
    gy: f64,
) -> HourglassErrorCode {
    // SAFETY: caller contract.
    let result = unsafe { instance_from_ptr(ptr) }.map(|instance| instance.gravity.send(gx, gy));
    result_code(result)
}

/// Feed a raw device-motion reading (acceleration including gravity).
///
/// The reading is swapped into grid axes and rotated by -135°. Pass
/// `has_reading = false` when the device reported no data; the fallback
/// vector `(1, 1)` is used instead.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `hourglass_new`.
#[no_mangle]
pub unsafe extern "C" fn hourglass_set_device_motion(
    ptr: *const HourglassInstance,
    x: f64,
    y: f64,
    has_reading: bool,
) -> HourglassErrorCode {
    // SAFETY: caller contract.
    let result = unsafe { instance_from_ptr(ptr) }.map(|instance| {
        instance
            .gravity
            .send_device_motion(has_reading.then_some(x), has_reading.then_some(y));
    });
    result_code(result)
}
