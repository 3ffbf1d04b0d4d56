use hourglass_core::{ChamberSnapshot, HourglassSimulation};
use std::ptr;

use crate::error::{DefaultHourglassError, HourglassErrorCode};
use crate::helpers::{result_code, track_error, with_simulation};
use crate::instance::HourglassInstance;

/// Which half of the published snapshot to copy.
#[derive(Debug, Clone, Copy)]
enum Chamber {
    Bottom,
    Top,
}

impl Chamber {
    fn cells(self, snapshot: &ChamberSnapshot) -> &[bool] {
        match self {
            Self::Bottom => &snapshot.bottom,
            Self::Top => &snapshot.top,
        }
    }

    fn param_name(self) -> &'static str {
        match self {
            Self::Bottom => "out_bottom",
            Self::Top => "out_top",
        }
    }
}

/// # Safety
/// `ptr` as for `with_simulation`; `out_buf` valid for `len` writes.
unsafe fn copy_chamber(
    ptr: *const HourglassInstance,
    chamber: Chamber,
    out_buf: *mut bool,
    len: usize,
) -> HourglassErrorCode {
    if out_buf.is_null() {
        return track_error(&DefaultHourglassError::null_pointer(chamber.param_name()));
    }

    let copy = |sim: &mut HourglassSimulation| {
        let cells = chamber.cells(sim.snapshot());
        if cells.len() > len {
            return Err(DefaultHourglassError::buffer_too_small(
                chamber.param_name(),
                cells.len(),
                len,
            ));
        }
        // SAFETY: `out_buf` holds at least `len >= cells.len()` writable cells.
        unsafe {
            ptr::copy_nonoverlapping(cells.as_ptr(), out_buf, cells.len());
        }
        Ok(())
    };

    // SAFETY: caller contract.
    let result = unsafe { with_simulation(ptr, copy) };
    result_code(result.and_then(|copied| copied))
}

#[no_mangle]
/// Copy the top chamber of the latest published snapshot into `out_top`.
///
/// Cells are in row-major order, `n*n` of them; `true` means a grain.
/// The snapshot only changes on steps where a grain moved.
///
/// Returns
/// - `HourglassErrorCode::Ok` (0) on success
/// - `HourglassErrorCode::NullPointer` if `ptr` or `out_top` is null
/// - `HourglassErrorCode::BufferTooSmall` if `len < n*n` (nothing is written)
/// - `HourglassErrorCode::LockPoisoned` if the simulation lock is poisoned
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `hourglass_new` or null.
/// - `out_top` must be null or valid for `len` writes.
pub unsafe extern "C" fn hourglass_copy_top(
    ptr: *const HourglassInstance,
    out_top: *mut bool,
    len: usize,
) -> HourglassErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe { copy_chamber(ptr, Chamber::Top, out_top, len) }
}

#[no_mangle]
/// Copy the bottom chamber of the latest published snapshot into `out_bottom`.
///
/// Same layout and error codes as `hourglass_copy_top`.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `hourglass_new` or null.
/// - `out_bottom` must be null or valid for `len` writes.
pub unsafe extern "C" fn hourglass_copy_bottom(
    ptr: *const HourglassInstance,
    out_bottom: *mut bool,
    len: usize,
) -> HourglassErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe { copy_chamber(ptr, Chamber::Bottom, out_bottom, len) }
}

#[no_mangle]
/// Write the chamber side length `n` into `out_size`.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `hourglass_new` or null.
/// - `out_size` must be a valid, non-null pointer to a `usize`.
pub unsafe extern "C" fn hourglass_get_size(
    ptr: *const HourglassInstance,
    out_size: *mut usize,
) -> HourglassErrorCode {
    if out_size.is_null() {
        return track_error(&DefaultHourglassError::null_pointer("out_size"));
    }

    // SAFETY: caller contract.
    let result = unsafe { with_simulation(ptr, |sim| sim.size()) }.map(|size| unsafe {
        *out_size = size;
    });
    result_code(result)
}

#[no_mangle]
/// Write the number of grains in each chamber of the live grid.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `hourglass_new` or null.
/// - `out_bottom` and `out_top` must be valid, non-null pointers to `usize`.
pub unsafe extern "C" fn hourglass_get_counts(
    ptr: *const HourglassInstance,
    out_bottom: *mut usize,
    out_top: *mut usize,
) -> HourglassErrorCode {
    if out_bottom.is_null() {
        return track_error(&DefaultHourglassError::null_pointer("out_bottom"));
    }
    if out_top.is_null() {
        return track_error(&DefaultHourglassError::null_pointer("out_top"));
    }

    // SAFETY: caller contract.
    let result = unsafe { with_simulation(ptr, |sim| sim.grid().chamber_counts()) }.map(
        |(bottom, top)| unsafe {
            *out_bottom = bottom;
            *out_top = top;
        },
    );
    result_code(result)
}

#[no_mangle]
/// Write the generation of the latest published snapshot.
///
/// Starts at 0 and increases by one each time a step moves at least one
/// grain, so hosts can skip redraws when it is unchanged.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `hourglass_new` or null.
/// - `out_generation` must be a valid, non-null pointer to a `u64`.
pub unsafe extern "C" fn hourglass_get_generation(
    ptr: *const HourglassInstance,
    out_generation: *mut u64,
) -> HourglassErrorCode {
    if out_generation.is_null() {
        return track_error(&DefaultHourglassError::null_pointer("out_generation"));
    }

    // SAFETY: caller contract.
    let result = unsafe { with_simulation(ptr, |sim| sim.snapshot().generation) }.map(
        |generation| unsafe {
            *out_generation = generation;
        },
    );
    result_code(result)
}
