use crate::error::{
    with_last_error_mut, DefaultHourglassError, HourglassErrorCode, HourglassFfiError,
};
use crate::instance::HourglassInstance;
use hourglass_core::HourglassSimulation;
use std::ffi::CString;
use tracing::warn;

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl HourglassFfiError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Record `error` in thread-local storage and return its code.
#[inline]
pub(crate) fn track_error(error: &impl HourglassFfiError) -> HourglassErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, or clear the last error on success.
pub(crate) fn track_result<T>(result: Result<T, DefaultHourglassError>) -> Result<T, HourglassErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Collapse a unit result into the code returned across the boundary.
pub(crate) fn result_code(result: Result<(), DefaultHourglassError>) -> HourglassErrorCode {
    match track_result(result) {
        Ok(()) => HourglassErrorCode::Ok,
        Err(code) => code,
    }
}

/// Clear the thread-local error message and code.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = HourglassErrorCode::Ok;
    });
}

/// Borrow an instance from a caller-supplied pointer.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `hourglass_new`.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const HourglassInstance,
) -> Result<&'a HourglassInstance, DefaultHourglassError> {
    // SAFETY: caller guarantees `ptr` is null or valid for the returned lifetime.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultHourglassError::null_pointer("ptr"))
}

/// Run `func` with exclusive access to the simulation behind `ptr`.
///
/// # Safety
/// Same contract as [`instance_from_ptr`].
pub(crate) unsafe fn with_simulation<F, T>(
    ptr: *const HourglassInstance,
    func: F,
) -> Result<T, DefaultHourglassError>
where
    F: FnOnce(&mut HourglassSimulation) -> T,
{
    // SAFETY: forwarded caller contract.
    let instance = unsafe { instance_from_ptr(ptr) }?;
    let mut sim = instance.sim.lock().map_err(|_| {
        warn!("Hourglass simulation lock poisoned");
        DefaultHourglassError::lock_poisoned("simulation")
    })?;
    Ok(func(&mut sim))
}
