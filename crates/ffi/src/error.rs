use hourglass_core::HourglassError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait HourglassFfiError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> HourglassErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `HourglassFfiError` for every failure this layer reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultHourglassError {
    code: HourglassErrorCode,
    msg: String,
}

impl DefaultHourglassError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: HourglassErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: HourglassErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for a caller buffer shorter than the data to copy.
    pub fn buffer_too_small(param_name: &str, required: usize, provided: usize) -> Self {
        Self {
            code: HourglassErrorCode::BufferTooSmall,
            msg: format!("Buffer '{param_name}' holds {provided} cells, {required} required"),
        }
    }
}

impl From<HourglassError> for DefaultHourglassError {
    fn from(error: HourglassError) -> Self {
        Self {
            code: HourglassErrorCode::InvalidParameter,
            msg: error.to_string(),
        }
    }
}

impl HourglassFfiError for DefaultHourglassError {
    fn code(&self) -> HourglassErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by hourglass functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourglassErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: a panic occurred while another thread held the simulation.
    LockPoisoned = 2,

    /// Invalid parameter: chamber size, neck probability or fill ratio out of range.
    InvalidParameter = 3,

    /// Output buffer shorter than one chamber (`n*n` cells).
    BufferTooSmall = 4,
}

impl From<DefaultHourglassError> for HourglassErrorCode {
    fn from(error: DefaultHourglassError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (C string, error code).
    /// The `CString` is kept here so pointers handed out stay valid.
    static LAST_ERROR: RefCell<(Option<CString>, HourglassErrorCode)> = const { RefCell::new((None, HourglassErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, HourglassErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, HourglassErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if the last call on this thread succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```cpp
/// HourglassInstance* sim = nullptr;
/// HourglassErrorCode err = hourglass_new(params, &sim);
/// if (err != Ok) {
///     printf("Hourglass creation failed: %s\n", hourglass_get_last_error());
/// }
/// ```
#[no_mangle]
pub extern "C" fn hourglass_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code on this thread.
#[no_mangle]
pub extern "C" fn hourglass_get_last_error_code() -> HourglassErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
