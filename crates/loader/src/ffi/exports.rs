//! C-compatible exports called by the host loader

use std::ffi::c_char;

use tracing::instrument;

// Shim metadata - static strings with null terminators for C compatibility
static NAME: &[u8] = b"hookshim\0";
static DESCRIPTION: &[u8] = b"Legacy hook compatibility layer\0";
static VERSION: &[u8] = b"0.1.0\0";
static LOG_TAG: &[u8] = b"HOOKSHIM\0";

/// Called when the shim is loaded by the host
///
/// # Safety
/// - `error` must be a valid pointer to a buffer of at least `maxlen`
///   bytes, or null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn hookshim_load(error: *mut c_char, maxlen: usize) -> bool {
    match std::panic::catch_unwind(crate::startup) {
        Ok(()) => {
            tracing::info!("hookshim loaded successfully");
            true
        }
        Err(_) => {
            write_error(error, maxlen, "Panic during startup");
            false
        }
    }
}

/// Called when the shim is unloaded by the host
///
/// # Safety
/// - `error` must be a valid pointer to a buffer of at least `maxlen`
///   bytes, or null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn hookshim_unload(error: *mut c_char, maxlen: usize) -> bool {
    tracing::info!("hookshim unloading...");

    match std::panic::catch_unwind(crate::shutdown) {
        Ok(()) => true,
        Err(_) => {
            write_error(error, maxlen, "Panic during shutdown");
            false
        }
    }
}

// Metadata exports - these return static strings for the host to display

#[no_mangle]
pub extern "C" fn hookshim_get_name() -> *const c_char {
    NAME.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn hookshim_get_description() -> *const c_char {
    DESCRIPTION.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn hookshim_get_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn hookshim_get_log_tag() -> *const c_char {
    LOG_TAG.as_ptr() as *const c_char
}

/// Helper to write an error message to a C buffer
///
/// # Safety
/// - `error` must be a valid pointer or null
/// - `maxlen` must accurately reflect the buffer size
unsafe fn write_error(error: *mut c_char, maxlen: usize, msg: &str) {
    if !error.is_null() && maxlen > 0 {
        let bytes = msg.as_bytes();
        let len = bytes.len().min(maxlen - 1);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), error as *mut u8, len);
        *error.add(len) = 0;
    }
}
