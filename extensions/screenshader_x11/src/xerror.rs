//! Process-wide Xlib error trap
//!
//! Xlib reports protocol errors through a global callback. The callback only
//! records the code, and call sites check it after a sync.

use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use x11_dl::xlib::{self, Xlib};

static ERROR_OCCURRED: AtomicBool = AtomicBool::new(false);
static LAST_ERROR: AtomicI32 = AtomicI32::new(0);

unsafe extern "C" fn record_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if !event.is_null() {
        // SAFETY: Xlib passes a valid event for the duration of the callback
        let (code, request, minor) =
            unsafe { ((*event).error_code, (*event).request_code, (*event).minor_code) };
        LAST_ERROR.store(i32::from(code), Ordering::SeqCst);
        ERROR_OCCURRED.store(true, Ordering::SeqCst);
        tracing::debug!("X error {} (request {}, minor {})", code, request, minor);
    }
    0
}

/// Route Xlib errors to the trap instead of the default exit-on-error handler
pub(crate) fn install(xlib: &Xlib) {
    unsafe {
        (xlib.XSetErrorHandler)(Some(record_error));
    }
}

/// Forget any previously recorded error
pub(crate) fn clear() {
    ERROR_OCCURRED.store(false, Ordering::SeqCst);
    LAST_ERROR.store(0, Ordering::SeqCst);
}

/// Round-trip to the server and return the error recorded since the last clear
pub(crate) fn sync_and_take(xlib: &Xlib, display: *mut xlib::Display) -> Option<i32> {
    unsafe {
        (xlib.XSync)(display, xlib::False);
    }
    if ERROR_OCCURRED.swap(false, Ordering::SeqCst) {
        Some(LAST_ERROR.swap(0, Ordering::SeqCst))
    } else {
        None
    }
}

/// Human-readable name of a core protocol error code
pub(crate) fn describe(code: i32) -> String {
    match code {
        3 => "BadWindow".to_string(),
        4 => "BadPixmap".to_string(),
        8 => "BadMatch".to_string(),
        9 => "BadDrawable".to_string(),
        11 => "BadAlloc".to_string(),
        _ => format!("X error {}", code),
    }
}
