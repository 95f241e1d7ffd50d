//! Gated logging macros keyed on a module-level `ENABLE_LOGS` flag.
//!
//! Chatty modules (the embedded document channel, the fitness client) define
//! the flag and route their logs through these so they can be silenced without
//! touching `RUST_LOG`:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("published snapshot {}", seq);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __log_gated {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

/// Info-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::__log_gated!(info, $($arg)*) };
}

/// Debug-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::__log_gated!(debug, $($arg)*) };
}

/// Warn-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::__log_gated!(warn, $($arg)*) };
}

/// Error-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::__log_gated!(error, $($arg)*) };
}
