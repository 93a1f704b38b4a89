//! Logging facade for the quire workspace
//!
//! Every crate logs through the macros exported here so one environment
//! variable controls the whole build.
//!
//! Usage:
//! - Set QUIRE_LOG=off (default) - no logs
//! - Set QUIRE_LOG=info - build summary, per-document timings
//! - Set QUIRE_LOG=debug - per-section conversion details

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

static INIT: Once = Once::new();

/// Log levels accepted by [`init_with_level`] and the `QUIRE_LOG` variable.
pub const LEVELS: &[&str] = &["off", "error", "warn", "info", "debug"];

/// Initialize diagnostics based on the QUIRE_LOG environment variable
///
/// This should be called once at application startup. It's safe to call
/// multiple times - subsequent calls will be ignored.
pub fn init_diagnostics() {
    let level = std::env::var("QUIRE_LOG").unwrap_or_else(|_| "off".to_string());
    init_with_level(&level);
}

/// Initialize diagnostics at an explicit level, ignoring QUIRE_LOG.
///
/// The CLI's `--debug` flag uses this to force `debug`.
pub fn init_with_level(log_level: &str) {
    INIT.call_once(|| {
        let min = match log_level {
            "off" => return,
            "debug" => emit::Level::Debug,
            "info" => emit::Level::Info,
            "warn" => emit::Level::Warn,
            "error" => emit::Level::Error,
            _ => {
                // Bootstrap warning - the emitter is not running yet
                eprintln!("Warning: Unknown QUIRE_LOG value '{}', using 'info'", log_level);
                emit::Level::Info
            }
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(min))
            .init();

        // The runtime must outlive every log call in the process
        std::mem::forget(rt);
    });
}

/// Log basic operations (documents built, files written)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (per-section counters, converter invocations)
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems (highlighter failures, unknown options)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that abort a build
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Log basic operations (documents built, files written)
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (per-section counters, converter invocations)
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems (highlighter failures, unknown options)
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that abort a build
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Re-export the init function for convenience
pub use init_diagnostics as init;
