//! Logging setup plus macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("sampler started for session {}", session_id);
//! ```

use std::sync::Once;

const DEBUG_ENV: &str = "REGIONCAP_DEBUG";

static INIT: Once = Once::new();

/// Installs the `env_logger` backend. `RUST_LOG` still wins when set; otherwise
/// the level is Info, or Debug when `REGIONCAP_DEBUG` is `1`/`true`.
///
/// Safe to call more than once.
pub fn init_logging() {
    INIT.call_once(|| {
        let level = if debug_enabled() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };

        let _ = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init();
    });
}

fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
