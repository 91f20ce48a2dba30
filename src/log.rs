use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

/// Global flag to control radio debug logging
pub static RADIO_DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Set radio debug logging on/off
pub fn set_radio_debug(enabled: bool) {
    RADIO_DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    tracing::info!("🔧 Radio debug logging {}", if enabled { "ENABLED" } else { "DISABLED" });
}

/// Check if radio debug logging is enabled
pub fn is_radio_debug_enabled() -> bool {
    RADIO_DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Install the fmt subscriber. `RUST_LOG` wins over `default_directive`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Radio debug macro - only traces if radio debug is enabled
#[macro_export]
macro_rules! radio_debug {
    ($($arg:tt)*) => {
        if $crate::log::RADIO_DEBUG_ENABLED.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::debug!($($arg)*);
        }
    };
}
