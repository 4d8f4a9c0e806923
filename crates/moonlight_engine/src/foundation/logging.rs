//! Logging setup

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Defaults to `info` and honours `RUST_LOG` when set. Safe to call more
/// than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
