// src/logging.rs

//! Logger setup shared by the demo binary and embedding applications.

/// Install `env_logger`. Default filter is "info" if RUST_LOG is not set.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .try_init();
}
