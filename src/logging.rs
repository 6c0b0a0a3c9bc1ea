//! Logging setup
//!
//! Installs `env_logger` behind the `log` facade with second-precision
//! timestamps and no module targets. `RUST_LOG` still overrides the default
//! `info` filter.

/// Initializes the global logger. Safe to call more than once; later calls
/// are ignored.
pub fn init() {
    let _ = builder().try_init();
}

fn builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs().format_target(false);
    builder
}
