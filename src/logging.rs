//! Tracing setup. `log` records from the core crate are bridged in.

use tracing_subscriber::EnvFilter;

/// Filter from `--log-level`, else `RUST_LOG`, else `info`.
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays
/// parseable. A second call is a no-op.
pub fn init(level: Option<&str>, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json || cfg!(feature = "logs-json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {}", e);
    }
}
