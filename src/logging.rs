//! Diagnostic logging setup
//!
//! Diagnostics go to stderr through the `log` facade; stdout is reserved for
//! the plugin output the monitoring daemon parses.

use log::LevelFilter;

/// Map the number of `-v` flags to a log level
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the stderr logger; `RUST_LOG` takes precedence over `-v`
pub fn init(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for(verbosity))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .parse_default_env();

    // A logger may already be installed when embedded in tests
    let _ = builder.try_init();
}
