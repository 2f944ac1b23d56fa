//! Logging initialization.
//!
//! Log output goes to stderr so that command output on stdout stays clean
//! for piping. Filtering follows `LOREKEEPER_LOG` when set (standard
//! `tracing_subscriber::EnvFilter` syntax), otherwise a default derived from
//! the `--verbose` flag.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "LOREKEEPER_LOG";

/// Initializes the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "lorekeeper=debug,info"
    } else {
        "lorekeeper=info,warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
