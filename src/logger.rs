//! Logging setup for the usagescope CLI.
//!
//! Log output goes to stderr through a `tracing-subscriber` registry so that
//! reports written to stdout stay machine readable.
//!
//! The level is chosen in this order:
//! 1. `--verbose`: debug for usagescope
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. info for usagescope

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "usagescope=debug";
const QUIET_FILTER: &str = "usagescope=error";
const DEFAULT_FILTER: &str = "usagescope=info";

/// Picks the filter directives for the given flags.
fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initializes the global subscriber. Call once, before anything logs.
///
/// ```rust,no_run
/// use usagescope::logger::init_logger;
///
/// init_logger(false, false, false);
/// tracing::info!("Analyzing solution");
/// ```
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none())
        .compact();

    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .init();
}
