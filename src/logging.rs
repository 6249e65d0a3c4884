//! Logging initialization for the powerwatch daemon.
//!
//! Diagnostics go to stderr; notifications are the user-facing surface, so
//! stdout stays untouched. TTY output gets the default formatting, piped or
//! service-managed output gets the compact plain format.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// * `verbose` - 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - only errors
///
/// `RUST_LOG` overrides the default filter (e.g. `pwatch=debug,zbus=warn`).
pub fn init_logging(verbose: u8, quiet: bool) {
    let default_directive = if quiet {
        "pwatch=error"
    } else {
        match verbose {
            0 => "pwatch=info",
            1 => "pwatch=debug",
            _ => "pwatch=trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    if io::stderr().is_terminal() {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
