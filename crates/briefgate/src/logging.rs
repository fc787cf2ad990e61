//! Logging configuration for briefgate.
//!
//! Sets up the tracing subscriber used by the CLI. Log lines go to stderr so
//! that `--json` output on stdout stays machine-readable.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Warnings and above. Command results are printed, not logged.
    #[default]
    Normal,
    /// Info and above, including HTTP calls and ledger changes.
    Verbose,
    /// Everything, including storage reads and writes.
    Trace,
}

impl Verbosity {
    /// Derive verbosity from `-q` and repeated `-v` flags.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }

    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Trace => Level::TRACE,
        }
    }

    /// The default `EnvFilter` directive for this verbosity.
    #[must_use]
    pub fn directive(&self) -> String {
        format!(
            "briefgate={},reqwest=warn,hyper=warn",
            self.to_level_filter()
        )
    }
}

/// Initialize the logging system.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `verbosity` when it is set.
///
/// # Examples
///
/// ```no_run
/// use briefgate::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    // Already installed is fine.
    let _ = subscriber.try_init();
}

/// Initialize logging for tests.
///
/// Only warnings and errors, routed through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
