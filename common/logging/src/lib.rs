use serde::{Deserialize, Serialize};
use slog::Logger;
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::{Format, Severity};
use sloggers::Build;

/// Settings for the terminal logger used by the schema tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum severity to print: one of `trace`, `debug`, `info`, `warning`, `error`,
    /// `critical`.
    pub level: Severity,
    /// Use the single-line `compact` layout rather than the `full` one.
    pub compact: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Severity::Info,
            compact: false,
        }
    }
}

/// Build a terminal logger writing to stderr.
pub fn build_logger(config: &LoggerConfig) -> Result<Logger, String> {
    let format = if config.compact {
        Format::Compact
    } else {
        Format::Full
    };

    TerminalLoggerBuilder::new()
        .level(config.level)
        .format(format)
        .destination(Destination::Stderr)
        .build()
        .map_err(|e| format!("Unable to build logger: {:?}", e))
}

/// Return a logger suitable for test usage.
///
/// By default no logs will be printed, but they can be enabled via the `test_logger` feature:
///
/// ```bash
/// $ cargo test -p beacon_schemas --features 'logging/test_logger'
/// ```
pub fn test_logger() -> Logger {
    if cfg!(feature = "test_logger") {
        TerminalLoggerBuilder::new()
            .level(Severity::Debug)
            .build()
            .expect("Should build test_logger")
    } else {
        sloggers::null::NullLoggerBuilder
            .build()
            .expect("Should build null_logger")
    }
}
