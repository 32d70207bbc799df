//! Diagnostics for the `encore-*` tools
//!
//! Everything is written to stderr; stdout carries only list output so it
//! can be piped into `jq`. The filter comes from `RUST_LOG` when set,
//! otherwise from `ENCORE_LOG_LEVEL` (default `warn`), and the HTTP stack
//! underneath `reqwest` is held at `warn` unless asked for explicitly.
//!
//! ```no_run
//! use libencore::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "debug", false).init();
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Crates whose debug output drowns out ours
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Plain lines without colors
    #[default]
    Text,
    /// One JSON object per event
    Json,
    /// Multi-line, colored, with source locations
    Pretty,
}

impl LogFormat {
    fn name(self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [LogFormat::Text, LogFormat::Json, LogFormat::Pretty]
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown log format '{}' (expected text, json or pretty)", s))
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level or directive list for our own crates, e.g. `info` or `libencore=trace`
    pub level: String,
    /// `-v`: raise our crates to `debug`
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: impl Into<String>, verbose: bool) -> Self {
        Self {
            format,
            level: level.into(),
            verbose,
        }
    }

    /// Read `ENCORE_LOG_FORMAT` and `ENCORE_LOG_LEVEL`
    ///
    /// Unparseable or empty values fall back to text and `warn`.
    pub fn from_env(verbose: bool) -> Self {
        let format = std::env::var("ENCORE_LOG_FORMAT")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(format) => Some(format),
                Err(e) => {
                    eprintln!("Warning: ENCORE_LOG_FORMAT: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        let level = std::env::var("ENCORE_LOG_LEVEL")
            .ok()
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| "warn".to_string());

        Self::new(format, level, verbose)
    }

    /// Filter directives used when `RUST_LOG` is unset
    pub fn directives(&self) -> String {
        let base = if self.verbose { "debug" } else { self.level.as_str() };
        let mut directives = vec![base.to_string()];
        for target in NOISY_TARGETS {
            // An explicit directive for the target wins
            if !base.contains(target) {
                directives.push(format!("{}=warn", target));
            }
        }
        directives.join(",")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(self.directives()).unwrap_or_else(|e| {
                eprintln!("Warning: invalid log level '{}': {}", self.level, e);
                EnvFilter::new("warn")
            })
        })
    }

    /// Install the global subscriber
    ///
    /// Later calls in the same process are no-ops.
    pub fn init(&self) {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_writer(std::io::stderr);

        let installed = match self.format {
            LogFormat::Text => builder.with_target(false).with_ansi(false).try_init(),
            LogFormat::Json => builder.json().flatten_event(true).try_init(),
            LogFormat::Pretty => builder.pretty().with_file(true).with_line_number(true).try_init(),
        };

        if installed.is_ok() {
            tracing::debug!(format = %self.format, "Logging initialized");
        }
    }
}

/// Logging from the environment, not verbose
///
/// ```bash
/// ENCORE_LOG_FORMAT=json ENCORE_LOG_LEVEL=debug encore-shows --search jazz
/// ```
pub fn init_default() {
    LoggingConfig::from_env(false).init();
}
