//! Tracing subscriber setup.
//!
//! [`TracingSetup`] installs a `tracing` subscriber for binaries that embed
//! Strata. Libraries in the workspace only emit events; they never install a
//! subscriber themselves.
//!
//! Two kinds of events are emitted during an evaluation: engine diagnostics
//! under the crate targets (`strata_apply`, `strata_graph`) and lifecycle
//! events under [`LIFECYCLE_TARGET`]. The two can be filtered independently.
//!
//! # Example
//!
//! ```
//! use strata_core::{StackConfig, TracingFormat, TracingSetup};
//! use tracing::Level;
//!
//! let config = StackConfig::new().with_debug_mode(true);
//!
//! // Debug mode raises the default level.
//! let setup = TracingSetup::for_config(&config).with_format(TracingFormat::Compact);
//! assert_eq!(setup.level(), Level::DEBUG);
//! assert_eq!(setup.directives(), "debug,strata::lifecycle=debug");
//!
//! setup.init();
//! ```

use core::fmt;
use core::str::FromStr;

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::StackConfig;

/// Target of the events describing an evaluation's progress.
pub const LIFECYCLE_TARGET: &str = "strata::lifecycle";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line output for interactive runs.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON, for CI logs.
    Json,
}

impl FromStr for TracingFormat {
    type Err = UnknownFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(UnknownFormat(raw.to_owned())),
        }
    }
}

/// Returned when parsing a [`TracingFormat`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format '{0}', expected pretty, compact or json")]
pub struct UnknownFormat(String);

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct TracingSetup {
    level: Level,
    /// `None` hides lifecycle events entirely.
    lifecycle: Option<Level>,
    format: TracingFormat,
    /// Replaces the derived directives when set.
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            lifecycle: Some(Level::INFO),
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingSetup {
    /// Creates a setup logging at `info`, lifecycle events included.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a setup whose levels follow the stack's debug mode.
    ///
    /// Debug mode also shows per-resource lifecycle events, which are logged
    /// at `debug`.
    #[must_use]
    pub fn for_config(config: &StackConfig) -> Self {
        let level = if config.debug_mode() {
            Level::DEBUG
        } else {
            Level::INFO
        };
        Self::default().with_level(level).with_lifecycle(Some(level))
    }

    /// Sets the level of engine diagnostics.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the level of lifecycle events, or hides them with `None`.
    #[must_use]
    pub fn with_lifecycle(mut self, level: Option<Level>) -> Self {
        self.lifecycle = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Replaces the derived directives, e.g. `strata_apply=trace,warn`.
    ///
    /// An unparsable filter falls back to the derived directives.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Logs the `evaluate` span opening and closing.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the diagnostics level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the format.
    #[must_use]
    pub fn format(&self) -> TracingFormat {
        self.format
    }

    /// Returns the filter directives derived from the levels.
    #[must_use]
    pub fn directives(&self) -> String {
        let lifecycle = self
            .lifecycle
            .map_or_else(|| "off".to_owned(), |level| level.as_str().to_ascii_lowercase());
        format!(
            "{},{LIFECYCLE_TARGET}={lifecycle}",
            self.level.as_str().to_ascii_lowercase()
        )
    }

    fn filter(&self) -> EnvFilter {
        let derived = || EnvFilter::new(self.directives());
        match &self.env_filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| derived()),
            None => derived(),
        }
    }

    fn output_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = tracing_subscriber::fmt::layer().with_span_events(span_events);
        match self.format {
            TracingFormat::Pretty => layer.pretty().boxed(),
            TracingFormat::Compact => layer.compact().boxed(),
            TracingFormat::Json => layer.json().boxed(),
        }
    }

    /// Installs the global subscriber.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init(&self) {
        let installed = tracing_subscriber::registry()
            .with(self.output_layer())
            .with(self.filter())
            .try_init()
            .is_ok();

        if installed {
            tracing::debug!(
                directives = %self.directives(),
                format = ?self.format,
                "tracing initialized"
            );
        }
    }
}

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_logs_info_with_lifecycle() {
        let setup = TracingSetup::default();
        assert_eq!(setup.level(), Level::INFO);
        assert_eq!(setup.format(), TracingFormat::Pretty);
        assert_eq!(setup.directives(), "info,strata::lifecycle=info");
    }

    #[test]
    fn debug_mode_raises_both_levels() {
        let config = StackConfig::new().with_debug_mode(true);
        assert_eq!(
            TracingSetup::for_config(&config).directives(),
            "debug,strata::lifecycle=debug"
        );
        assert_eq!(
            TracingSetup::for_config(&StackConfig::new()).level(),
            Level::INFO
        );
    }

    #[test]
    fn lifecycle_can_be_hidden() {
        let setup = TracingSetup::new()
            .with_level(Level::WARN)
            .with_lifecycle(None);
        assert_eq!(setup.directives(), "warn,strata::lifecycle=off");
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("JSON".parse(), Ok(TracingFormat::Json));
        assert_eq!(" compact ".parse(), Ok(TracingFormat::Compact));
        assert_eq!(TracingFormat::Pretty.to_string(), "pretty");
        assert!("yaml".parse::<TracingFormat>().is_err());
    }

    #[test]
    fn init_twice_does_not_panic() {
        TracingSetup::new()
            .with_format(TracingFormat::Compact)
            .with_env_filter("not a [valid filter")
            .init();
        TracingSetup::new().with_span_events(true).init();
    }
}
