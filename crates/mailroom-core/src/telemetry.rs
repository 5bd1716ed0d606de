//! Logging bootstrap
//!
//! TigerStyle: Explicit telemetry configuration, one global subscriber.
//!
//! Logs go to stderr so that a command printing machine-readable output on
//! stdout (`mailroom simulate --json`) stays parseable at any verbosity.

use crate::error::{Error, Result};

/// Service name used when none is configured
pub const TELEMETRY_SERVICE_NAME_DEFAULT: &str = "mailroom";

/// Line layout for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One line per event with fields inline
    #[default]
    Full,
    /// Shorter lines, span context folded in
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// Filter directive used when RUST_LOG is unset
    pub log_level: String,
    pub format: LogFormat,
    /// Colour escapes in log lines
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: TELEMETRY_SERVICE_NAME_DEFAULT.to_string(),
            log_level: "warn".to_string(),
            format: LogFormat::default(),
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Map a `-v` count to a level (0 = warn, 1 = info, 2 = debug, more = trace)
    pub fn with_verbosity(self, verbose: u8) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        self.with_log_level(level)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Apply environment overrides on top of this configuration
    ///
    /// Reads:
    /// - `MAILROOM_SERVICE_NAME`: service name
    /// - `MAILROOM_LOG_FORMAT`: `full` or `compact` (unknown values are ignored)
    /// - `NO_COLOR`: any value disables colour
    ///
    /// `RUST_LOG` is honoured later, by `init_telemetry`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = std::env::var("MAILROOM_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Some(format) = std::env::var("MAILROOM_LOG_FORMAT")
            .ok()
            .and_then(|value| LogFormat::parse(&value))
        {
            self.format = format;
        }
        if std::env::var_os("NO_COLOR").is_some() {
            self.ansi = false;
        }
        self
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Fails if a global subscriber is
/// already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(false);
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Full => registry.with(fmt_layer).try_init(),
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init(),
    };
    installed
        .map_err(|e| Error::internal(format!("failed to initialize tracing subscriber: {}", e)))?;

    tracing::info!(
        service = %config.service_name,
        format = ?config.format,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Logs when the process winds down
#[derive(Debug)]
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "Telemetry shut down");
    }
}
