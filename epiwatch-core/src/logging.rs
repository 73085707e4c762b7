//! Subscriber setup for applications that embed the pipeline.
//!
//! The library itself only emits `tracing` events (stage transitions at
//! `info`, advisory verdicts at `warn`, per-rule detail at `debug`). An
//! embedding binary calls [`init_logging`] once, usually with the
//! [`LoggingConfig`] carried in its [`PipelineConfig`](crate::PipelineConfig).

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::error::{EpiwatchError, Result};

/// Line format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// One JSON object per event, including the `pipeline_run` span fields
    Json,
}

/// Logging options for an embedding application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 0 = info, 1 = debug, 2+ = trace
    pub verbose: u8,
    /// Only errors, whatever `verbose` says
    pub quiet: bool,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, e.g. `"epiwatch_core::quality=trace"`
    pub directives: Option<String>,
}

impl LoggingConfig {
    /// Creates a config from the usual verbosity flags.
    pub fn new(verbose: u8, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            ..Self::default()
        }
    }

    /// Builder method to set the line format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder method to add filter directives.
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    /// Default level implied by the verbosity flags.
    pub fn level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    /// Builds the event filter: the verbosity level plus any directives.
    ///
    /// # Errors
    /// `Configuration` if a directive does not parse.
    pub fn filter(&self) -> Result<EnvFilter> {
        let builder =
            EnvFilter::builder().with_default_directive(LevelFilter::from_level(self.level()).into());

        match self.directives.as_deref() {
            Some(directives) => builder.parse(directives).map_err(|e| {
                EpiwatchError::configuration(format!(
                    "invalid log directives '{}': {}",
                    directives, e
                ))
            }),
            None => Ok(builder.parse_lossy("")),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
/// `Configuration` if the directives are invalid or a global subscriber is
/// already installed.
///
/// # Example
/// ```rust,no_run
/// use epiwatch_core::logging::{LogFormat, LoggingConfig, init_logging};
///
/// init_logging(&LoggingConfig::new(1, false).with_format(LogFormat::Json))
///     .expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter()?)
        .with_target(false);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };

    installed.map_err(|e| {
        EpiwatchError::configuration(format!("Failed to initialize logging: {}", e))
    })
}
