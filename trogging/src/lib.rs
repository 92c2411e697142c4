//! Log initialization and setup

pub mod cli;
pub mod config;

pub use config::*;

use std::io;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Registry,
    filter::ParseError,
    fmt::{self, MakeWriter, writer::BoxMakeWriter},
    layer::SubscriberExt,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidLogFilter { filter: String, source: ParseError },

    #[error("cannot set global tracing subscriber")]
    SetGlobalDefault(#[from] tracing::dispatcher::SetGlobalDefaultError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Builder for the log subscriber.
///
/// Filters are kept as directive strings and parsed in [`Builder::build`], so a bad
/// `--log-filter` surfaces as an [`Error`] instead of a panic.
#[derive(Debug)]
pub struct Builder<W = fn() -> io::Stderr> {
    log_format: LogFormat,
    log_filter: Option<String>,
    // used when log_filter is none.
    default_log_filter: String,
    make_writer: W,
    with_target: bool,
    with_ansi: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Full,
            log_filter: None,
            default_log_filter: Self::DEFAULT_LOG_FILTER.to_string(),
            make_writer: io::stderr,
            with_target: true,
            with_ansi: true,
        }
    }
}

impl Builder {
    pub const DEFAULT_LOG_FILTER: &'static str = "warn";

    pub fn new() -> Self {
        Self::default()
    }
}

impl<W> Builder<W> {
    pub fn with_writer<W2>(self, make_writer: W2) -> Builder<W2>
    where
        W2: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Builder::<W2> {
            make_writer,
            // cannot use `..self` because W type parameter changes
            log_format: self.log_format,
            log_filter: self.log_filter,
            default_log_filter: self.default_log_filter,
            with_target: self.with_target,
            with_ansi: self.with_ansi,
        }
    }

    /// Set log_filter using a simple numeric "verbosity level".
    ///
    /// 0 keeps the existing `log_filter` value.
    pub fn with_log_verbose_count(self, log_verbose_count: u8) -> Self {
        let log_filter = match log_verbose_count {
            0 => self.log_filter,
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        };
        Self { log_filter, ..self }
    }

    pub fn with_log_filter(self, log_filter: Option<String>) -> Self {
        Self { log_filter, ..self }
    }

    pub fn with_default_log_filter(self, default_log_filter: impl Into<String>) -> Self {
        Self {
            default_log_filter: default_log_filter.into(),
            ..self
        }
    }

    pub fn with_log_format(self, log_format: LogFormat) -> Self {
        Self { log_format, ..self }
    }

    pub fn with_log_destination(self, log_destination: LogDestination) -> Builder<BoxMakeWriter> {
        let make_writer = match log_destination {
            LogDestination::Stdout => BoxMakeWriter::new(io::stdout),
            LogDestination::Stderr => BoxMakeWriter::new(io::stderr),
        };
        self.with_writer(make_writer)
    }

    /// Sets whether or not an event's target is displayed.
    ///
    /// Defaults to true. See [tracing_subscriber::fmt::Layer::with_target]
    pub fn with_target(self, with_target: bool) -> Self {
        Self {
            with_target,
            ..self
        }
    }

    /// Enable/disable ANSI encoding for formatted events (i.e. colors).
    ///
    /// Defaults to true. See [tracing_subscriber::fmt::Layer::with_ansi]
    pub fn with_ansi(self, with_ansi: bool) -> Self {
        Self { with_ansi, ..self }
    }
}

impl<W> Builder<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn env_filter(&self) -> Result<EnvFilter> {
        let filter = self
            .log_filter
            .as_deref()
            .unwrap_or(&self.default_log_filter);
        EnvFilter::try_new(filter).map_err(|source| Error::InvalidLogFilter {
            filter: filter.to_string(),
            source,
        })
    }

    pub fn build(self) -> Result<impl Subscriber + Send + Sync + 'static> {
        let env_filter = self.env_filter()?;

        let log_writer = self.make_writer;
        let with_target = self.with_target;
        let with_ansi = self.with_ansi;

        // exactly one of these is Some; a None layer is a no-op
        let (log_format_full, log_format_pretty, log_format_json) = match self.log_format {
            LogFormat::Full => (
                Some(
                    fmt::layer()
                        .with_writer(log_writer)
                        .with_target(with_target)
                        .with_ansi(with_ansi),
                ),
                None,
                None,
            ),
            LogFormat::Pretty => (
                None,
                Some(
                    fmt::layer()
                        .pretty()
                        .with_writer(log_writer)
                        .with_target(with_target)
                        .with_ansi(with_ansi),
                ),
                None,
            ),
            LogFormat::Json => (
                None,
                None,
                Some(
                    fmt::layer()
                        .json()
                        .with_writer(log_writer)
                        .with_target(with_target)
                        .with_ansi(with_ansi),
                ),
            ),
        };

        Ok(Registry::default()
            .with(env_filter)
            .with(log_format_full)
            .with(log_format_pretty)
            .with(log_format_json))
    }

    /// Build the subscriber and install it as the global default for all threads.
    pub fn install_global(self) -> Result<()> {
        let subscriber = self.build()?;
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(())
    }
}
