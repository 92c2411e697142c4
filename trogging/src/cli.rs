//! Common CLI flags for logging
use tracing_subscriber::fmt::{MakeWriter, writer::BoxMakeWriter};

use crate::{Builder, Result, config::*};

/// CLI config for the logging related subset of options.
#[derive(Debug, Clone, clap::Parser)]
pub struct LoggingConfig {
    /// Logs: filter directive
    ///
    /// Configures log severity level filter, by target.
    ///
    /// Simplest options: error, warn, info, debug, trace
    ///
    /// Levels for different modules can be specified. For example
    /// `debug,tsbench_stats=info` logs everything at debug except the statistics
    /// crate, which only logs at info.
    ///
    /// Overridden by `-v`.
    #[clap(long = "log-filter", env = "LOG_FILTER", global = true, action)]
    pub log_filter: Option<String>,

    /// Logs: filter short-hand
    ///
    /// Convenient way to set log severity level filter.
    /// Overrides `--log-filter`.
    ///
    /// -v   'info'
    ///
    /// -vv  'debug'
    ///
    /// -vvv 'trace'
    #[clap(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        verbatim_doc_comment
    )]
    pub log_verbose_count: u8,

    /// Logs: destination
    #[clap(
        long = "log-destination",
        env = "LOG_DESTINATION",
        value_enum,
        default_value_t = LogDestination::Stderr,
        global = true,
        action
    )]
    pub log_destination: LogDestination,

    /// Logs: message format
    ///
    /// full: human-readable, single line
    ///
    /// pretty: human-readable, multi line
    ///
    /// json: machine-parseable, one object per line
    #[clap(
        long = "log-format",
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Full,
        global = true,
        verbatim_doc_comment,
        action
    )]
    pub log_format: LogFormat,
}

impl LoggingConfig {
    pub fn to_builder(&self) -> Builder<BoxMakeWriter> {
        self.with_builder(Builder::new())
    }

    pub fn with_builder<W>(&self, builder: Builder<W>) -> Builder<BoxMakeWriter> {
        builder
            .with_log_filter(self.log_filter.clone())
            // after with_log_filter because -v overrides --log-filter
            .with_log_verbose_count(self.log_verbose_count)
            .with_log_format(self.log_format)
            .with_log_destination(self.log_destination)
    }

    pub fn install_global_subscriber(&self) -> Result<()> {
        self.to_builder().install_global()
    }
}

/// Extends the trogging [`crate::Builder`] API.
pub trait LoggingConfigBuilderExt {
    /// Applies all config entries from a [`LoggingConfig`] to a [`crate::Builder`].
    fn with_logging_config(self, config: &LoggingConfig) -> Builder<BoxMakeWriter>;
}

impl<W> LoggingConfigBuilderExt for Builder<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn with_logging_config(self, config: &LoggingConfig) -> Builder<BoxMakeWriter> {
        config.with_builder(self)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::test_util::simple_test;

    #[test]
    fn defaults() {
        let cfg = LoggingConfig::try_parse_from(["cli"]).unwrap();
        assert_eq!(cfg.log_verbose_count, 0);
        assert_eq!(cfg.log_destination, LogDestination::Stderr);
        assert_eq!(cfg.log_format, LogFormat::Full);
    }

    #[test]
    fn log_verbose_count() {
        let cfg = LoggingConfig::try_parse_from(["cli", "-vv"]).unwrap();
        assert_eq!(cfg.log_verbose_count, 2);
        assert_eq!(
            simple_test(cfg.with_builder(Builder::new())).without_timestamps(),
            vec!["ERROR foo", "WARN woo", "INFO bar", "DEBUG baz"]
        );
    }

    #[test]
    fn custom_default_log_level() {
        let cfg = LoggingConfig::try_parse_from(["cli"]).unwrap();
        assert_eq!(
            simple_test(
                Builder::new()
                    .with_default_log_filter("info")
                    .with_logging_config(&cfg)
            )
            .without_timestamps(),
            vec!["ERROR foo", "WARN woo", "INFO bar"]
        );

        let cfg = LoggingConfig::try_parse_from(["cli", "--log-filter=error"]).unwrap();
        assert_eq!(
            simple_test(
                Builder::new()
                    .with_default_log_filter("info")
                    .with_logging_config(&cfg)
            )
            .without_timestamps(),
            vec!["ERROR foo"]
        );
    }

    #[test]
    fn format_and_destination() {
        let cfg = LoggingConfig::try_parse_from([
            "cli",
            "--log-format",
            "json",
            "--log-destination",
            "stdout",
        ])
        .unwrap();
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.log_destination, LogDestination::Stdout);

        assert!(LoggingConfig::try_parse_from(["cli", "--log-format", "logfmt"]).is_err());
    }
}
