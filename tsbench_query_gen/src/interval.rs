//! Time ranges for generated queries.
//!
//! A [`TimeInterval`] is created once for the whole benchmark, then every generated query draws a
//! random sub-window out of it with [`TimeInterval::rand_window`]. Bounds are stored as integer
//! nanoseconds since the epoch and only turned into strings when a backend renders them.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("end time {end} is before start time {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("timestamp {0} cannot be represented in nanoseconds since the epoch")]
    OutOfRange(String),

    #[error(
        "random window of {} does not fit into an interval spanning {}",
        humantime::format_duration(*window),
        humantime::format_duration(*span)
    )]
    WindowTooLarge { window: Duration, span: Duration },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A closed time range `[start, end]`, with `start <= end` guaranteed on construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    start: i64,
    end: i64,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let start_ns = start
            .timestamp_nanos_opt()
            .ok_or_else(|| Error::OutOfRange(start.to_rfc3339()))?;
        let end_ns = end
            .timestamp_nanos_opt()
            .ok_or_else(|| Error::OutOfRange(end.to_rfc3339()))?;
        Self::from_unix_nanos(start_ns, end_ns)
    }

    pub fn from_unix_nanos(start: i64, end: i64) -> Result<Self> {
        if end < start {
            return Err(Error::EndBeforeStart {
                start: format_nanos(start),
                end: format_nanos(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.span_nanos())
    }

    pub fn start(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.start)
    }

    pub fn end(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.end)
    }

    pub fn start_unix_nano(&self) -> i64 {
        self.start
    }

    pub fn end_unix_nano(&self) -> i64 {
        self.end
    }

    pub fn start_unix_millis(&self) -> i64 {
        self.start.div_euclid(1_000_000)
    }

    pub fn end_unix_millis(&self) -> i64 {
        self.end.div_euclid(1_000_000)
    }

    /// RFC3339 formatted start, e.g. `2016-01-01T00:00:00Z`
    pub fn start_string(&self) -> String {
        format_nanos(self.start)
    }

    /// RFC3339 formatted end, e.g. `2016-01-01T12:00:00Z`
    pub fn end_string(&self) -> String {
        format_nanos(self.end)
    }

    /// Pick a window of length `window` whose start is drawn uniformly from
    /// `[start, end - window]`.
    ///
    /// A window as long as the whole interval always returns the interval itself.
    pub fn rand_window<R: Rng + ?Sized>(&self, window: Duration, rng: &mut R) -> Result<Self> {
        let span = self.span_nanos();
        let window_ns = u64::try_from(window.as_nanos())
            .ok()
            .filter(|w| *w <= span)
            .ok_or(Error::WindowTooLarge {
                window,
                span: self.duration(),
            })?;

        let slack = span - window_ns;
        let offset = if slack == 0 {
            0
        } else {
            rng.gen_range(0..=slack)
        };

        // both fit: start + offset + window_ns <= end
        let start = self.start + offset as i64;
        Ok(Self {
            start,
            end: start + window_ns as i64,
        })
    }

    /// Like [`Self::rand_window`] but for windows known to fit.
    ///
    /// # Panics
    ///
    /// If `window` is longer than the interval.
    pub fn must_rand_window<R: Rng + ?Sized>(&self, window: Duration, rng: &mut R) -> Self {
        match self.rand_window(window, rng) {
            Ok(w) => w,
            Err(e) => panic!("{e}"),
        }
    }

    fn span_nanos(&self) -> u64 {
        self.end.abs_diff(self.start)
    }
}

fn format_nanos(ns: i64) -> String {
    DateTime::from_timestamp_nanos(ns).to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
