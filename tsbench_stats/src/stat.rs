use std::sync::Arc;

/// A single latency observation
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    /// The query label the observation is grouped under
    pub label: Arc<str>,
    /// Latency in milliseconds
    pub value: f64,
    /// Whether this was the repeated (warm) run of a prewarmed query
    pub is_warm: bool,
    /// Partial results contribute to groups but never count as a query
    pub is_partial: bool,
}

impl Stat {
    pub fn new(label: impl Into<Arc<str>>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            is_warm: false,
            is_partial: false,
        }
    }

    pub fn with_warm(mut self, is_warm: bool) -> Self {
        self.is_warm = is_warm;
        self
    }

    pub fn with_partial(mut self, is_partial: bool) -> Self {
        self.is_partial = is_partial;
        self
    }

    /// Whether this observation counts toward the number of processed queries
    pub fn is_counted(&self) -> bool {
        !self.is_warm && !self.is_partial
    }
}
