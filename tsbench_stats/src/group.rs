use hdrhistogram::{CreationError, Histogram};
use serde::Serialize;

/// Highest latency the histogram tracks exactly, one hour in microseconds. Anything slower is
/// recorded as one hour.
const HISTOGRAM_MAX_MICROS: u64 = 3_600_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

/// Running statistics for one label.
///
/// Count, min, max, mean, standard deviation and sum are updated exactly and in constant time per
/// observation. Percentiles come from an HDR histogram with microsecond resolution, so memory does
/// not grow with the number of observations.
#[derive(Debug, Clone)]
pub struct StatGroup {
    count: u64,
    min: f64,
    max: f64,
    mean: f64,
    /// Sum of squared distances from the mean (Welford)
    m2: f64,
    sum: f64,
    histogram: Histogram<u64>,
}

impl StatGroup {
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            m2: 0.0,
            sum: 0.0,
            histogram: Histogram::new_with_bounds(1, HISTOGRAM_MAX_MICROS, HISTOGRAM_SIGFIG)?,
        })
    }

    /// Record a latency in milliseconds
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);

        self.histogram
            .saturating_record((value * 1000.0).round().max(0.0) as u64);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.min }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.max }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation
    pub fn stddev(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).sqrt()
        }
    }

    /// Sum of all latencies in milliseconds
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// The latency in milliseconds at `percentile` (0-100), as resolved by the histogram
    pub fn percentile(&self, percentile: f64) -> f64 {
        self.histogram.value_at_percentile(percentile) as f64 / 1000.0
    }

    /// Latencies in microseconds
    pub fn histogram(&self) -> &Histogram<u64> {
        &self.histogram
    }

    pub fn summary(&self, percentiles: &[f64]) -> GroupSummary {
        GroupSummary {
            count: self.count,
            min: self.min(),
            max: self.max(),
            mean: self.mean(),
            stddev: self.stddev(),
            sum: self.sum,
            percentiles: percentiles
                .iter()
                .map(|p| PercentileValue {
                    percentile: *p,
                    value: self.percentile(*p),
                })
                .collect(),
        }
    }
}

/// A snapshot of a [`StatGroup`], all latencies in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub sum: f64,
    pub percentiles: Vec<PercentileValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_group() {
        let g = StatGroup::new().unwrap();
        assert_eq!(g.count(), 0);
        assert_eq!(g.min(), 0.0);
        assert_eq!(g.max(), 0.0);
        assert_eq!(g.mean(), 0.0);
        assert_eq!(g.stddev(), 0.0);
    }

    #[test]
    fn known_values() {
        let mut g = StatGroup::new().unwrap();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            g.push(v);
        }
        assert_eq!(g.count(), 8);
        assert_eq!(g.min(), 2.0);
        assert_eq!(g.max(), 9.0);
        assert_eq!(g.mean(), 5.0);
        assert_eq!(g.stddev(), 2.0);
        assert_eq!(g.sum(), 40.0);
        // percentiles are resolved to the histogram's bucket precision
        assert!((g.percentile(50.0) - 4.0).abs() < 0.01);
        assert!((g.percentile(100.0) - 9.0).abs() < 0.01);

        let summary = g.summary(&[50.0, 100.0]);
        assert_eq!(summary.count, 8);
        assert_eq!(
            summary
                .percentiles
                .iter()
                .map(|p| p.percentile)
                .collect::<Vec<_>>(),
            vec![50.0, 100.0]
        );
        assert_eq!(summary.percentiles[0].value, g.percentile(50.0));
    }

    #[test]
    fn values_beyond_the_histogram_range_saturate() {
        let mut g = StatGroup::new().unwrap();
        g.push(10.0 * 3_600_000.0);
        assert_eq!(g.max(), 36_000_000.0);
        assert!(g.percentile(100.0) <= 3_600_000.0 * 1.001);
        assert_eq!(g.histogram().len(), 1);
    }

    proptest! {
        #[test]
        fn streaming_matches_recomputation(values in prop::collection::vec(0.0f64..100_000.0, 1..200)) {
            let mut g = StatGroup::new().unwrap();
            for v in &values {
                g.push(*v);
            }

            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

            prop_assert_eq!(g.count(), values.len() as u64);
            prop_assert_eq!(g.min(), min);
            prop_assert_eq!(g.max(), max);
            prop_assert!((g.mean() - mean).abs() <= 1e-9 * mean.abs().max(1.0));
            prop_assert!((g.stddev() - variance.sqrt()).abs() <= 1e-6 * variance.sqrt().max(1.0));
        }
    }
}
