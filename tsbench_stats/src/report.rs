//! Plain text rendering of statistics.

use std::{collections::BTreeMap, io::Write, time::Duration};

use hdrhistogram::Histogram;

use crate::StatGroup;

/// Resolution of the percentile ladder in the HDR latencies dump
const HDR_TICKS_PER_HALF_DISTANCE: u32 = 10;

pub(crate) fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

pub(crate) fn write_interim_header<W: Write>(
    w: &mut W,
    queries: u64,
    workers: usize,
    interval_rate: f64,
    overall_rate: f64,
) -> std::io::Result<()> {
    writeln!(w, "After {queries} queries with {workers} workers:")?;
    writeln!(
        w,
        "Interval query rate: {interval_rate:0.2} queries/sec\tOverall query rate: {overall_rate:0.2} queries/sec"
    )
}

pub(crate) fn write_final_header<W: Write>(
    w: &mut W,
    queries: u64,
    workers: usize,
    overall_rate: f64,
) -> std::io::Result<()> {
    writeln!(
        w,
        "Run complete after {queries} queries with {workers} workers (Overall query rate {overall_rate:0.2} queries/sec):"
    )
}

/// One block per group, sorted by label, labels padded to the same width.
pub(crate) fn write_groups<W: Write>(
    w: &mut W,
    groups: &BTreeMap<String, StatGroup>,
    percentiles: &[f64],
) -> std::io::Result<()> {
    let width = groups.keys().map(|k| k.len()).max().unwrap_or_default();
    for (label, group) in groups {
        writeln!(w, "{label:<width$}:")?;
        write_group(w, group, percentiles)?;
    }
    Ok(())
}

fn write_group<W: Write>(w: &mut W, group: &StatGroup, percentiles: &[f64]) -> std::io::Result<()> {
    write!(w, "min: {:8.2}ms, ", group.min())?;
    for p in percentiles {
        write!(w, "p{p}: {:8.2}ms, ", group.percentile(*p))?;
    }
    writeln!(
        w,
        "mean: {:8.2}ms, max: {:7.2}ms, stddev: {:8.2}ms, sum: {:5.1}sec, count: {}",
        group.mean(),
        group.max(),
        group.stddev(),
        group.sum() / 1000.0,
        group.count()
    )
}

/// Dump a percentile ladder of `histogram` (recorded in microseconds) with values in
/// milliseconds.
pub fn write_hdr_percentiles<W: Write>(
    w: &mut W,
    histogram: &Histogram<u64>,
) -> std::io::Result<()> {
    writeln!(
        w,
        "{:>12} {:>14} {:>10} {:>14}\n",
        "Value", "Percentile", "TotalCount", "1/(1-Percentile)"
    )?;

    let mut total = 0;
    for v in histogram.iter_quantiles(HDR_TICKS_PER_HALF_DISTANCE) {
        total += v.count_since_last_iteration();
        let value = v.value_iterated_to() as f64 / 1000.0;
        let quantile = v.quantile_iterated_to();
        if quantile < 1.0 {
            writeln!(
                w,
                "{value:12.3} {quantile:2.12} {total:10} {:14.2}",
                1.0 / (1.0 - quantile)
            )?;
        } else {
            writeln!(w, "{value:12.3} {quantile:2.12} {total:10}")?;
        }
    }

    let (mean, stddev, max) = if histogram.len() == 0 {
        (0.0, 0.0, 0.0)
    } else {
        (
            histogram.mean() / 1000.0,
            histogram.stdev() / 1000.0,
            histogram.max() as f64 / 1000.0,
        )
    };
    writeln!(
        w,
        "#[Mean    = {mean:12.3}, StdDeviation   = {stddev:12.3}]"
    )?;
    writeln!(
        w,
        "#[Max     = {max:12.3}, Total count    = {:12}]",
        histogram.len()
    )
}
