//! Rolling percentile factor engine.
//!
//! PCT(W)[i] = #{ j in window : x[j] < x[i] } / (window_len - 1)
//! where the window is the trailing min(i + 1, W) values ending at i.
//! Warmup: values are `None` until ceil(W / 2) observations exist.
//! A single-value window is defined as 0.5.

use crate::domain::error::InvquantError;
use crate::domain::series::AlignedSeriesSet;
use chrono::NaiveDate;

/// Observations required before a percentile is defined.
pub fn min_observations(window: usize) -> usize {
    window.div_ceil(2)
}

fn validate_window(window: usize) -> Result<(), InvquantError> {
    if window < 2 {
        return Err(InvquantError::invalid_parameter(
            "window",
            format!("window length must be at least 2, got {window}"),
        ));
    }
    Ok(())
}

/// Rank of the last element of `window` among all of it, scaled to [0, 1].
fn percentile_rank(window: &[f64]) -> f64 {
    let Some((&current, _)) = window.split_last() else {
        return 0.5;
    };
    if window.len() == 1 {
        return 0.5;
    }
    let rank = window.iter().filter(|&&v| v < current).count();
    rank as f64 / (window.len() - 1) as f64
}

pub fn rolling_percentile(values: &[f64], window: usize) -> Result<Vec<Option<f64>>, InvquantError> {
    validate_window(window)?;
    let warmup = min_observations(window);

    let out = (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            if slice.len() < warmup {
                None
            } else {
                Some(percentile_rank(slice))
            }
        })
        .collect();
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PercentileRow {
    pub date: NaiveDate,
    /// Member values in the same order as `PercentileTable::sources`.
    pub components: Vec<f64>,
    pub total: f64,
    pub percentile: Option<f64>,
}

/// Global aggregate table: one row per axis date.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileTable {
    pub sources: Vec<String>,
    pub rows: Vec<PercentileRow>,
}

impl PercentileTable {
    /// Rows dated on or after `start`. Percentiles are carried over untouched.
    pub fn display_from(&self, start: NaiveDate) -> PercentileTable {
        PercentileTable {
            sources: self.sources.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r.date >= start)
                .cloned()
                .collect(),
        }
    }

    pub fn latest_percentile(&self) -> Option<f64> {
        self.rows.iter().rev().find_map(|r| r.percentile)
    }

    pub fn scores(&self) -> Vec<(NaiveDate, Option<f64>)> {
        self.rows.iter().map(|r| (r.date, r.percentile)).collect()
    }
}

/// Sums the aligned members and ranks the total against its own history.
pub fn global_percentile(
    set: &AlignedSeriesSet,
    window: usize,
) -> Result<PercentileTable, InvquantError> {
    let total = set.total();
    let percentiles = rolling_percentile(&total, window)?;

    let rows = set
        .axis
        .iter()
        .enumerate()
        .map(|(i, &date)| PercentileRow {
            date,
            components: set.members.iter().map(|(_, v)| v[i]).collect(),
            total: total[i],
            percentile: percentiles[i],
        })
        .collect();

    tracing::debug!(rows = set.len(), window, "computed global percentile");
    Ok(PercentileTable {
        sources: set.members.iter().map(|(n, _)| n.clone()).collect(),
        rows,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrendRow {
    pub date: NaiveDate,
    pub value: f64,
    pub percentile: Option<f64>,
}

pub fn source_percentile_trend(
    set: &AlignedSeriesSet,
    source: &str,
    window: usize,
) -> Result<Vec<SourceTrendRow>, InvquantError> {
    let values = set.member(source).ok_or_else(|| {
        InvquantError::invalid_parameter("source", format!("unknown source '{source}'"))
    })?;
    let percentiles = rolling_percentile(values, window)?;

    Ok(set
        .axis
        .iter()
        .zip(values.iter().zip(percentiles))
        .map(|(&date, (&value, percentile))| SourceTrendRow {
            date,
            value,
            percentile,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionalPercentile {
    pub source: String,
    pub current_value: f64,
    pub percentile: f64,
}

/// Latest value and percentile of every member. An undefined latest
/// percentile is reported as 0.5.
pub fn regional_percentiles(
    set: &AlignedSeriesSet,
    window: usize,
) -> Result<Vec<RegionalPercentile>, InvquantError> {
    set.members
        .iter()
        .map(|(source, values)| {
            let percentiles = rolling_percentile(values, window)?;
            Ok(RegionalPercentile {
                source: source.clone(),
                current_value: values.last().copied().unwrap_or(0.0),
                percentile: percentiles.last().copied().flatten().unwrap_or(0.5),
            })
        })
        .collect()
}
