//! Percentile spread between two sources (Arbitrage strategy).
//!
//! The driving score is `percentile_a - percentile_b`. Transitions reuse the
//! hysteresis table with thresholds placed symmetrically around zero.

use super::hysteresis::{self, HysteresisParams};
use super::SignalRow;
use crate::domain::error::InvquantError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const DEFAULT_SPREAD_LONG_ENTRY: f64 = -0.20;
pub const DEFAULT_SPREAD_LONG_EXIT: f64 = 0.0;
pub const DEFAULT_SPREAD_SHORT_EXIT: f64 = 0.0;
pub const DEFAULT_SPREAD_SHORT_ENTRY: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadParams(HysteresisParams);

impl SpreadParams {
    pub fn new(
        long_entry: f64,
        long_exit: f64,
        short_exit: f64,
        short_entry: f64,
    ) -> Result<Self, InvquantError> {
        HysteresisParams::new(long_entry, long_exit, short_exit, short_entry).map(Self)
    }

    pub fn thresholds(&self) -> &HysteresisParams {
        &self.0
    }
}

impl Default for SpreadParams {
    fn default() -> Self {
        Self(HysteresisParams {
            long_entry: DEFAULT_SPREAD_LONG_ENTRY,
            long_exit: DEFAULT_SPREAD_LONG_EXIT,
            short_exit: DEFAULT_SPREAD_SHORT_EXIT,
            short_entry: DEFAULT_SPREAD_SHORT_ENTRY,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadRow {
    pub date: NaiveDate,
    pub a: f64,
    pub b: f64,
    pub spread: f64,
}

/// Joins two score series on the union of their dates.
///
/// Each side is forward-filled over that union; rows where either side has
/// not produced a value yet are dropped, never zero-filled.
pub fn align_pair(
    a: &[(NaiveDate, Option<f64>)],
    b: &[(NaiveDate, Option<f64>)],
) -> Vec<SpreadRow> {
    let mut joined: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for &(date, value) in a {
        joined.entry(date).or_default().0 = value;
    }
    for &(date, value) in b {
        joined.entry(date).or_default().1 = value;
    }

    let mut last_a = None;
    let mut last_b = None;
    joined
        .into_iter()
        .filter_map(|(date, (va, vb))| {
            last_a = va.or(last_a);
            last_b = vb.or(last_b);
            let (a, b) = (last_a?, last_b?);
            Some(SpreadRow {
                date,
                a,
                b,
                spread: a - b,
            })
        })
        .collect()
}

pub fn scan(rows: &[SpreadRow], params: &SpreadParams) -> Vec<SignalRow> {
    let scores: Vec<(NaiveDate, Option<f64>)> =
        rows.iter().map(|r| (r.date, Some(r.spread))).collect();
    hysteresis::scan(&scores, params.thresholds())
}
