//! Signal state machines.
//!
//! Each variant is a pure left fold `(state, input) -> row` starting from
//! FLAT. The emitted row carries the new state and a human-readable reason
//! describing the comparison that decided it.

pub mod divergence;
pub mod hysteresis;
pub mod spread;
pub mod summary;

use crate::domain::error::InvquantError;
use crate::domain::signal::Signal;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Reason emitted when the driving score is undefined.
pub const MISSING_DATA_REASON: &str = "missing data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    /// Global inventory percentile with hysteresis.
    Beta,
    /// Percentile spread between two sources.
    Arbitrage,
    /// Holdings divergence squeeze monitor, long only.
    Event,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Beta,
        StrategyKind::Arbitrage,
        StrategyKind::Event,
    ];

    pub fn parse(name: &str) -> Result<Self, InvquantError> {
        match name.trim().to_lowercase().as_str() {
            "beta" => Ok(StrategyKind::Beta),
            "arbitrage" | "spread" => Ok(StrategyKind::Arbitrage),
            "event" | "divergence" => Ok(StrategyKind::Event),
            other => Err(InvquantError::invalid_parameter(
                "strategy",
                format!("unknown strategy '{other}'"),
            )),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Beta => "Beta_Inventory",
            StrategyKind::Arbitrage => "Arbitrage_Spread",
            StrategyKind::Event => "Event_Squeeze",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    /// Driving score; `None` when the input was undefined.
    pub score: Option<f64>,
    pub signal: Signal,
    pub reason: String,
}

/// Folds `inputs` left to right, threading the current signal through `step`.
pub fn run_machine<T, F>(inputs: &[T], mut step: F) -> Vec<SignalRow>
where
    F: FnMut(Signal, &T) -> SignalRow,
{
    inputs
        .iter()
        .scan(Signal::Flat, |state, input| {
            let row = step(*state, input);
            *state = row.signal;
            Some(row)
        })
        .collect()
}

/// (date, signal) pairs for the backtest engine.
pub fn positions(rows: &[SignalRow]) -> Vec<(NaiveDate, Signal)> {
    rows.iter().map(|r| (r.date, r.signal)).collect()
}

pub(crate) fn require_finite(name: &str, value: f64) -> Result<(), InvquantError> {
    if !value.is_finite() {
        return Err(InvquantError::invalid_parameter(name, "must be finite"));
    }
    Ok(())
}
