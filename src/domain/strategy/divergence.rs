//! Holdings divergence squeeze monitor (Event strategy). Long only.

use super::{MISSING_DATA_REASON, SignalRow, require_finite, run_machine};
use crate::domain::derived::{period_change, standardized_divergence};
use crate::domain::error::InvquantError;
use crate::domain::signal::Signal;
use chrono::NaiveDate;

pub const DEFAULT_DIVERGENCE_LONG_ENTRY: f64 = 1.5;
pub const DEFAULT_DIVERGENCE_LONG_EXIT: f64 = 0.5;
pub const DEFAULT_A_CHANGE_THRESHOLD: f64 = 0.02;
pub const DEFAULT_B_CHANGE_THRESHOLD: f64 = -0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceParams {
    long_entry: f64,
    long_exit: f64,
    a_change_threshold: f64,
    b_change_threshold: f64,
}

impl DivergenceParams {
    /// Requires `long_exit < long_entry`, a positive `a_change_threshold` and
    /// a negative `b_change_threshold`.
    pub fn new(
        long_entry: f64,
        long_exit: f64,
        a_change_threshold: f64,
        b_change_threshold: f64,
    ) -> Result<Self, InvquantError> {
        require_finite("divergence_long_entry", long_entry)?;
        require_finite("divergence_long_exit", long_exit)?;
        require_finite("a_change_threshold", a_change_threshold)?;
        require_finite("b_change_threshold", b_change_threshold)?;
        if long_exit >= long_entry {
            return Err(InvquantError::invalid_parameter(
                "divergence_long_exit",
                format!("exit {long_exit} must be below entry {long_entry}"),
            ));
        }
        if a_change_threshold <= 0.0 {
            return Err(InvquantError::invalid_parameter(
                "a_change_threshold",
                format!("{a_change_threshold} must be positive"),
            ));
        }
        if b_change_threshold >= 0.0 {
            return Err(InvquantError::invalid_parameter(
                "b_change_threshold",
                format!("{b_change_threshold} must be negative"),
            ));
        }
        Ok(Self {
            long_entry,
            long_exit,
            a_change_threshold,
            b_change_threshold,
        })
    }

    pub fn long_entry(&self) -> f64 {
        self.long_entry
    }

    pub fn long_exit(&self) -> f64 {
        self.long_exit
    }

    pub fn a_change_threshold(&self) -> f64 {
        self.a_change_threshold
    }

    pub fn b_change_threshold(&self) -> f64 {
        self.b_change_threshold
    }
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            long_entry: DEFAULT_DIVERGENCE_LONG_ENTRY,
            long_exit: DEFAULT_DIVERGENCE_LONG_EXIT,
            a_change_threshold: DEFAULT_A_CHANGE_THRESHOLD,
            b_change_threshold: DEFAULT_B_CHANGE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceInput {
    pub date: NaiveDate,
    pub divergence: Option<f64>,
    /// Period-over-period change of series A.
    pub change_a: Option<f64>,
    /// Period-over-period change of series B.
    pub change_b: Option<f64>,
}

/// Builds machine inputs from two series aligned to `axis`.
pub fn build_inputs(
    axis: &[NaiveDate],
    a: &[f64],
    b: &[f64],
) -> Result<Vec<DivergenceInput>, InvquantError> {
    if a.len() != axis.len() || b.len() != axis.len() {
        return Err(InvquantError::malformed(
            "divergence",
            format!(
                "series lengths {} and {} do not match axis length {}",
                a.len(),
                b.len(),
                axis.len()
            ),
        ));
    }
    let d = standardized_divergence(a, b);
    let ca = period_change(a);
    let cb = period_change(b);
    Ok(axis
        .iter()
        .enumerate()
        .map(|(i, &date)| DivergenceInput {
            date,
            divergence: Some(d[i]),
            change_a: ca[i],
            change_b: cb[i],
        })
        .collect())
}

fn auxiliary_trigger(input: &DivergenceInput, params: &DivergenceParams) -> Option<(f64, f64)> {
    match (input.change_a, input.change_b) {
        (Some(ca), Some(cb))
            if ca > params.a_change_threshold && cb < params.b_change_threshold =>
        {
            Some((ca, cb))
        }
        _ => None,
    }
}

pub fn step(state: Signal, input: &DivergenceInput, params: &DivergenceParams) -> (Signal, String) {
    let Some(d) = input.divergence else {
        return (state, MISSING_DATA_REASON.to_string());
    };
    match state {
        Signal::Long => {
            if d < params.long_exit {
                (
                    Signal::Flat,
                    format!("divergence {d:.4} < exit {:.4}: exit long", params.long_exit),
                )
            } else {
                (
                    Signal::Long,
                    format!("divergence {d:.4} >= exit {:.4}: hold long", params.long_exit),
                )
            }
        }
        // Short is unreachable here; treat it like flat.
        Signal::Flat | Signal::Short => {
            if d > params.long_entry {
                (
                    Signal::Long,
                    format!("divergence {d:.4} > entry {:.4}: enter long", params.long_entry),
                )
            } else if let Some((ca, cb)) = auxiliary_trigger(input, params) {
                (
                    Signal::Long,
                    format!(
                        "change_a {ca:.4} > {:.4} and change_b {cb:.4} < {:.4}: enter long",
                        params.a_change_threshold, params.b_change_threshold
                    ),
                )
            } else {
                (
                    Signal::Flat,
                    format!("divergence {d:.4} <= entry {:.4}: stay flat", params.long_entry),
                )
            }
        }
    }
}

pub fn scan(inputs: &[DivergenceInput], params: &DivergenceParams) -> Vec<SignalRow> {
    run_machine(inputs, |state, input| {
        let (signal, reason) = step(state, input, params);
        SignalRow {
            date: input.date,
            score: input.divergence,
            signal,
            reason,
        }
    })
}
