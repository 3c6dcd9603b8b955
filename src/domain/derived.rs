//! Derived inventory factors: ratios, flows, structure and divergence.
//!
//! All inputs are aligned slices (same axis, same length). Zero denominators
//! resolve to the fallback named by each function.

use crate::domain::stats::{mean, sample_std};

/// `num / den` where `den > 0`, else `fallback`.
pub fn ratio(num: &[f64], den: &[f64], fallback: f64) -> Vec<f64> {
    num.iter()
        .zip(den)
        .map(|(&n, &d)| if d > 0.0 { n / d } else { fallback })
        .collect()
}

/// Inflow minus outflow; positive is a net build.
pub fn net_flow(inflow: &[f64], outflow: &[f64]) -> Vec<f64> {
    inflow.iter().zip(outflow).map(|(i, o)| i - o).collect()
}

/// Registered share of registered + eligible stock.
pub fn structure_share(registered: &[f64], eligible: &[f64]) -> Vec<f64> {
    let total: Vec<f64> = registered.iter().zip(eligible).map(|(r, e)| r + e).collect();
    ratio(registered, &total, 0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreeStock {
    pub free: Vec<f64>,
    pub free_ratio: Vec<f64>,
}

/// Registered stock not pledged as margin, floored at zero.
pub fn free_vs_pledged(registered: &[f64], pledged: &[f64]) -> FreeStock {
    let free: Vec<f64> = registered
        .iter()
        .zip(pledged)
        .map(|(r, p)| (r - p).max(0.0))
        .collect();
    let free_ratio = ratio(&free, registered, 1.0);
    FreeStock { free, free_ratio }
}

/// Shares of `a` and `b` in their combined total; 0.5 each when empty.
pub fn split_share(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let total: Vec<f64> = a.iter().zip(b).map(|(x, y)| x + y).collect();
    (ratio(a, &total, 0.5), ratio(b, &total, 0.5))
}

/// First difference; the first element is 0.
pub fn change(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if let Some(&first) = values.first() {
        out.push(0.0);
        let mut prev = first;
        for &v in &values[1..] {
            out.push(v - prev);
            prev = v;
        }
    }
    out
}

/// Period-over-period fractional change. Undefined for the first element
/// and wherever the previous value is zero.
pub fn period_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(None);
    }
    for pair in values.windows(2) {
        out.push(if pair[0] != 0.0 {
            Some(pair[1] / pair[0] - 1.0)
        } else {
            None
        });
    }
    out
}

/// Standard score of each value against the whole slice.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    let std = sample_std(values);
    if std <= 0.0 {
        return vec![0.0; values.len()];
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) / std).collect()
}

/// z(a) - z(b); positive when `a` is strong relative to `b`.
pub fn standardized_divergence(a: &[f64], b: &[f64]) -> Vec<f64> {
    zscore(a)
        .into_iter()
        .zip(zscore(b))
        .map(|(x, y)| x - y)
        .collect()
}
