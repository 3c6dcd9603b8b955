//! Four-threshold hysteresis machine (Beta strategy).
//!
//! FLAT  -> LONG  when p < long_entry, -> SHORT when p > short_entry.
//! LONG  -> exit  when p > long_exit; straight to SHORT if also p > short_entry.
//! SHORT -> exit  when p < short_exit; straight to LONG if also p < long_entry.
//! A missing score leaves the state unchanged.

use super::{MISSING_DATA_REASON, SignalRow, require_finite, run_machine};
use crate::domain::error::InvquantError;
use crate::domain::signal::Signal;
use chrono::NaiveDate;

pub const DEFAULT_LONG_ENTRY: f64 = 0.05;
pub const DEFAULT_LONG_EXIT: f64 = 0.30;
pub const DEFAULT_SHORT_ENTRY: f64 = 0.95;
pub const DEFAULT_SHORT_EXIT: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisParams {
    pub(super) long_entry: f64,
    pub(super) long_exit: f64,
    pub(super) short_exit: f64,
    pub(super) short_entry: f64,
}

impl HysteresisParams {
    /// Requires `long_entry < long_exit <= short_exit < short_entry`.
    pub fn new(
        long_entry: f64,
        long_exit: f64,
        short_exit: f64,
        short_entry: f64,
    ) -> Result<Self, InvquantError> {
        require_finite("long_entry", long_entry)?;
        require_finite("long_exit", long_exit)?;
        require_finite("short_exit", short_exit)?;
        require_finite("short_entry", short_entry)?;
        if long_entry >= long_exit {
            return Err(InvquantError::invalid_parameter(
                "long_entry",
                format!("long_entry {long_entry} must be below long_exit {long_exit}"),
            ));
        }
        if long_exit > short_exit {
            return Err(InvquantError::invalid_parameter(
                "long_exit",
                format!("long_exit {long_exit} must not exceed short_exit {short_exit}"),
            ));
        }
        if short_exit >= short_entry {
            return Err(InvquantError::invalid_parameter(
                "short_exit",
                format!("short_exit {short_exit} must be below short_entry {short_entry}"),
            ));
        }
        Ok(Self {
            long_entry,
            long_exit,
            short_exit,
            short_entry,
        })
    }

    pub fn long_entry(&self) -> f64 {
        self.long_entry
    }

    pub fn long_exit(&self) -> f64 {
        self.long_exit
    }

    pub fn short_exit(&self) -> f64 {
        self.short_exit
    }

    pub fn short_entry(&self) -> f64 {
        self.short_entry
    }
}

impl Default for HysteresisParams {
    fn default() -> Self {
        Self {
            long_entry: DEFAULT_LONG_ENTRY,
            long_exit: DEFAULT_LONG_EXIT,
            short_exit: DEFAULT_SHORT_EXIT,
            short_entry: DEFAULT_SHORT_ENTRY,
        }
    }
}

/// One transition. Returns the new state and the reason for it.
pub fn step(state: Signal, score: Option<f64>, params: &HysteresisParams) -> (Signal, String) {
    let Some(p) = score else {
        return (state, MISSING_DATA_REASON.to_string());
    };
    let HysteresisParams {
        long_entry,
        long_exit,
        short_exit,
        short_entry,
    } = *params;

    match state {
        Signal::Flat => {
            if p < long_entry {
                (Signal::Long, format!("{p:.4} < long_entry {long_entry:.4}: enter long"))
            } else if p > short_entry {
                (Signal::Short, format!("{p:.4} > short_entry {short_entry:.4}: enter short"))
            } else {
                (
                    Signal::Flat,
                    format!("{p:.4} within [{long_entry:.4}, {short_entry:.4}]: stay flat"),
                )
            }
        }
        Signal::Long => {
            if p > long_exit {
                if p > short_entry {
                    (
                        Signal::Short,
                        format!("{p:.4} > short_entry {short_entry:.4}: reverse long to short"),
                    )
                } else {
                    (Signal::Flat, format!("{p:.4} > long_exit {long_exit:.4}: exit long"))
                }
            } else {
                (Signal::Long, format!("{p:.4} <= long_exit {long_exit:.4}: hold long"))
            }
        }
        Signal::Short => {
            if p < short_exit {
                if p < long_entry {
                    (
                        Signal::Long,
                        format!("{p:.4} < long_entry {long_entry:.4}: reverse short to long"),
                    )
                } else {
                    (Signal::Flat, format!("{p:.4} < short_exit {short_exit:.4}: exit short"))
                }
            } else {
                (Signal::Short, format!("{p:.4} >= short_exit {short_exit:.4}: hold short"))
            }
        }
    }
}

pub fn scan(scores: &[(NaiveDate, Option<f64>)], params: &HysteresisParams) -> Vec<SignalRow> {
    run_machine(scores, |state, &(date, score)| {
        let (signal, reason) = step(state, score, params);
        SignalRow {
            date,
            score,
            signal,
            reason,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn dated(scores: &[Option<f64>]) -> Vec<(NaiveDate, Option<f64>)> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| (start + Duration::days(i as i64), s))
            .collect()
    }

    fn signals(rows: &[SignalRow]) -> Vec<Signal> {
        rows.iter().map(|r| r.signal).collect()
    }

    #[test]
    fn defaults_are_valid() {
        let p = HysteresisParams::default();
        assert_eq!(
            HysteresisParams::new(p.long_entry(), p.long_exit(), p.short_exit(), p.short_entry())
                .unwrap(),
            p
        );
        assert_eq!(p.long_entry(), 0.05);
        assert_eq!(p.short_entry(), 0.95);
    }

    #[test]
    fn out_of_order_thresholds_are_rejected() {
        assert!(HysteresisParams::new(0.3, 0.05, 0.7, 0.95).is_err());
        assert!(HysteresisParams::new(0.05, 0.8, 0.7, 0.95).is_err());
        assert!(HysteresisParams::new(0.05, 0.3, 0.95, 0.95).is_err());
        assert!(HysteresisParams::new(f64::NAN, 0.3, 0.7, 0.95).is_err());
    }

    #[test]
    fn equal_inner_exits_are_allowed() {
        assert!(HysteresisParams::new(-0.2, 0.0, 0.0, 0.2).is_ok());
    }

    #[test]
    fn reference_sequence() {
        let rows = scan(
            &dated(&[
                Some(0.03),
                Some(0.20),
                Some(0.40),
                Some(0.96),
                Some(0.72),
                Some(0.10),
            ]),
            &HysteresisParams::default(),
        );
        assert_eq!(
            signals(&rows),
            vec![
                Signal::Long,
                Signal::Long,
                Signal::Flat,
                Signal::Short,
                Signal::Short,
                Signal::Flat,
            ]
        );
        assert_eq!(rows[0].reason, "0.0300 < long_entry 0.0500: enter long");
        assert_eq!(rows[2].reason, "0.4000 > long_exit 0.3000: exit long");
    }

    #[test]
    fn long_reverses_directly_to_short() {
        let rows = scan(&dated(&[Some(0.01), Some(0.99)]), &HysteresisParams::default());
        assert_eq!(signals(&rows), vec![Signal::Long, Signal::Short]);
        assert!(rows[1].reason.contains("reverse long to short"));
    }

    #[test]
    fn short_reverses_directly_to_long() {
        let rows = scan(&dated(&[Some(0.99), Some(0.01)]), &HysteresisParams::default());
        assert_eq!(signals(&rows), vec![Signal::Short, Signal::Long]);
    }

    #[test]
    fn missing_score_holds_position() {
        let rows = scan(
            &dated(&[Some(0.01), None, Some(0.25)]),
            &HysteresisParams::default(),
        );
        assert_eq!(signals(&rows), vec![Signal::Long, Signal::Long, Signal::Long]);
        assert_eq!(rows[1].reason, MISSING_DATA_REASON);
        assert_eq!(rows[1].score, None);
    }

    #[test]
    fn leading_missing_scores_stay_flat() {
        let rows = scan(&dated(&[None, None]), &HysteresisParams::default());
        assert_eq!(signals(&rows), vec![Signal::Flat, Signal::Flat]);
    }

    #[test]
    fn thresholds_are_strict() {
        let params = HysteresisParams::default();
        assert_eq!(step(Signal::Flat, Some(0.05), &params).0, Signal::Flat);
        assert_eq!(step(Signal::Flat, Some(0.95), &params).0, Signal::Flat);
        assert_eq!(step(Signal::Long, Some(0.30), &params).0, Signal::Long);
        assert_eq!(step(Signal::Short, Some(0.70), &params).0, Signal::Short);
    }

    proptest! {
        #[test]
        fn constant_inner_score_stays_flat(p in 0.05f64..=0.95, n in 1usize..200) {
            let scores = dated(&vec![Some(p); n]);
            let rows = scan(&scores, &HysteresisParams::default());
            prop_assert!(rows.iter().all(|r| r.signal == Signal::Flat));
        }
    }
}
