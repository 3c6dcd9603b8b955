//! Latest-signal aggregation across strategies and metals.

use super::{SignalRow, StrategyKind};
use crate::domain::instrument::Metal;
use crate::domain::signal::Signal;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LatestSignal {
    pub strategy: StrategyKind,
    pub metal: Metal,
    pub date: NaiveDate,
    pub signal: Signal,
    pub reason: String,
}

impl LatestSignal {
    /// Last row of a strategy run, if it produced any.
    pub fn from_rows(strategy: StrategyKind, metal: Metal, rows: &[SignalRow]) -> Option<Self> {
        rows.last().map(|row| Self {
            strategy,
            metal,
            date: row.date,
            signal: row.signal,
            reason: row.reason.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionCounts {
    pub long: usize,
    pub short: usize,
    pub flat: usize,
}

impl DirectionCounts {
    fn add(&mut self, signal: Signal) {
        match signal {
            Signal::Long => self.long += 1,
            Signal::Short => self.short += 1,
            Signal::Flat => self.flat += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.long + self.short + self.flat
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalSummary {
    pub overall: DirectionCounts,
    pub by_metal: BTreeMap<Metal, DirectionCounts>,
}

impl SignalSummary {
    pub fn from_latest(latest: &[LatestSignal]) -> Self {
        let mut summary = SignalSummary::default();
        for entry in latest {
            summary.overall.add(entry.signal);
            summary.by_metal.entry(entry.metal).or_default().add(entry.signal);
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.overall.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest(strategy: StrategyKind, metal: Metal, signal: Signal) -> LatestSignal {
        LatestSignal {
            strategy,
            metal,
            date: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            signal,
            reason: String::new(),
        }
    }

    #[test]
    fn counts_by_direction_and_metal() {
        let summary = SignalSummary::from_latest(&[
            latest(StrategyKind::Beta, Metal::Copper, Signal::Long),
            latest(StrategyKind::Beta, Metal::Gold, Signal::Short),
            latest(StrategyKind::Arbitrage, Metal::Copper, Signal::Flat),
            latest(StrategyKind::Event, Metal::Silver, Signal::Long),
        ]);
        assert_eq!(summary.total(), 4);
        assert_eq!(
            summary.overall,
            DirectionCounts {
                long: 2,
                short: 1,
                flat: 1
            }
        );
        assert_eq!(summary.by_metal[&Metal::Copper].total(), 2);
        assert_eq!(summary.by_metal[&Metal::Silver].long, 1);
    }

    #[test]
    fn empty_run_has_no_latest() {
        assert!(LatestSignal::from_rows(StrategyKind::Beta, Metal::Gold, &[]).is_none());
    }
}
