//! Performance metrics over a completed backtest record.
//!
//! Every ratio with a zero denominator is reported as 0. These are display
//! statistics and never drive control flow.

use super::backtest::{BacktestConfig, BacktestRow};
use super::stats::{mean, sample_covariance, sample_std, sample_variance};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_trade_return: f64,
    pub benchmark_return: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl PerformanceMetrics {
    pub fn compute(rows: &[BacktestRow], config: &BacktestConfig) -> Self {
        let Some(last) = rows.last() else {
            return Self::default();
        };
        let periods_per_year = config.trading_periods_per_year as f64;
        let returns: Vec<f64> = rows.iter().filter_map(|r| r.strategy_return).collect();
        let market_returns: Vec<f64> = rows.iter().filter_map(|r| r.market_return).collect();
        let n_periods = returns.len();

        let total_return = last.cumulative_strategy - 1.0;
        let benchmark_return = last.cumulative_market - 1.0;
        let cagr = compute_cagr(total_return, n_periods, periods_per_year);

        let volatility = sample_std(&returns) * periods_per_year.sqrt();
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(rows);

        let excess_return = cagr - config.risk_free_rate;
        let sharpe_ratio = if volatility > 0.0 {
            excess_return / volatility
        } else {
            0.0
        };

        let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let downside_vol = sample_std(&downside) * periods_per_year.sqrt();
        let sortino_ratio = if downside_vol > 0.0 {
            excess_return / downside_vol
        } else {
            0.0
        };

        let calmar_ratio = if max_drawdown != 0.0 {
            cagr / max_drawdown.abs()
        } else {
            0.0
        };

        let total_trades = rows.iter().filter(|r| r.position_change > 0.0).count();
        let (win_rate, profit_factor, avg_trade_return) = compute_trade_stats(rows);

        let market_variance = sample_variance(&market_returns);
        let beta = if market_variance > 0.0 {
            sample_covariance(&returns, &market_returns) / market_variance
        } else {
            0.0
        };

        PerformanceMetrics {
            total_return,
            cagr,
            volatility,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            total_trades,
            win_rate,
            profit_factor,
            avg_trade_return,
            benchmark_return,
            alpha: total_return - benchmark_return,
            beta,
        }
    }

    /// Named statistics formatted for display, in a fixed order.
    pub fn to_display_map(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_return", pct(self.total_return)),
            ("cagr", pct(self.cagr)),
            ("volatility", pct(self.volatility)),
            ("max_drawdown", pct(self.max_drawdown)),
            (
                "max_drawdown_duration",
                format!("{} periods", self.max_drawdown_duration),
            ),
            ("sharpe_ratio", format!("{:.2}", self.sharpe_ratio)),
            ("sortino_ratio", format!("{:.2}", self.sortino_ratio)),
            ("calmar_ratio", format!("{:.2}", self.calmar_ratio)),
            ("total_trades", self.total_trades.to_string()),
            ("win_rate", format!("{:.1}%", self.win_rate * 100.0)),
            ("profit_factor", format!("{:.2}", self.profit_factor)),
            ("avg_trade_return", pct(self.avg_trade_return)),
            ("benchmark_return", pct(self.benchmark_return)),
            ("alpha", pct(self.alpha)),
            ("beta", format!("{:.2}", self.beta)),
        ]
    }

    /// Multi-line console report.
    pub fn summary(&self) -> String {
        let mut out = String::from("Performance\n");
        for (name, value) in self.to_display_map() {
            out.push_str(&format!("  {name:<22} {value:>12}\n"));
        }
        out
    }
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn compute_cagr(total_return: f64, n_periods: usize, periods_per_year: f64) -> f64 {
    if n_periods == 0 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(periods_per_year / n_periods as f64) - 1.0
}

/// Deepest drawdown and the longest run of periods spent below a peak.
fn compute_drawdown(rows: &[BacktestRow]) -> (f64, usize) {
    let mut max_dd = 0.0_f64;
    let mut longest = 0usize;
    let mut current = 0usize;
    for row in rows {
        max_dd = max_dd.min(row.drawdown);
        if row.drawdown < 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    (max_dd, longest)
}

/// Win rate, profit factor and mean return over trade segments.
///
/// A segment runs from one position change up to, not including, the next,
/// so a boundary row belongs to exactly one segment rather than closing one
/// and opening the next as a label-inclusive slice would.
fn compute_trade_stats(rows: &[BacktestRow]) -> (f64, f64, f64) {
    let boundaries: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.position_change > 0.0)
        .map(|(i, _)| i)
        .collect();
    if boundaries.len() < 2 {
        return (0.0, 0.0, 0.0);
    }

    let segments: Vec<f64> = boundaries
        .windows(2)
        .map(|w| {
            rows[w[0]..w[1]]
                .iter()
                .filter_map(|r| r.strategy_return)
                .sum()
        })
        .collect();

    let wins: Vec<f64> = segments.iter().copied().filter(|&s| s > 0.0).collect();
    let losses: Vec<f64> = segments.iter().copied().filter(|&s| s < 0.0).collect();

    let win_rate = wins.len() as f64 / segments.len() as f64;
    let avg_win = mean(&wins);
    let avg_loss = if losses.is_empty() {
        1.0
    } else {
        mean(&losses).abs()
    };
    let profit_factor = if avg_loss > 0.0 { avg_win / avg_loss } else { 0.0 };

    (win_rate, profit_factor, mean(&segments))
}

/// Sum of strategy returns per calendar month, keyed by (year, month).
pub fn monthly_returns(rows: &[BacktestRow]) -> BTreeMap<(i32, u32), f64> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for row in rows {
        if let Some(r) = row.strategy_return {
            *months.entry(month_key(row.date)).or_insert(0.0) += r;
        }
    }
    months
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Signal;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn make_rows(returns: &[Option<f64>], changes: &[f64]) -> Vec<BacktestRow> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut equity = 1.0;
        let mut peak = 1.0_f64;
        returns
            .iter()
            .zip(changes)
            .enumerate()
            .map(|(i, (&r, &change))| {
                equity *= 1.0 + r.unwrap_or(0.0);
                peak = peak.max(equity);
                BacktestRow {
                    date: start + Duration::days(i as i64),
                    price: 100.0,
                    signal: Signal::Long,
                    position: Signal::Long,
                    position_change: change,
                    market_return: r,
                    trade_cost: 0.0,
                    strategy_return: r,
                    cumulative_market: equity,
                    cumulative_strategy: equity,
                    drawdown: equity / peak - 1.0,
                }
            })
            .collect()
    }

    #[test]
    fn metrics_empty_record() {
        let m = PerformanceMetrics::compute(&[], &BacktestConfig::default());
        assert_eq!(m, PerformanceMetrics::default());
    }

    #[test]
    fn metrics_total_return_and_alpha() {
        let rows = make_rows(&[None, Some(0.10)], &[0.0, 0.0]);
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        assert_relative_eq!(m.total_return, 0.10, epsilon = 1e-12);
        assert_relative_eq!(m.benchmark_return, 0.10, epsilon = 1e-12);
        assert_relative_eq!(m.alpha, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn metrics_cagr_uses_return_count() {
        let mut returns = vec![None];
        returns.extend(std::iter::repeat_n(Some(0.0), 252));
        let rows = make_rows(&returns, &vec![0.0; returns.len()]);
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        assert_relative_eq!(m.cagr, 0.0, epsilon = 1e-12);
        assert_eq!(m.volatility, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    #[test]
    fn cagr_of_total_loss() {
        assert_eq!(compute_cagr(-1.0, 10, 252.0), -1.0);
        assert_eq!(compute_cagr(-1.5, 10, 252.0), -1.0);
        assert_eq!(compute_cagr(0.5, 0, 252.0), 0.0);
        assert_relative_eq!(compute_cagr(0.21, 504, 252.0), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn metrics_max_drawdown_and_duration() {
        let rows = make_rows(
            &[None, Some(0.10), Some(-0.20), Some(0.05), Some(-0.10), Some(0.50)],
            &[0.0; 6],
        );
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        let trough = 1.1 * 0.8 * 1.05 * 0.9;
        assert_relative_eq!(m.max_drawdown, trough / 1.1 - 1.0, epsilon = 1e-12);
        assert_eq!(m.max_drawdown_duration, 3);
        assert_relative_eq!(m.calmar_ratio, m.cagr / m.max_drawdown.abs(), epsilon = 1e-12);
    }

    #[test]
    fn metrics_sortino_needs_two_losses() {
        let rows = make_rows(&[None, Some(0.01), Some(-0.01), Some(0.02)], &[0.0; 4]);
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        assert_eq!(m.sortino_ratio, 0.0);
        assert!(m.sharpe_ratio.is_finite());
    }

    #[test]
    fn metrics_volatility_sharpe_sortino_hand_computed() {
        let rows = make_rows(
            &[None, Some(0.02), Some(-0.01), Some(0.03), Some(-0.02)],
            &[0.0; 5],
        );
        let config = BacktestConfig {
            risk_free_rate: 0.01,
            trading_periods_per_year: 4,
            ..BacktestConfig::default()
        };
        let m = PerformanceMetrics::compute(&rows, &config);

        // Sample std: sqrt(0.0017 / 3), annualised by sqrt(4).
        assert_relative_eq!(m.volatility, 0.047_609_522_856_952_33, epsilon = 1e-12);
        // Four periods at four per year: CAGR equals total return.
        assert_relative_eq!(m.cagr, 0.019_292_12, epsilon = 1e-12);
        assert_relative_eq!(m.sharpe_ratio, 0.195_173_558_615_975_77, epsilon = 1e-9);
        // Downside std over [-0.01, -0.02] only: sqrt(0.00005), times 2.
        assert_relative_eq!(m.sortino_ratio, 0.657_052_106_359_915_8, epsilon = 1e-9);
    }

    #[test]
    fn metrics_trade_segments_are_half_open() {
        // Boundaries at 1, 3 and 5: segments [1,3) and [3,5).
        let rows = make_rows(
            &[None, Some(0.02), Some(0.01), Some(-0.03), Some(0.01), Some(0.04)],
            &[0.0, 1.0, 0.0, 2.0, 0.0, 1.0],
        );
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        assert_eq!(m.total_trades, 3);
        assert_relative_eq!(m.win_rate, 0.5);
        // wins: 0.03, losses: -0.02
        assert_relative_eq!(m.profit_factor, 1.5, epsilon = 1e-12);
        assert_relative_eq!(m.avg_trade_return, 0.005, epsilon = 1e-12);
    }

    #[test]
    fn metrics_profit_factor_without_losses() {
        let rows = make_rows(
            &[None, Some(0.02), Some(0.01), Some(0.03)],
            &[0.0, 1.0, 0.0, 1.0],
        );
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        assert_relative_eq!(m.win_rate, 1.0);
        assert_relative_eq!(m.profit_factor, 0.03, epsilon = 1e-12);
    }

    #[test]
    fn metrics_single_trade_has_no_segments() {
        let rows = make_rows(&[None, Some(0.02), Some(0.01)], &[0.0, 1.0, 0.0]);
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        assert_eq!(m.total_trades, 1);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.avg_trade_return, 0.0);
    }

    #[test]
    fn metrics_beta_of_identical_returns_is_one() {
        let rows = make_rows(&[None, Some(0.01), Some(-0.02), Some(0.03)], &[0.0; 4]);
        let m = PerformanceMetrics::compute(&rows, &BacktestConfig::default());
        assert_relative_eq!(m.beta, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn display_map_formats() {
        let m = PerformanceMetrics {
            total_return: 0.1234,
            win_rate: 0.5,
            total_trades: 7,
            max_drawdown_duration: 12,
            ..PerformanceMetrics::default()
        };
        let map = m.to_display_map();
        assert_eq!(map.len(), 15);
        assert_eq!(map[0], ("total_return", "12.34%".to_string()));
        let lookup = |k: &str| map.iter().find(|(n, _)| *n == k).map(|(_, v)| v.clone());
        assert_eq!(lookup("win_rate").as_deref(), Some("50.0%"));
        assert_eq!(lookup("total_trades").as_deref(), Some("7"));
        assert_eq!(lookup("max_drawdown_duration").as_deref(), Some("12 periods"));
        assert!(m.summary().contains("total_return"));
    }

    #[test]
    fn monthly_returns_sum_by_month() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let mut rows = make_rows(&[None, Some(0.01), Some(0.02), Some(-0.01)], &[0.0; 4]);
        for (i, row) in rows.iter_mut().enumerate() {
            row.date = start + Duration::days(i as i64);
        }
        let months = monthly_returns(&rows);
        assert_eq!(months.len(), 2);
        assert_relative_eq!(months[&(2024, 1)], 0.01, epsilon = 1e-12);
        assert_relative_eq!(months[&(2024, 2)], 0.01, epsilon = 1e-12);
    }
}
