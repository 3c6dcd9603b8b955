//! Vectorized backtest engine.
//!
//! Positions execute one period after the signal that produced them, so the
//! position held over `(t-1, t]` is the signal observed at `t-1`.

use super::error::InvquantError;
use super::metrics::PerformanceMetrics;
use super::series::TimeSeries;
use super::signal::Signal;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_COMMISSION_RATE: f64 = 0.001;
pub const DEFAULT_SLIPPAGE_RATE: f64 = 0.0005;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_TRADING_PERIODS_PER_YEAR: usize = 252;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub risk_free_rate: f64,
    pub trading_periods_per_year: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BacktestConfig {
    /// Cost charged per unit of position change.
    pub fn cost_rate(&self) -> f64 {
        self.commission_rate + self.slippage_rate
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|s| date >= s) && self.end_date.is_none_or(|e| date <= e)
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            slippage_rate: DEFAULT_SLIPPAGE_RATE,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            trading_periods_per_year: DEFAULT_TRADING_PERIODS_PER_YEAR,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub price: f64,
    /// Raw signal observed at this date.
    pub signal: Signal,
    /// Position actually held over the period ending at this date.
    pub position: Signal,
    /// Absolute change in executed position.
    pub position_change: f64,
    pub market_return: Option<f64>,
    pub trade_cost: f64,
    pub strategy_return: Option<f64>,
    pub cumulative_market: f64,
    pub cumulative_strategy: f64,
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub rows: Vec<BacktestRow>,
    pub metrics: PerformanceMetrics,
}

/// Joins signals onto price dates exactly, carrying the last signal forward
/// along the price rows. Rows before the first matched signal are FLAT.
pub fn align_signals(price_dates: &[NaiveDate], signals: &[(NaiveDate, Signal)]) -> Vec<Signal> {
    let by_date: BTreeMap<NaiveDate, Signal> = signals.iter().copied().collect();
    price_dates
        .iter()
        .scan(Signal::Flat, |current, date| {
            if let Some(&s) = by_date.get(date) {
                *current = s;
            }
            Some(*current)
        })
        .collect()
}

pub fn run_backtest(
    prices: &TimeSeries,
    signals: &[(NaiveDate, Signal)],
    config: &BacktestConfig,
) -> Result<BacktestResult, InvquantError> {
    let aligned = align_signals(&prices.dates(), signals);
    let bounded: Vec<(NaiveDate, f64, Signal)> = prices
        .points()
        .iter()
        .zip(aligned)
        .filter(|(obs, _)| config.contains(obs.date))
        .map(|(obs, signal)| (obs.date, obs.value, signal))
        .collect();

    if bounded.len() < 2 {
        return Err(InvquantError::malformed(
            &prices.name,
            format!("backtest needs at least 2 prices, got {}", bounded.len()),
        ));
    }
    if let Some((date, price, _)) = bounded.iter().find(|(_, p, _)| *p <= 0.0) {
        return Err(InvquantError::malformed(
            &prices.name,
            format!("non-positive price {price} on {date}"),
        ));
    }

    let cost_rate = config.cost_rate();
    let mut rows: Vec<BacktestRow> = Vec::with_capacity(bounded.len());
    let mut equity_market = 1.0;
    let mut equity_strategy = 1.0;
    let mut peak = 1.0_f64;

    for (i, &(date, price, signal)) in bounded.iter().enumerate() {
        let (position, position_change, market_return, trade_cost, strategy_return) = match i {
            0 => (Signal::Flat, 0.0, None, 0.0, None),
            _ => {
                let (_, prev_price, prev_signal) = bounded[i - 1];
                let prev_position = rows[i - 1].position;
                let position = prev_signal;
                let change = (position.exposure() - prev_position.exposure()).abs();
                let market = (price / prev_price).ln();
                let cost = change * cost_rate;
                let strat = position.exposure() * market - cost;
                (position, change, Some(market), cost, Some(strat))
            }
        };

        equity_market *= 1.0 + market_return.unwrap_or(0.0);
        equity_strategy *= 1.0 + strategy_return.unwrap_or(0.0);
        peak = peak.max(equity_strategy);

        rows.push(BacktestRow {
            date,
            price,
            signal,
            position,
            position_change,
            market_return,
            trade_cost,
            strategy_return,
            cumulative_market: equity_market,
            cumulative_strategy: equity_strategy,
            drawdown: equity_strategy / peak - 1.0,
        });
    }

    let metrics = PerformanceMetrics::compute(&rows, config);
    tracing::debug!(
        series = %prices.name,
        periods = rows.len(),
        total_return = metrics.total_return,
        "backtest complete"
    );
    Ok(BacktestResult { rows, metrics })
}
