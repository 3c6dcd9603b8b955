//! Configuration validation.
//!
//! Reads every section through `ConfigPort` into typed settings. Missing keys
//! take the documented defaults; present but unparsable or out-of-range values
//! are rejected before any computation runs.

use crate::domain::backtest::{
    BacktestConfig, DEFAULT_COMMISSION_RATE, DEFAULT_RISK_FREE_RATE, DEFAULT_SLIPPAGE_RATE,
    DEFAULT_TRADING_PERIODS_PER_YEAR,
};
use crate::domain::error::InvquantError;
use crate::domain::instrument::Metal;
use crate::domain::strategy::divergence::{
    DEFAULT_A_CHANGE_THRESHOLD, DEFAULT_B_CHANGE_THRESHOLD, DEFAULT_DIVERGENCE_LONG_ENTRY,
    DEFAULT_DIVERGENCE_LONG_EXIT, DivergenceParams,
};
use crate::domain::strategy::hysteresis::{
    DEFAULT_LONG_ENTRY, DEFAULT_LONG_EXIT, DEFAULT_SHORT_ENTRY, DEFAULT_SHORT_EXIT,
    HysteresisParams,
};
use crate::domain::strategy::spread::{
    DEFAULT_SPREAD_LONG_ENTRY, DEFAULT_SPREAD_LONG_EXIT, DEFAULT_SPREAD_SHORT_ENTRY,
    DEFAULT_SPREAD_SHORT_EXIT, SpreadParams,
};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_START_DATE: &str = "2021-01-01";
pub const DEFAULT_WINDOW_YEARS: u32 = 3;
pub const DEFAULT_DISPLAY_YEARS: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub dir: PathBuf,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorSettings {
    pub window_years: u32,
    pub display_years: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageSettings {
    pub metal: Metal,
    pub source_a: String,
    pub source_b: String,
    pub params: SpreadParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventSettings {
    pub metal: Metal,
    pub source_a: String,
    pub metric_a: String,
    pub source_b: String,
    pub metric_b: String,
    pub params: DivergenceParams,
}

/// Every section, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data: DataSettings,
    pub factors: FactorSettings,
    pub backtest: BacktestConfig,
    pub beta: HysteresisParams,
    pub arbitrage: ArbitrageSettings,
    pub event: EventSettings,
}

pub fn load_settings(config: &dyn ConfigPort) -> Result<Settings, InvquantError> {
    Ok(Settings {
        data: data_settings(config)?,
        factors: factor_settings(config)?,
        backtest: backtest_config(config)?,
        beta: beta_params(config)?,
        arbitrage: arbitrage_settings(config)?,
        event: event_settings(config)?,
    })
}

pub fn data_settings(config: &dyn ConfigPort) -> Result<DataSettings, InvquantError> {
    let dir = config
        .get_string("data", "dir")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    let start_date = match read_date(config, "data", "start_date")? {
        Some(date) => date,
        None => parse_date("data", "start_date", DEFAULT_START_DATE)?,
    };
    let end_date = read_date(config, "data", "end_date")?;
    check_date_order("data", start_date, end_date)?;
    Ok(DataSettings {
        dir: PathBuf::from(dir),
        start_date,
        end_date,
    })
}

pub fn factor_settings(config: &dyn ConfigPort) -> Result<FactorSettings, InvquantError> {
    let window_years = read_int(config, "factors", "window_years", DEFAULT_WINDOW_YEARS as i64)?;
    let display_years = read_int(config, "factors", "display_years", DEFAULT_DISPLAY_YEARS as i64)?;
    Ok(FactorSettings {
        window_years: positive_u32("factors", "window_years", window_years)?,
        display_years: positive_u32("factors", "display_years", display_years)?,
    })
}

pub fn backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, InvquantError> {
    let commission_rate = read_double(config, "backtest", "commission_rate", DEFAULT_COMMISSION_RATE)?;
    non_negative("backtest", "commission_rate", commission_rate)?;

    let slippage_rate = read_double(config, "backtest", "slippage_rate", DEFAULT_SLIPPAGE_RATE)?;
    non_negative("backtest", "slippage_rate", slippage_rate)?;

    let risk_free_rate = read_double(config, "backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    let periods = read_int(
        config,
        "backtest",
        "trading_periods_per_year",
        DEFAULT_TRADING_PERIODS_PER_YEAR as i64,
    )?;
    let trading_periods_per_year =
        positive_u32("backtest", "trading_periods_per_year", periods)? as usize;

    let start_date = read_date(config, "backtest", "start_date")?;
    let end_date = read_date(config, "backtest", "end_date")?;
    if let Some(start) = start_date {
        check_date_order("backtest", start, end_date)?;
    }

    Ok(BacktestConfig {
        commission_rate,
        slippage_rate,
        risk_free_rate,
        trading_periods_per_year,
        start_date,
        end_date,
    })
}

pub fn beta_params(config: &dyn ConfigPort) -> Result<HysteresisParams, InvquantError> {
    let long_entry = read_double(config, "beta", "long_entry", DEFAULT_LONG_ENTRY)?;
    let long_exit = read_double(config, "beta", "long_exit", DEFAULT_LONG_EXIT)?;
    let short_exit = read_double(config, "beta", "short_exit", DEFAULT_SHORT_EXIT)?;
    let short_entry = read_double(config, "beta", "short_entry", DEFAULT_SHORT_ENTRY)?;
    HysteresisParams::new(long_entry, long_exit, short_exit, short_entry)
        .map_err(|e| as_config_error("beta", e))
}

pub fn arbitrage_settings(config: &dyn ConfigPort) -> Result<ArbitrageSettings, InvquantError> {
    let metal = read_metal(config, "arbitrage", Metal::Copper)?;
    let source_a = read_source(config, "arbitrage", "source_a", "COMEX", Some(metal))?;
    let source_b = read_source(config, "arbitrage", "source_b", "LME", Some(metal))?;
    if source_a == source_b {
        return Err(invalid(
            "arbitrage",
            "source_b",
            "source_b must differ from source_a",
        ));
    }

    let section = "arbitrage";
    let params = SpreadParams::new(
        read_double(config, section, "spread_long_entry", DEFAULT_SPREAD_LONG_ENTRY)?,
        read_double(config, section, "spread_long_exit", DEFAULT_SPREAD_LONG_EXIT)?,
        read_double(config, section, "spread_short_exit", DEFAULT_SPREAD_SHORT_EXIT)?,
        read_double(config, section, "spread_short_entry", DEFAULT_SPREAD_SHORT_ENTRY)?,
    )
    .map_err(|e| as_config_error(section, e))?;

    Ok(ArbitrageSettings {
        metal,
        source_a,
        source_b,
        params,
    })
}

pub fn event_settings(config: &dyn ConfigPort) -> Result<EventSettings, InvquantError> {
    let section = "event";
    let metal = read_metal(config, section, Metal::Silver)?;
    // Event sources may use metrics outside the global-inventory catalogue.
    let source_a = read_source(config, section, "source_a", "SLV", None)?;
    let metric_a = read_metric(config, section, "metric_a", "slv_holdings_oz");
    let source_b = read_source(config, section, "source_b", "COMEX", None)?;
    let metric_b = read_metric(config, section, "metric_b", "comex_registered_oz");

    let params = DivergenceParams::new(
        read_double(config, section, "divergence_long_entry", DEFAULT_DIVERGENCE_LONG_ENTRY)?,
        read_double(config, section, "divergence_long_exit", DEFAULT_DIVERGENCE_LONG_EXIT)?,
        read_double(config, section, "a_change_threshold", DEFAULT_A_CHANGE_THRESHOLD)?,
        read_double(config, section, "b_change_threshold", DEFAULT_B_CHANGE_THRESHOLD)?,
    )
    .map_err(|e| as_config_error(section, e))?;

    Ok(EventSettings {
        metal,
        source_a,
        metric_a,
        source_b,
        metric_b,
        params,
    })
}

/// Float value, or `default` when the key is absent.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, InvquantError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, format!("'{raw}' is not a number"))),
        },
    }
}

/// Integer value, or `default` when the key is absent.
pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, InvquantError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("'{raw}' is not an integer"))),
    }
}

pub fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, InvquantError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => parse_date(section, key, raw.trim()).map(Some),
        _ => Ok(None),
    }
}

fn parse_date(section: &str, key: &str, raw: &str) -> Result<NaiveDate, InvquantError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        invalid(
            section,
            key,
            format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

fn read_metal(config: &dyn ConfigPort, section: &str, default: Metal) -> Result<Metal, InvquantError> {
    match config.get_string(section, "metal") {
        None => Ok(default),
        Some(raw) => Metal::parse(&raw).map_err(|e| as_config_error(section, e)),
    }
}

/// Upper-cased source name. When `metal` is given the source must be one of
/// its catalogue sources.
fn read_source(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: &str,
    metal: Option<Metal>,
) -> Result<String, InvquantError> {
    let source = config
        .get_string(section, key)
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_else(|| default.to_string());
    if source.is_empty() {
        return Err(InvquantError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        });
    }
    if let Some(metal) = metal {
        if metal.spec().metric_for(&source).is_none() {
            return Err(invalid(
                section,
                key,
                format!("{source} is not a source for {metal}"),
            ));
        }
    }
    Ok(source)
}

fn read_metric(config: &dyn ConfigPort, section: &str, key: &str, default: &str) -> String {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn check_date_order(
    section: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<(), InvquantError> {
    match end {
        Some(end) if start >= end => Err(invalid(
            section,
            "start_date",
            "start_date must be before end_date",
        )),
        _ => Ok(()),
    }
}

fn non_negative(section: &str, key: &str, value: f64) -> Result<(), InvquantError> {
    if value < 0.0 {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(())
}

fn positive_u32(section: &str, key: &str, value: i64) -> Result<u32, InvquantError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| invalid(section, key, format!("{key} must be at least 1")))
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> InvquantError {
    InvquantError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Re-labels a parameter error raised while building a section's parameters.
fn as_config_error(section: &str, err: InvquantError) -> InvquantError {
    match err {
        InvquantError::InvalidParameter { name, reason } => invalid(section, &name, reason),
        other => other,
    }
}
