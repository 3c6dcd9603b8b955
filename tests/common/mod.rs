#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use invquant::adapters::file_config_adapter::FileConfigAdapter;
use invquant::domain::config_validation::{Settings, load_settings};
use invquant::domain::error::InvquantError;
use invquant::domain::instrument::Metal;
use invquant::domain::series::{Frequency, Observation, TimeSeries};
use invquant::ports::data_port::TimeSeriesStore;
use std::collections::HashMap;

/// In-memory store. Unknown series come back empty, like the CSV store.
pub struct MockStore {
    pub series: HashMap<(Metal, String, String), Vec<(NaiveDate, f64)>>,
    pub prices: HashMap<Metal, Vec<(NaiveDate, f64)>>,
    pub errors: HashMap<Metal, String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            prices: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(
        mut self,
        metal: Metal,
        source: &str,
        metric: &str,
        points: Vec<(NaiveDate, f64)>,
    ) -> Self {
        self.series
            .insert((metal, source.to_uppercase(), metric.to_string()), points);
        self
    }

    /// Registers a catalogue inventory source under its catalogue metric.
    pub fn with_inventory(self, metal: Metal, source: &str, points: Vec<(NaiveDate, f64)>) -> Self {
        let metric = metal
            .spec()
            .metric_for(source)
            .expect("source is not in the metal's catalogue");
        self.with_series(metal, source, metric, points)
    }

    pub fn with_prices(mut self, metal: Metal, points: Vec<(NaiveDate, f64)>) -> Self {
        self.prices.insert(metal, points);
        self
    }

    pub fn with_error(mut self, metal: Metal, reason: &str) -> Self {
        self.errors.insert(metal, reason.to_string());
        self
    }

    fn check(&self, metal: Metal) -> Result<(), InvquantError> {
        match self.errors.get(&metal) {
            Some(reason) => Err(InvquantError::Store {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl TimeSeriesStore for MockStore {
    fn fetch_series(
        &self,
        metal: Metal,
        source: &str,
        metric: &str,
    ) -> Result<TimeSeries, InvquantError> {
        self.check(metal)?;
        let spec = metal.spec();
        let key = (metal, source.to_uppercase(), metric.to_string());
        let points = self.series.get(&key).cloned().unwrap_or_default();
        to_series(&source.to_uppercase(), spec.frequency, spec.unit, points)
    }

    fn fetch_prices(&self, metal: Metal) -> Result<TimeSeries, InvquantError> {
        self.check(metal)?;
        let points = self.prices.get(&metal).cloned().unwrap_or_default();
        to_series(&format!("{}_price", metal.code()), Frequency::Daily, "usd", points)
    }
}

fn to_series(
    name: &str,
    frequency: Frequency,
    unit: &str,
    points: Vec<(NaiveDate, f64)>,
) -> Result<TimeSeries, InvquantError> {
    let points = points
        .into_iter()
        .map(|(date, value)| Observation::new(date, value))
        .collect();
    TimeSeries::new(name, frequency, unit, points)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One value every seven days from `start`.
pub fn weekly_points(start: NaiveDate, values: &[f64]) -> Vec<(NaiveDate, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (start + Duration::days(7 * i as i64), v))
        .collect()
}

/// Weekday observations from `start` through `end`, valued by `f(index)`.
pub fn weekday_points(
    start: NaiveDate,
    end: NaiveDate,
    f: impl Fn(usize) -> f64,
) -> Vec<(NaiveDate, f64)> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .enumerate()
        .map(|(i, d)| (d, f(i)))
        .collect()
}

/// Falls by 10 for 52 weeks from 1000, then rises by 20 for 52 weeks.
pub fn v_shape() -> Vec<f64> {
    (0..=104)
        .map(|i| {
            if i <= 52 {
                1000.0 - 10.0 * i as f64
            } else {
                480.0 + 20.0 * (i - 52) as f64
            }
        })
        .collect()
}

/// One-year windows over 2021-01-01 (a Friday) to 2022-12-30.
pub const TEST_INI: &str = r#"
[data]
start_date = 2021-01-01
end_date = 2022-12-30

[factors]
window_years = 1
display_years = 1
"#;

pub fn settings_from_ini(content: &str) -> Settings {
    let adapter = FileConfigAdapter::from_string(content).unwrap();
    load_settings(&adapter).unwrap()
}

pub fn test_settings() -> Settings {
    settings_from_ini(TEST_INI)
}
