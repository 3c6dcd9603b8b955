//! CSV file time-series store.
//!
//! One file per series under a base directory:
//! `{METAL}_{SOURCE}_{metric}.csv` for inventories and
//! `{METAL}_price_futures_usd.csv` for prices, each with a `date,value` header.

use crate::domain::error::InvquantError;
use crate::domain::instrument::{Metal, PRICE_METRIC};
use crate::domain::series::{Frequency, Observation, TimeSeries};
use crate::ports::data_port::TimeSeriesStore;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct CsvStore {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    date: String,
    value: Option<f64>,
}

impl CsvStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn series_path(&self, metal: Metal, source: &str, metric: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}_{}.csv", metal.code(), source.to_uppercase(), metric))
    }

    fn price_path(&self, metal: Metal) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", metal.code(), PRICE_METRIC))
    }

    fn load(
        &self,
        path: &Path,
        name: String,
        frequency: Frequency,
        unit: &str,
    ) -> Result<TimeSeries, InvquantError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "series file not found, using empty series");
                return Ok(TimeSeries::empty(name, frequency, unit));
            }
            Err(e) => {
                return Err(InvquantError::Store {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        // Sorted by date; a repeated date keeps the last row.
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut rdr = csv::Reader::from_reader(file);
        for result in rdr.deserialize() {
            let record: CsvRecord = result.map_err(|e| InvquantError::Store {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let date = NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").map_err(|e| {
                InvquantError::Store {
                    reason: format!("invalid date '{}' in {}: {}", record.date, path.display(), e),
                }
            })?;
            match record.value {
                Some(v) if v.is_finite() => {
                    by_date.insert(date, v);
                }
                Some(_) => {
                    return Err(InvquantError::Store {
                        reason: format!("non-finite value on {} in {}", date, path.display()),
                    });
                }
                None => {}
            }
        }

        let points: Vec<Observation> = by_date
            .into_iter()
            .map(|(date, value)| Observation::new(date, value))
            .collect();
        tracing::debug!(path = %path.display(), points = points.len(), "loaded series");
        TimeSeries::new(name, frequency, unit, points)
    }
}

impl TimeSeriesStore for CsvStore {
    fn fetch_series(
        &self,
        metal: Metal,
        source: &str,
        metric: &str,
    ) -> Result<TimeSeries, InvquantError> {
        let spec = metal.spec();
        let path = self.series_path(metal, source, metric);
        self.load(&path, source.to_uppercase(), spec.frequency, spec.unit)
    }

    fn fetch_prices(&self, metal: Metal) -> Result<TimeSeries, InvquantError> {
        let path = self.price_path(metal);
        self.load(&path, format!("{}_price", metal.code()), Frequency::Daily, "usd")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("GOLD_COMEX_comex_total_oz.csv"),
            "date,value\n\
             2024-01-17,300.0\n\
             2024-01-15,100.0\n\
             2024-01-16,200.0\n\
             2024-01-16,250.0\n",
        )
        .unwrap();
        fs::write(
            path.join("GOLD_price_futures_usd.csv"),
            "date,value\n2024-01-15,2050.5\n2024-01-16,\n2024-01-17,2061.0\n",
        )
        .unwrap();
        fs::write(path.join("SILVER_SLV_slv_holdings_oz.csv"), "date,value\nyesterday,1\n").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_series_sorts_and_keeps_last_duplicate() {
        let (_dir, path) = setup_test_data();
        let store = CsvStore::new(path);

        let series = store.fetch_series(Metal::Gold, "comex", "comex_total_oz").unwrap();
        assert_eq!(series.name, "COMEX");
        assert_eq!(series.frequency, Frequency::Daily);
        assert_eq!(series.unit, "oz");
        assert_eq!(series.dates(), vec![d(2024, 1, 15), d(2024, 1, 16), d(2024, 1, 17)]);
        assert_eq!(series.values(), vec![100.0, 250.0, 300.0]);
    }

    #[test]
    fn fetch_prices_skips_blank_values() {
        let (_dir, path) = setup_test_data();
        let store = CsvStore::new(path);

        let prices = store.fetch_prices(Metal::Gold).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices.values(), vec![2050.5, 2061.0]);
    }

    #[test]
    fn missing_file_is_empty_series() {
        let (_dir, path) = setup_test_data();
        let store = CsvStore::new(path);

        let series = store.fetch_series(Metal::Copper, "LME", "lme_closing_mt").unwrap();
        assert!(series.is_empty());
        assert_eq!(series.frequency, Frequency::Weekly);
    }

    #[test]
    fn bad_date_is_store_error() {
        let (_dir, path) = setup_test_data();
        let store = CsvStore::new(path);

        let err = store
            .fetch_series(Metal::Silver, "SLV", "slv_holdings_oz")
            .unwrap_err();
        assert!(matches!(err, InvquantError::Store { .. }));
        assert_eq!(err.exit_status(), 3);
    }

    #[test]
    fn fetch_inventory_reads_every_catalogue_source() {
        let (_dir, path) = setup_test_data();
        let store = CsvStore::new(path);

        let series = store.fetch_inventory(Metal::Gold).unwrap();
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["COMEX", "LBMA", "GLD"]);
        assert_eq!(series[0].len(), 3);
        assert!(series[1].is_empty());
    }
}
