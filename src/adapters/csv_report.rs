//! CSV report adapter implementing ReportPort.
//!
//! Each call writes one or more `{name}_{table}.csv` files into the output
//! directory, creating it if needed. The table writers are generic over
//! `io::Write` so the CLI prints the same CSV to stdout.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::InvquantError;
use crate::domain::factors::FactorTable;
use crate::domain::metrics::monthly_returns;
use crate::domain::percentile::PercentileTable;
use crate::domain::strategy::SignalRow;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::io;
use std::path::PathBuf;

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn create(&self, name: &str, table: &str) -> Result<fs::File, InvquantError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{name}_{table}.csv"));
        tracing::info!(path = %path.display(), "writing report table");
        Ok(fs::File::create(path)?)
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// `date`, one column per source, `aggregate_total`, `percentile`.
pub fn write_percentile_table<W: io::Write>(
    table: &PercentileTable,
    out: W,
) -> Result<(), InvquantError> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec!["date".to_string()];
    header.extend(table.sources.iter().cloned());
    header.push("aggregate_total".to_string());
    header.push("percentile".to_string());
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.date.to_string()];
        record.extend(row.components.iter().map(|v| v.to_string()));
        record.push(row.total.to_string());
        record.push(optional(row.percentile));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `date,score,signal,reason`; reasons are quoted when they contain commas.
pub fn write_signal_table<W: io::Write>(rows: &[SignalRow], out: W) -> Result<(), InvquantError> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_factor_table<W: io::Write>(table: &FactorTable, out: W) -> Result<(), InvquantError> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec!["date".to_string()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.date.to_string()];
        record.extend(row.values.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_percentiles(&self, table: &PercentileTable, name: &str) -> Result<(), InvquantError> {
        write_percentile_table(table, self.create(name, "percentile")?)
    }

    fn write_signals(&self, rows: &[SignalRow], name: &str) -> Result<(), InvquantError> {
        write_signal_table(rows, self.create(name, "signals")?)
    }

    fn write_backtest(&self, result: &BacktestResult, name: &str) -> Result<(), InvquantError> {
        let mut wtr = csv::Writer::from_writer(self.create(name, "backtest")?);
        for row in &result.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;

        let mut wtr = csv::Writer::from_writer(self.create(name, "metrics")?);
        wtr.write_record(["metric", "value"])?;
        for (metric, value) in result.metrics.to_display_map() {
            wtr.write_record([metric, value.as_str()])?;
        }
        wtr.flush()?;

        let mut wtr = csv::Writer::from_writer(self.create(name, "monthly")?);
        wtr.write_record(["year", "month", "return"])?;
        for ((year, month), ret) in monthly_returns(&result.rows) {
            wtr.write_record([year.to_string(), month.to_string(), ret.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_factors(&self, table: &FactorTable, name: &str) -> Result<(), InvquantError> {
        write_factor_table(table, self.create(name, &table.name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, run_backtest};
    use crate::domain::factors::catalogue;
    use crate::domain::instrument::Metal;
    use crate::domain::percentile::PercentileRow;
    use crate::domain::series::{Frequency, Observation, TimeSeries};
    use crate::domain::signal::Signal;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn percentile_table_has_component_columns() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let table = PercentileTable {
            sources: vec!["LME".into(), "COMEX".into()],
            rows: vec![
                PercentileRow {
                    date: d(5),
                    components: vec![1.0, 2.0],
                    total: 3.0,
                    percentile: None,
                },
                PercentileRow {
                    date: d(12),
                    components: vec![2.0, 2.0],
                    total: 4.0,
                    percentile: Some(1.0),
                },
            ],
        };
        adapter.write_percentiles(&table, "COPPER").unwrap();

        let out = fs::read_to_string(dir.path().join("COPPER_percentile.csv")).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "date,LME,COMEX,aggregate_total,percentile");
        assert_eq!(lines[1], "2024-01-05,1,2,3,");
        assert_eq!(lines[2], "2024-01-12,2,2,4,1");
    }

    #[test]
    fn signal_table_uses_integer_signals() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().join("nested"));
        let rows = vec![SignalRow {
            date: d(2),
            score: Some(0.03),
            signal: Signal::Long,
            reason: "enter long".into(),
        }];
        adapter.write_signals(&rows, "beta").unwrap();

        let out = fs::read_to_string(dir.path().join("nested/beta_signals.csv")).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "date,score,signal,reason");
        assert_eq!(lines[1], "2024-01-02,0.03,1,enter long");
    }

    #[test]
    fn backtest_writes_record_metrics_and_monthly() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let prices = TimeSeries::new(
            "GOLD_price",
            Frequency::Daily,
            "usd",
            vec![
                Observation::new(d(2), 100.0),
                Observation::new(d(3), 101.0),
                Observation::new(d(4), 102.0),
            ],
        )
        .unwrap();
        let result = run_backtest(
            &prices,
            &[(d(2), Signal::Long)],
            &BacktestConfig::default(),
        )
        .unwrap();
        adapter.write_backtest(&result, "gold").unwrap();

        let record = fs::read_to_string(dir.path().join("gold_backtest.csv")).unwrap();
        assert!(record.starts_with("date,price,signal,position,position_change,market_return"));
        assert_eq!(record.lines().count(), 4);

        let metrics = fs::read_to_string(dir.path().join("gold_metrics.csv")).unwrap();
        assert_eq!(metrics.lines().count(), 16);
        assert!(metrics.contains("total_trades,1"));

        let monthly = fs::read_to_string(dir.path().join("gold_monthly.csv")).unwrap();
        assert_eq!(monthly.lines().count(), 2);
    }

    #[test]
    fn in_band_reasons_with_commas_stay_one_field() {
        let rows = vec![
            SignalRow {
                date: d(2),
                score: Some(0.5),
                signal: Signal::Flat,
                reason: "0.5000 within [0.0500, 0.9500]: stay flat".into(),
            },
            SignalRow {
                date: d(3),
                score: None,
                signal: Signal::Flat,
                reason: "missing data".into(),
            },
        ];
        let mut buf = Vec::new();
        write_signal_table(&rows, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(false)
            .from_reader(buf.as_slice());
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.len() == 4));
        assert_eq!(&records[0][3], "0.5000 within [0.0500, 0.9500]: stay flat");
        assert_eq!(&records[1][1], "");
    }

    #[test]
    fn factor_table_is_named_after_the_factor() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let spec = catalogue(Metal::Copper)
            .iter()
            .find(|s| s.name == "lme_flows")
            .unwrap();
        let table = spec
            .compute(&[d(5), d(12)], &[vec![5.0, 1.0], vec![2.0, 4.0]], None)
            .unwrap();
        adapter.write_factors(&table, "COPPER").unwrap();

        let out = fs::read_to_string(dir.path().join("COPPER_lme_flows.csv")).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "date,delivered_in,delivered_out,net_flow");
        assert_eq!(lines[1], "2024-01-05,5,2,3");
        assert_eq!(lines[2], "2024-01-12,1,4,-3");
    }
}
