//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::InvquantError;
use crate::domain::factors::FactorTable;
use crate::domain::percentile::PercentileTable;
use crate::domain::strategy::SignalRow;

/// Port for writing pipeline tables.
pub trait ReportPort {
    fn write_percentiles(&self, table: &PercentileTable, name: &str) -> Result<(), InvquantError>;

    fn write_signals(&self, rows: &[SignalRow], name: &str) -> Result<(), InvquantError>;

    /// Writes the backtest record and its metrics mapping.
    fn write_backtest(&self, result: &BacktestResult, name: &str) -> Result<(), InvquantError>;

    /// Writes one derived factor table, named after `name` and the table.
    fn write_factors(&self, table: &FactorTable, name: &str) -> Result<(), InvquantError>;
}
