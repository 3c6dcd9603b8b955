//! Time-series store port trait.
//!
//! Implementations own cleaning: series they return are sorted ascending
//! with unique dates. A series the store has never seen is empty, not an
//! error.

use crate::domain::error::InvquantError;
use crate::domain::instrument::Metal;
use crate::domain::series::TimeSeries;

pub trait TimeSeriesStore: Sync {
    fn fetch_series(
        &self,
        metal: Metal,
        source: &str,
        metric: &str,
    ) -> Result<TimeSeries, InvquantError>;

    /// Futures settlement prices for `metal`.
    fn fetch_prices(&self, metal: Metal) -> Result<TimeSeries, InvquantError>;

    /// Every catalogue source for `metal`, in catalogue order.
    fn fetch_inventory(&self, metal: Metal) -> Result<Vec<TimeSeries>, InvquantError> {
        metal
            .spec()
            .sources
            .iter()
            .map(|(source, metric)| self.fetch_series(metal, source, metric))
            .collect()
    }
}
