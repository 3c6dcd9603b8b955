//! Instrument catalogue: which sources make up each metal's global inventory.

use crate::domain::error::InvquantError;
use crate::domain::series::Frequency;
use std::fmt;

/// Metric name used for futures price series.
pub const PRICE_METRIC: &str = "price_futures_usd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metal {
    Copper,
    Gold,
    Silver,
}

impl Metal {
    pub const ALL: [Metal; 3] = [Metal::Copper, Metal::Gold, Metal::Silver];

    pub fn parse(name: &str) -> Result<Self, InvquantError> {
        match name.trim().to_uppercase().as_str() {
            "COPPER" => Ok(Metal::Copper),
            "GOLD" => Ok(Metal::Gold),
            "SILVER" => Ok(Metal::Silver),
            other => Err(InvquantError::invalid_parameter(
                "metal",
                format!("unknown metal '{other}'"),
            )),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Metal::Copper => "COPPER",
            Metal::Gold => "GOLD",
            Metal::Silver => "SILVER",
        }
    }

    pub fn spec(self) -> InstrumentSpec {
        match self {
            Metal::Copper => InstrumentSpec {
                metal: self,
                frequency: Frequency::Weekly,
                unit: "mt",
                sources: &[
                    ("LME", "lme_closing_mt"),
                    ("COMEX", "comex_total_mt"),
                    ("SHFE", "shfe_total_mt"),
                ],
            },
            Metal::Gold => InstrumentSpec {
                metal: self,
                frequency: Frequency::Daily,
                unit: "oz",
                sources: &[
                    ("COMEX", "comex_total_oz"),
                    ("LBMA", "lbma_holdings_oz"),
                    ("GLD", "gld_holdings_oz"),
                ],
            },
            Metal::Silver => InstrumentSpec {
                metal: self,
                frequency: Frequency::Daily,
                unit: "oz",
                sources: &[
                    ("COMEX", "comex_total_oz"),
                    ("LBMA", "lbma_holdings_oz"),
                    ("SLV", "slv_holdings_oz"),
                ],
            },
        }
    }
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub metal: Metal,
    pub frequency: Frequency,
    pub unit: &'static str,
    /// (source, inventory metric) pairs summed into the global total.
    pub sources: &'static [(&'static str, &'static str)],
}

impl InstrumentSpec {
    /// Rolling window length, in this instrument's own periods.
    pub fn rolling_window(&self, window_years: usize) -> usize {
        window_years * self.frequency.periods_per_year()
    }

    pub fn metric_for(&self, source: &str) -> Option<&'static str> {
        self.sources
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(source))
            .map(|(_, m)| *m)
    }
}
