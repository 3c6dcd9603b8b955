//! Dashboard classification of the latest global inventory percentile.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryRegime {
    /// Inventory near its historical low: shortage.
    StrongLong,
    Long,
    Neutral,
    Short,
    /// Inventory near its historical high: glut.
    StrongShort,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeReading {
    pub regime: InventoryRegime,
    pub percentile: f64,
}

impl InventoryRegime {
    /// Classifies a percentile; no data reads as neutral at 0.5.
    pub fn classify(percentile: Option<f64>) -> RegimeReading {
        let Some(p) = percentile else {
            return RegimeReading {
                regime: InventoryRegime::Neutral,
                percentile: 0.5,
            };
        };
        let regime = if p <= 0.05 {
            InventoryRegime::StrongLong
        } else if p >= 0.95 {
            InventoryRegime::StrongShort
        } else if p <= 0.10 {
            InventoryRegime::Long
        } else if p >= 0.90 {
            InventoryRegime::Short
        } else {
            InventoryRegime::Neutral
        };
        RegimeReading {
            regime,
            percentile: p,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InventoryRegime::StrongLong => "STRONG LONG",
            InventoryRegime::Long => "LONG",
            InventoryRegime::Neutral => "NEUTRAL",
            InventoryRegime::Short => "SHORT",
            InventoryRegime::StrongShort => "STRONG SHORT",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InventoryRegime::StrongLong => "shortage",
            InventoryRegime::Long => "tight",
            InventoryRegime::Neutral => "balanced",
            InventoryRegime::Short => "ample",
            InventoryRegime::StrongShort => "glut",
        }
    }
}

impl fmt::Display for InventoryRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.description())
    }
}
