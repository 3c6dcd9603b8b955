//! Discrete trading signal.
//!
//! The integer form (-1 / 0 / 1) only exists at the serialization boundary.

use crate::domain::error::InvquantError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Short,
    #[default]
    Flat,
    Long,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }

    /// Signed market exposure of holding this signal.
    pub fn exposure(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::Short => "SHORT",
            Signal::Flat => "FLAT",
            Signal::Long => "LONG",
        }
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.as_i8()
    }
}

impl TryFrom<i8> for Signal {
    type Error = InvquantError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Signal::Short),
            0 => Ok(Signal::Flat),
            1 => Ok(Signal::Long),
            other => Err(InvquantError::invalid_parameter(
                "signal",
                format!("{other} is not one of -1, 0, 1"),
            )),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
