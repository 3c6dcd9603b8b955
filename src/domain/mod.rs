//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod derived;
pub mod error;
pub mod factors;
pub mod instrument;
pub mod metrics;
pub mod percentile;
pub mod regime;
pub mod series;
pub mod signal;
pub mod stats;
pub mod strategy;
