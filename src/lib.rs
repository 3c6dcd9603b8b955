//! invquant: commodity inventory percentile factors, signal state machines
//! and a vectorized backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command wiring in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
