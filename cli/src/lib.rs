//! nanosweep-cli: indicator parameter sweeps from a TOML config.
//!
//! Loads a close series, sweeps an indicator over a list of windows on the
//! configured backend, and writes the stacked result as a JSON report.

pub mod config;
pub mod error;
pub mod indicators;
pub mod input;
pub mod report;
pub mod sweep;
