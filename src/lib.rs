//! Hourly simulation of a federation of solar-plus-battery microgrids.

/// TOML scenario configuration and presets.
pub mod config;
pub mod devices;
pub mod error;
pub mod io;
/// Microgrid balancing, federation stepping, and records.
pub mod sim;
