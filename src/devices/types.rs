//! Common types and traits for device simulation components.

use rand::{Rng, rngs::StdRng};

/// Number of simulated hours per day.
pub const HOURS_PER_DAY: usize = 24;

/// Energy amounts at or below this threshold (kWh) are treated as zero.
pub const ENERGY_EPSILON: f64 = 1e-9;

/// Contextual information passed to devices during energy calculations.
///
/// # Fields
/// * `hour` - Absolute simulation hour (0-based, strictly increasing)
pub struct DeviceContext {
    pub hour: usize,
}

impl DeviceContext {
    /// Creates a new DeviceContext for the given simulation hour.
    pub fn new(hour: usize) -> Self {
        Self { hour }
    }

    /// Returns the hour within the current day (`hour mod 24`).
    pub fn hour_of_day(&self) -> usize {
        self.hour % HOURS_PER_DAY
    }
}

/// Trait defining a device that produces or consumes energy each hour.
///
/// This trait provides a common interface for generation and demand
/// devices so the grid can sample them uniformly.
pub trait Device {
    /// Returns the energy value for the hour described by `context`.
    ///
    /// Generation devices return the energy produced, demand devices the
    /// energy requested. Both are non-negative kWh.
    fn energy_kwh(&mut self, context: &DeviceContext) -> f64;

    /// Returns a human-readable type name for the device.
    fn device_type(&self) -> &'static str;
}

/// A source of immediately available energy that a demand device can pull from.
///
/// Microgrids hand their houses a channel backed only by the current
/// generation pool, never by storage or peers.
pub trait SupplyChannel {
    /// Supplies up to `requested_kwh` and returns the amount actually supplied.
    fn supply(&mut self, requested_kwh: f64) -> f64;
}

/// Draws a uniform fraction in `[min, max]`.
///
/// A degenerate band (`min == max`) returns `min` without consuming randomness.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `min` - Lower bound of the band
/// * `max` - Upper bound of the band
pub fn uniform_fraction(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    rng.random_range(min..=max)
}
