use crate::error::ConfigError;

/// Default fractional capacity loss applied by each [`Battery::degrade`] call.
pub const DEFAULT_DEGRADATION_RATE: f64 = 0.1;

/// A bounded energy reservoir with linear capacity degradation.
///
/// `Battery` keeps `0 <= level <= capacity` at all times. Stores and draws
/// are clamped to what fits or what is held; neither can fail.
#[derive(Debug, Clone)]
pub struct Battery {
    /// Usable capacity in kilowatt-hours (shrinks on degradation).
    capacity_kwh: f64,

    /// Stored energy in kilowatt-hours.
    level_kwh: f64,

    /// Fraction of capacity lost per degradation call (0..1).
    pub degradation_rate: f64,
}

impl Battery {
    /// Creates a new battery.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Capacity in kWh (must be >= 0)
    /// * `initial_level_kwh` - Starting level, clamped to `[0, capacity_kwh]`
    /// * `degradation_rate` - Fraction lost per `degrade` call, in `[0, 1)`
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if capacity is negative or not finite, or the
    /// degradation rate is out of range.
    pub fn new(
        capacity_kwh: f64,
        initial_level_kwh: f64,
        degradation_rate: f64,
    ) -> Result<Self, ConfigError> {
        if !capacity_kwh.is_finite() || capacity_kwh < 0.0 {
            return Err(ConfigError::new(
                "battery_capacity_kwh",
                format!("must be a finite value >= 0, got {capacity_kwh}"),
            ));
        }
        if !(0.0..1.0).contains(&degradation_rate) {
            return Err(ConfigError::new(
                "degradation_rate",
                format!("must be in [0.0, 1.0), got {degradation_rate}"),
            ));
        }

        Ok(Self {
            capacity_kwh,
            level_kwh: initial_level_kwh.clamp(0.0, capacity_kwh),
            degradation_rate,
        })
    }

    /// Stores up to the remaining headroom.
    ///
    /// # Returns
    ///
    /// The unabsorbed remainder (energy not stored).
    pub fn store(&mut self, amount_kwh: f64) -> f64 {
        let amount = amount_kwh.max(0.0);
        let stored = amount.min(self.headroom_kwh());
        self.level_kwh += stored;
        amount - stored
    }

    /// Draws up to the stored level.
    ///
    /// # Returns
    ///
    /// The energy actually drawn, which may be less than requested.
    pub fn draw(&mut self, amount_kwh: f64) -> f64 {
        let drawn = amount_kwh.max(0.0).min(self.level_kwh);
        self.level_kwh -= drawn;
        drawn
    }

    /// Energy that can be drawn without dropping below `reserve_kwh`.
    pub fn available_above(&self, reserve_kwh: f64) -> f64 {
        (self.level_kwh - reserve_kwh).max(0.0)
    }

    /// Remaining space before the battery is full.
    pub fn headroom_kwh(&self) -> f64 {
        (self.capacity_kwh - self.level_kwh).max(0.0)
    }

    /// Current stored energy in kWh.
    pub fn level_kwh(&self) -> f64 {
        self.level_kwh
    }

    /// Current usable capacity in kWh.
    pub fn capacity_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    /// State of charge as a percentage of current capacity, floored at 0.
    pub fn state_of_charge(&self) -> f64 {
        if self.capacity_kwh <= 0.0 {
            return 0.0;
        }
        (100.0 * self.level_kwh / self.capacity_kwh).max(0.0)
    }

    /// Shrinks capacity by the degradation rate and clamps the level to it.
    pub fn degrade(&mut self) {
        self.capacity_kwh *= 1.0 - self.degradation_rate;
        self.level_kwh = self.level_kwh.min(self.capacity_kwh);
    }
}
