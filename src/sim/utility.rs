//! The centralized utility acting as unlimited counterparty for every microgrid.

use std::fmt;

use tracing::debug;

use crate::error::ConfigError;

/// Fixed-price counterparty that always accepts or supplies energy.
///
/// The utility buys surplus at `buy_price` and sells energy at `sell_price`.
/// Net revenue falls by what the utility pays out and rises by what it
/// charges, so a seller's gain equals the utility's outflow.
#[derive(Debug, Clone)]
pub struct UtilityMarket {
    buy_price: f64,
    sell_price: f64,
    purchased_kwh: f64,
    sold_kwh: f64,
    net_revenue: f64,
}

impl UtilityMarket {
    /// Creates a new utility with the given prices per kWh.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either price is not a positive finite number.
    pub fn new(buy_price: f64, sell_price: f64) -> Result<Self, ConfigError> {
        if !buy_price.is_finite() || buy_price <= 0.0 {
            return Err(ConfigError::new(
                "buy_price",
                format!("must be > 0, got {buy_price}"),
            ));
        }
        if !sell_price.is_finite() || sell_price <= 0.0 {
            return Err(ConfigError::new(
                "sell_price",
                format!("must be > 0, got {sell_price}"),
            ));
        }

        Ok(Self {
            buy_price,
            sell_price,
            purchased_kwh: 0.0,
            sold_kwh: 0.0,
            net_revenue: 0.0,
        })
    }

    /// Buys surplus energy from a microgrid.
    ///
    /// # Returns
    ///
    /// The payment owed to the seller.
    pub fn buy_energy(&mut self, amount_kwh: f64) -> f64 {
        let amount = amount_kwh.max(0.0);
        let payment = amount * self.buy_price;
        self.purchased_kwh += amount;
        self.net_revenue -= payment;
        debug!(amount_kwh = amount, payment, "utility bought energy");
        payment
    }

    /// Sells energy to a microgrid.
    ///
    /// # Returns
    ///
    /// The cost charged to the buyer.
    pub fn sell_energy(&mut self, amount_kwh: f64) -> f64 {
        let amount = amount_kwh.max(0.0);
        let cost = amount * self.sell_price;
        self.sold_kwh += amount;
        self.net_revenue += cost;
        debug!(amount_kwh = amount, cost, "utility sold energy");
        cost
    }

    pub fn buy_price(&self) -> f64 {
        self.buy_price
    }

    pub fn sell_price(&self) -> f64 {
        self.sell_price
    }

    /// Cumulative energy bought from microgrids.
    pub fn purchased_kwh(&self) -> f64 {
        self.purchased_kwh
    }

    /// Cumulative energy sold to microgrids.
    pub fn sold_kwh(&self) -> f64 {
        self.sold_kwh
    }

    pub fn net_revenue(&self) -> f64 {
        self.net_revenue
    }
}

impl fmt::Display for UtilityMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Energy purchased from grids: {:.3} kWh", self.purchased_kwh)?;
        writeln!(f, "Energy sold to grids:        {:.3} kWh", self.sold_kwh)?;
        write!(f, "Utility net revenue:         ${:.3}", self.net_revenue)
    }
}
