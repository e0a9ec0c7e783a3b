//! Device simulation components for microgrid energy modeling.

/// Battery storage model.
pub mod battery;
/// Household demand model.
pub mod house;
/// Solar photovoltaic generation model.
pub mod solar;
pub mod types;

// Re-export the main types for convenience
pub use battery::Battery;
pub use house::House;
pub use solar::SolarPv;
pub use types::Device;
pub use types::DeviceContext;
pub use types::SupplyChannel;
