/// Hour clock driving the federation.
pub mod clock;
/// Federation orchestrator and settlement netting.
pub mod federation;
pub mod kpi;
/// Microgrid balancing algorithm.
pub mod microgrid;
pub mod peers;
pub mod records;
pub mod snapshot;
pub mod types;
pub mod utility;

pub use federation::Federation;
pub use kpi::FederationKpi;
pub use microgrid::{Microgrid, MicrogridSpec, PeakPricing};
pub use utility::UtilityMarket;
