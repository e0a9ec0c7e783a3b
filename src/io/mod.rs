/// CSV persistence of simulation records.
pub mod export;
