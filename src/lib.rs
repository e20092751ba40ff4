pub mod bad_nights;
pub mod cli;
pub mod commands;
pub mod conversions;
pub mod error;
pub mod internight;
pub mod models;
pub mod nights;
pub mod query;
pub mod star;
pub mod stats;
pub mod store;
pub mod utils;

// Re-export commonly used items
pub use bad_nights::{calc_bad_nights, BadNightsConfig, BadNightsReport, FailurePolicy};
pub use error::{Result, TroutError};
pub use internight::{BandTable, InternightBand};
pub use models::{Observation, StarId, Variant};
pub use star::Star;
