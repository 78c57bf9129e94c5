//! Exposure data structures and loading

mod data;
pub mod loader;

pub use data::{AggregateExposures, Exposure, ExposureBasis, ExposureMetaData, ExposureValues, Exposures};
pub use loader::{load_exposures, load_exposures_from_reader};
