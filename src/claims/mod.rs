//! Claim data structures, aggregation and loading

mod data;
mod aggregator;
pub mod loader;

pub use data::{Claim, ClaimDevelopmentHistory, ClaimStatus, ClaimYearType, Claims, ClaimsMetaData};
pub use aggregator::{ClaimAggregator, ClaimGrouping, ClaimsAggregate, GroupKey};
pub use loader::{load_claims, load_claims_from_reader};
