//! Reinsurance Pricing - experience rating engine for treaty layers
//!
//! This library provides:
//! - Claim and exposure data with policy deductibles and limits
//! - Trending to a common base year and FX translation
//! - Layer allocation for quota share, excess of loss, franchise, surplus and stop loss covers
//! - Development triangles, link ratios and fitted development curves
//! - IBNER pattern extraction
//! - Burn cost projection (chain ladder, Bornhuetter-Ferguson, Cape Cod)

pub mod error;
pub mod claims;
pub mod exposures;
pub mod trending;
pub mod treaty;
pub mod triangles;
pub mod projection;
pub mod experience;

// Re-export commonly used types
pub use error::{PricingError, Result};
pub use claims::{Claim, ClaimDevelopmentHistory, Claims, ClaimsMetaData};
pub use exposures::{Exposure, Exposures};
pub use trending::{trend_factor, Trending};
pub use treaty::{ContractType, RIContract, RILayer};
pub use triangles::{IbnerPatternExtractor, Triangle};
pub use projection::{BurnCostModel, ModellingAssumptions, ProjectionMethod};
pub use experience::ExperienceModel;
