//! Ultimate loss and burn cost projection

mod methods;
mod summary;
mod burn_cost;

pub use methods::{bornhuetter_ferguson, cape_cod_prior, chainladder, CapeCodYear, ProjectionMethod};
pub use summary::ExperienceSummary;
pub use burn_cost::{BurnCostModel, ModellingAssumptions, YearSelection};
