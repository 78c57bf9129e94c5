//! Treaty layers, contracts and loss allocation

mod contract;
mod layer;

pub use contract::{load_contract, ClaimTriggerBasis, IndexationClauseType, RIContract, RIContractMetadata};
pub use layer::{
    excess_of_loss, franchise_deductible, quota_share, surplus_share, ContractType, LayerTerms, RILayer,
};
