//! Treaty layers and their loss-to-layer functions
//!
//! Layer terms are applied to each claim's capped history, i.e. after the
//! underlying policy deductible and limit, and always after trending.

use serde::{Deserialize, Serialize};

use crate::claims::{Claim, Claims};
use crate::error::{PricingError, Result};

/// Excess of loss: the part of `gross` above `attachment`, at most `limit`
pub fn excess_of_loss(gross: f64, attachment: f64, limit: f64) -> f64 {
    (gross - attachment).min(limit).max(0.0)
}

/// Quota share: a fixed proportion of `gross`, never negative
pub fn quota_share(gross: f64, cession: f64) -> f64 {
    (gross * cession).max(0.0)
}

/// Franchise deductible: nothing up to `attachment`, ground-up (capped at `limit`) above it
pub fn franchise_deductible(gross: f64, attachment: f64, limit: f64) -> f64 {
    if gross > attachment {
        gross.min(limit)
    } else {
        0.0
    }
}

/// Surplus share: `gross` times the share of `sum_insured` above the retention `attachment`
pub fn surplus_share(gross: f64, sum_insured: f64, attachment: f64) -> f64 {
    if sum_insured <= attachment {
        return 0.0;
    }
    gross * (sum_insured - attachment) / sum_insured
}

/// Contract form of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    QuotaShare,
    ExcessOfLoss,
    FranchiseDeductible,
    SurplusShare,
    AggregateStopLoss,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::QuotaShare => "Quota Share",
            ContractType::ExcessOfLoss => "Excess of Loss",
            ContractType::FranchiseDeductible => "Franchise Deductible",
            ContractType::SurplusShare => "Surplus Share",
            ContractType::AggregateStopLoss => "Aggregate Stop Loss",
        }
    }
}

/// Resolved terms of a layer, one variant per loss formula
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerTerms {
    ExcessOfLoss { attachment: f64, limit: f64 },
    QuotaShare { cession: f64 },
    FranchiseDeductible { attachment: f64, limit: f64 },
    SurplusShare { sum_insured: f64, attachment: f64 },
}

impl LayerTerms {
    /// Amount of `gross` ceded under these terms
    pub fn loss_to_layer(&self, gross: f64) -> f64 {
        match *self {
            LayerTerms::ExcessOfLoss { attachment, limit } => excess_of_loss(gross, attachment, limit),
            LayerTerms::QuotaShare { cession } => quota_share(gross, cession),
            LayerTerms::FranchiseDeductible { attachment, limit } => franchise_deductible(gross, attachment, limit),
            LayerTerms::SurplusShare { sum_insured, attachment } => surplus_share(gross, sum_insured, attachment),
        }
    }
}

fn default_share() -> f64 {
    1.0
}

/// A single layer of a reinsurance treaty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RILayer {
    pub layer_id: u32,
    pub layer_name: String,
    pub contract_type: ContractType,

    pub occurrence_attachment: f64,
    pub occurrence_limit: f64,

    #[serde(default)]
    pub aggregate_attachment: f64,
    #[serde(default)]
    pub aggregate_limit: Option<f64>,

    /// Proportion ceded (quota share) or share of the layer placed
    #[serde(default = "default_share")]
    pub cession: f64,

    /// Reference sum insured for surplus share layers
    #[serde(default)]
    pub sum_insured: Option<f64>,

    #[serde(default)]
    pub subject_lines_of_business: Vec<String>,

    /// Full subject premium before line and cession
    #[serde(default)]
    pub full_subject_premium: f64,

    #[serde(default = "default_share")]
    pub written_line: f64,

    #[serde(default = "default_share")]
    pub signed_line: f64,

    #[serde(default)]
    pub number_of_reinstatements: u32,

    /// Cost of each reinstatement as a proportion of the layer premium
    #[serde(default)]
    pub reinstatement_cost: Vec<f64>,
}

impl RILayer {
    /// Create a layer with 100% shares and no bookkeeping terms
    pub fn new(
        layer_id: u32,
        layer_name: impl Into<String>,
        contract_type: ContractType,
        occurrence_attachment: f64,
        occurrence_limit: f64,
    ) -> Self {
        Self {
            layer_id,
            layer_name: layer_name.into(),
            contract_type,
            occurrence_attachment,
            occurrence_limit,
            aggregate_attachment: 0.0,
            aggregate_limit: None,
            cession: 1.0,
            sum_insured: None,
            subject_lines_of_business: Vec::new(),
            full_subject_premium: 0.0,
            written_line: 1.0,
            signed_line: 1.0,
            number_of_reinstatements: 0,
            reinstatement_cost: Vec::new(),
        }
    }

    pub fn with_cession(mut self, cession: f64) -> Self {
        self.cession = cession;
        self
    }

    pub fn with_sum_insured(mut self, sum_insured: f64) -> Self {
        self.sum_insured = Some(sum_insured);
        self
    }

    pub fn written_line_premium(&self) -> f64 {
        self.cession * self.written_line * self.full_subject_premium
    }

    pub fn signed_line_premium(&self) -> f64 {
        self.cession * self.signed_line * self.full_subject_premium
    }

    /// Terms selected by the contract type
    ///
    /// Aggregate stop loss shares the excess of loss formula on occurrence terms.
    pub fn terms(&self) -> Result<LayerTerms> {
        Ok(match self.contract_type {
            ContractType::ExcessOfLoss | ContractType::AggregateStopLoss => LayerTerms::ExcessOfLoss {
                attachment: self.occurrence_attachment,
                limit: self.occurrence_limit,
            },
            ContractType::QuotaShare => LayerTerms::QuotaShare { cession: self.cession },
            ContractType::FranchiseDeductible => LayerTerms::FranchiseDeductible {
                attachment: self.occurrence_attachment,
                limit: self.occurrence_limit,
            },
            ContractType::SurplusShare => {
                let sum_insured = self.sum_insured.ok_or_else(|| {
                    PricingError::contract(
                        format!("layer {}", self.layer_id),
                        "Surplus share layer requires a sum insured",
                    )
                })?;
                LayerTerms::SurplusShare {
                    sum_insured,
                    attachment: self.occurrence_attachment,
                }
            }
        })
    }

    /// Amount of `gross` ceded to this layer
    pub fn loss_to_layer(&self, gross: f64) -> Result<f64> {
        Ok(self.terms()?.loss_to_layer(gross))
    }

    /// Claims as seen by this layer
    ///
    /// Every paid and incurred value of the capped history is passed through
    /// the layer formula. The resulting claims keep their identity and dates;
    /// their policy terms are cleared so the capped history of a layered claim
    /// is exactly the ceded amounts.
    pub fn apply_to_claims(&self, claims: &Claims) -> Result<Claims> {
        let terms = self.terms()?;
        Ok(claims
            .iter()
            .map(|claim| Self::layered_claim(claim, &terms))
            .collect())
    }

    fn layered_claim(claim: &Claim, terms: &LayerTerms) -> Claim {
        let ceded = claim.capped_history().map_values(|gross| terms.loss_to_layer(gross));
        let meta = claim.meta().clone().with_policy_terms(0.0, None, true);
        Claim::new(meta, ceded)
    }
}
