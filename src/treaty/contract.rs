//! Reinsurance contracts: metadata, FX translation and per-layer allocation

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::RILayer;
use crate::claims::{ClaimYearType, Claims};
use crate::error::{PricingError, Result};
use crate::exposures::Exposures;

/// Event that triggers cover under the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimTriggerBasis {
    LossesOccurring,
    RiskAttaching,
    ClaimsMade,
}

impl ClaimTriggerBasis {
    /// Year basis claims are attributed under for this trigger
    pub fn claim_year_basis(&self) -> ClaimYearType {
        match self {
            ClaimTriggerBasis::LossesOccurring => ClaimYearType::AccidentYear,
            ClaimTriggerBasis::RiskAttaching => ClaimYearType::UnderwritingYear,
            ClaimTriggerBasis::ClaimsMade => ClaimYearType::ReportedYear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexationClauseType {
    FullIndexation,
    Franchise,
    SevereInflation,
}

/// Contract-level terms shared by all layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RIContractMetadata {
    pub contract_id: String,
    #[serde(default)]
    pub contract_description: String,
    #[serde(default)]
    pub cedent_name: String,

    pub inception_date: NaiveDate,
    pub expiration_date: NaiveDate,

    /// Absent when the source data did not state one
    #[serde(default)]
    pub trigger_basis: Option<ClaimTriggerBasis>,

    #[serde(default)]
    pub indexation_clause: Option<IndexationClauseType>,
    #[serde(default)]
    pub indexation_margin: f64,

    /// Currency amounts are translated into
    pub base_currency: String,

    /// Units of each currency per unit of the base currency
    #[serde(default)]
    pub fx_rates: BTreeMap<String, f64>,
}

impl RIContractMetadata {
    /// Year basis implied by the trigger basis
    pub fn claim_year_basis(&self) -> Result<ClaimYearType> {
        self.trigger_basis
            .map(|basis| basis.claim_year_basis())
            .ok_or_else(|| PricingError::contract(&self.contract_id, "Trigger basis missing in data"))
    }

    /// Rate to divide `currency` amounts by; the base currency is always 1.0
    pub fn fx_rate(&self, currency: &str) -> Result<f64> {
        if currency == self.base_currency {
            return Ok(1.0);
        }
        match self.fx_rates.get(currency) {
            Some(&rate) if rate > 0.0 && rate.is_finite() => Ok(rate),
            Some(&rate) => Err(PricingError::contract(
                &self.contract_id,
                format!("FX rate for {} must be positive, got {}", currency, rate),
            )),
            None => Err(PricingError::contract(
                &self.contract_id,
                format!("No FX rate supplied for currency {}", currency),
            )),
        }
    }
}

/// A treaty: metadata plus its ordered layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RIContract {
    pub meta: RIContractMetadata,
    pub layers: Vec<RILayer>,
}

impl RIContract {
    pub fn new(meta: RIContractMetadata, layers: Vec<RILayer>) -> Self {
        Self { meta, layers }
    }

    pub fn contract_id(&self) -> &str {
        &self.meta.contract_id
    }

    pub fn layer(&self, layer_id: u32) -> Option<&RILayer> {
        self.layers.iter().find(|layer| layer.layer_id == layer_id)
    }

    pub fn layer_ids(&self) -> Vec<u32> {
        self.layers.iter().map(|layer| layer.layer_id).collect()
    }

    /// Claims in the base currency
    pub fn translate_claims(&self, claims: &Claims) -> Result<Claims> {
        let mut translated = Claims::default();
        for claim in claims {
            let rate = self.meta.fx_rate(claim.currency())?;
            let mut meta = claim.meta().clone();
            meta.currency = self.meta.base_currency.clone();
            // policy terms are in the claim's currency too
            meta.contract_deductible /= rate;
            meta.contract_limit = meta.contract_limit.map(|limit| limit / rate);
            translated.push(claim.with_meta(meta).with_history(claim.history().scaled(1.0 / rate)));
        }
        Ok(translated)
    }

    /// Exposures in the base currency
    pub fn translate_exposures(&self, exposures: &Exposures) -> Result<Exposures> {
        let mut translated = Exposures::default();
        for exposure in exposures {
            let rate = self.meta.fx_rate(exposure.currency())?;
            translated.push(
                exposure
                    .with_exposure_value(exposure.exposure_value() / rate)
                    .with_currency(self.meta.base_currency.as_str()),
            );
        }
        Ok(translated)
    }

    /// Claims re-attributed under the contract's trigger basis
    pub fn apply_trigger_basis(&self, claims: &Claims) -> Result<Claims> {
        Ok(claims.with_year_basis(self.meta.claim_year_basis()?))
    }

    /// Layered claims for every layer, keyed by layer id
    ///
    /// `claims` should already be translated and trended.
    pub fn allocate_claims(&self, claims: &Claims) -> Result<BTreeMap<u32, Claims>> {
        let mut allocated = BTreeMap::new();
        for layer in &self.layers {
            let layered = layer.apply_to_claims(claims).map_err(|err| match err {
                PricingError::Contract { message, .. } => PricingError::contract(
                    &self.meta.contract_id,
                    format!("layer {}: {}", layer.layer_id, message),
                ),
                other => other,
            })?;
            if allocated.insert(layer.layer_id, layered).is_some() {
                return Err(PricingError::contract(
                    &self.meta.contract_id,
                    format!("duplicate layer id {}", layer.layer_id),
                ));
            }
            log::debug!("Allocated {} claims to layer {}", claims.len(), layer.layer_id);
        }
        Ok(allocated)
    }
}

/// Load a contract from a JSON file
pub fn load_contract<P: AsRef<Path>>(path: P) -> anyhow::Result<RIContract> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading contract file {}", path.display()))?;
    let contract: RIContract = serde_json::from_str(&text)
        .with_context(|| format!("parsing contract file {}", path.display()))?;
    log::info!(
        "Loaded contract {} with {} layers",
        contract.meta.contract_id,
        contract.layers.len()
    );
    Ok(contract)
}
