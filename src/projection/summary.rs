//! Per-layer claims and per-year exposure totals feeding burn cost projection

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::claims::{ClaimAggregator, Claims, ClaimsAggregate};
use crate::error::Result;
use crate::exposures::{AggregateExposures, Exposures};

/// Aggregated experience for every layer of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSummary {
    /// Layer id -> modelling year -> layered claims aggregate
    pub layer_claims: BTreeMap<u32, BTreeMap<i32, ClaimsAggregate>>,
    /// Modelling year -> exposure totals
    pub exposures: BTreeMap<i32, AggregateExposures>,
    pub analysis_date: NaiveDate,
}

impl ExperienceSummary {
    /// Summarise layered claims and (trended) exposures as at `analysis_date`
    pub fn new(allocated: &BTreeMap<u32, Claims>, exposures: &Exposures, analysis_date: NaiveDate) -> Result<Self> {
        let mut layer_claims = BTreeMap::new();
        for (&layer_id, claims) in allocated {
            layer_claims.insert(layer_id, ClaimAggregator::new(claims).by_modelling_year()?);
        }

        Ok(Self {
            layer_claims,
            exposures: AggregateExposures::by_modelling_year(exposures, analysis_date),
            analysis_date,
        })
    }

    pub fn layer_ids(&self) -> Vec<u32> {
        self.layer_claims.keys().copied().collect()
    }

    pub fn claims(&self, layer_id: u32, year: i32) -> Option<&ClaimsAggregate> {
        self.layer_claims.get(&layer_id)?.get(&year)
    }

    pub fn exposure(&self, year: i32) -> Option<&AggregateExposures> {
        self.exposures.get(&year)
    }

    /// Years with both claims for `layer_id` and exposure data, ascending
    pub fn modelling_years(&self, layer_id: u32) -> Vec<i32> {
        self.layer_claims
            .get(&layer_id)
            .map(|years| {
                years
                    .keys()
                    .copied()
                    .filter(|year| self.exposures.contains_key(year))
                    .collect()
            })
            .unwrap_or_default()
    }
}
