//! Experience rating pipeline for one contract
//!
//! Raw claims and exposures are translated into the contract's base
//! currency, re-attributed to modelling years under the contract's trigger
//! basis, trended to the base year and only then allocated to layers. The
//! resulting per-layer claims feed triangles, IBNER extraction and burn cost
//! models.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::claims::Claims;
use crate::error::{PricingError, Result};
use crate::exposures::Exposures;
use crate::projection::{BurnCostModel, ExperienceSummary, ModellingAssumptions};
use crate::treaty::RIContract;
use crate::trending::Trending;
use crate::triangles::{AverageMethod, IbnerPatternExtractor, Triangle, TriangleValue};

/// Allocated and summarised experience for a contract
#[derive(Debug, Clone)]
pub struct ExperienceModel {
    contract: RIContract,
    trending: Trending,
    allocated: BTreeMap<u32, Claims>,
    exposures: Exposures,
    summary: ExperienceSummary,
}

impl ExperienceModel {
    /// Run the pipeline as at `analysis_date`
    pub fn new(
        contract: RIContract,
        claims: &Claims,
        exposures: &Exposures,
        trending: Trending,
        analysis_date: NaiveDate,
    ) -> Result<Self> {
        let claims = contract.translate_claims(claims)?;
        let exposures = contract.translate_exposures(exposures)?;
        log::info!(
            "Translated {} claims and {} exposures into {}",
            claims.len(),
            exposures.len(),
            contract.meta.base_currency
        );

        // modelling years must follow the trigger basis before trending reads them
        let claims = contract.apply_trigger_basis(&claims)?;
        let claims = trending.trend_claims(&claims)?;
        let exposures = trending.trend_exposures(&exposures)?;
        log::info!("Trended claims and exposures to {}", trending.base_year);

        let allocated = contract.allocate_claims(&claims)?;
        let summary = ExperienceSummary::new(&allocated, &exposures, analysis_date)?;
        log::info!(
            "Allocated experience to {} layers of contract {}",
            allocated.len(),
            contract.contract_id()
        );

        Ok(Self {
            contract,
            trending,
            allocated,
            exposures,
            summary,
        })
    }

    pub fn contract(&self) -> &RIContract {
        &self.contract
    }

    pub fn trending(&self) -> &Trending {
        &self.trending
    }

    pub fn summary(&self) -> &ExperienceSummary {
        &self.summary
    }

    /// Translated and trended exposures
    pub fn exposures(&self) -> &Exposures {
        &self.exposures
    }

    pub fn layer_ids(&self) -> Vec<u32> {
        self.allocated.keys().copied().collect()
    }

    /// Layered claims for `layer_id`
    pub fn layer_claims(&self, layer_id: u32) -> Result<&Claims> {
        self.allocated.get(&layer_id).ok_or_else(|| {
            PricingError::contract(self.contract.contract_id(), format!("no layer with id {}", layer_id))
        })
    }

    pub fn triangle(&self, layer_id: u32, value: TriangleValue) -> Result<Triangle> {
        Triangle::from_claims(self.layer_claims(layer_id)?, value)
    }

    /// Claim-level IBNER decomposition for a layer
    pub fn ibner(&self, layer_id: u32) -> Result<IbnerPatternExtractor> {
        IbnerPatternExtractor::from_claims(self.layer_claims(layer_id)?)
    }

    /// Burn cost model with every year on the default selection
    pub fn burn_cost_model(&self, layer_id: u32, assumptions: ModellingAssumptions) -> BurnCostModel<'_> {
        BurnCostModel::new(&self.summary, layer_id, assumptions)
    }

    /// Burn cost model with development factors taken from the layer's triangle
    pub fn developed_burn_cost_model(
        &self,
        layer_id: u32,
        assumptions: ModellingAssumptions,
        value: TriangleValue,
        average_method: AverageMethod,
    ) -> Result<BurnCostModel<'_>> {
        let triangle = self.triangle(layer_id, value)?;
        let selected = triangle.average_age_to_age_factors(average_method);
        let mut model = self.burn_cost_model(layer_id, assumptions);
        model.set_development_factors(&triangle.development_factors_by_origin(&selected));
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Claim, ClaimDevelopmentHistory, ClaimsMetaData};
    use crate::exposures::{Exposure, ExposureBasis, ExposureMetaData, ExposureValues};
    use crate::projection::ProjectionMethod;
    use crate::treaty::{ClaimTriggerBasis, ContractType, RIContractMetadata, RILayer};
    use crate::trending::YearlyFactors;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(trigger_basis: Option<ClaimTriggerBasis>) -> RIContract {
        RIContract::new(
            RIContractMetadata {
                contract_id: "CNT001".into(),
                contract_description: "Casualty XoL".into(),
                cedent_name: "Cedent".into(),
                inception_date: date(2024, 1, 1),
                expiration_date: date(2024, 12, 31),
                trigger_basis,
                indexation_clause: None,
                indexation_margin: 0.0,
                base_currency: "USD".into(),
                fx_rates: [("EUR".to_string(), 0.5)].into_iter().collect(),
            },
            vec![
                RILayer::new(1, "100 xs 100", ContractType::ExcessOfLoss, 100.0, 100.0),
                RILayer::new(2, "Unlimited xs 0", ContractType::ExcessOfLoss, 0.0, f64::INFINITY),
            ],
        )
    }

    fn claim(id: &str, currency: &str, loss_year: i32, incurred: [f64; 3]) -> Claim {
        let periods = if loss_year == 2020 { vec![1, 2, 3] } else { vec![1, 2] };
        let n = periods.len();
        Claim::new(
            ClaimsMetaData::new(id, currency).with_dates(Some(date(loss_year, 4, 1)), Some(date(loss_year, 1, 1)), None),
            ClaimDevelopmentHistory::new(id, periods, vec![0.0; n], incurred[..n].to_vec()).unwrap(),
        )
    }

    fn claims() -> Claims {
        Claims::new(vec![
            claim("A", "USD", 2020, [120.0, 180.0, 240.0]),
            // 60, 75 in EUR -> 120, 150 USD
            claim("B", "EUR", 2021, [60.0, 75.0, 0.0]),
        ])
    }

    fn exposures() -> Exposures {
        [2020, 2021]
            .into_iter()
            .map(|year| {
                Exposure::new(
                    ExposureMetaData {
                        exposure_id: format!("E{}", year),
                        exposure_name: format!("Book {}", year),
                        period_start: date(year, 1, 1),
                        period_end: date(year, 12, 31),
                        currency: "USD".into(),
                        line_of_business: None,
                        basis: ExposureBasis::Earned,
                    },
                    ExposureValues { exposure_value: 1000.0, attachment_point: 0.0, limit: f64::INFINITY },
                )
                .unwrap()
            })
            .collect()
    }

    fn trending() -> Trending {
        let claim_factors: YearlyFactors = [(2020, 1.0), (2021, 1.0)].into_iter().collect();
        Trending::new(claim_factors, YearlyFactors::new(), 2021)
    }

    fn model() -> ExperienceModel {
        ExperienceModel::new(
            contract(Some(ClaimTriggerBasis::LossesOccurring)),
            &claims(),
            &exposures(),
            trending(),
            date(2024, 1, 1),
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_allocates_translated_claims() {
        let model = model();
        assert_eq!(model.layer_ids(), vec![1, 2]);

        let layer1 = model.triangle(1, TriangleValue::Incurred).unwrap();
        assert_eq!(layer1.get(2020, 1), Some(20.0));
        assert_eq!(layer1.get(2020, 3), Some(100.0));
        assert_eq!(layer1.get(2021, 2), Some(50.0));

        let ground_up = model.triangle(2, TriangleValue::Incurred).unwrap();
        assert_eq!(ground_up.get(2021, 1), Some(120.0));
    }

    #[test]
    fn test_pipeline_summary_and_burn_cost() {
        let model = model();
        let summary = model.summary();
        assert_relative_eq!(summary.claims(1, 2020).unwrap().latest_incurred, 100.0);
        assert_relative_eq!(summary.exposure(2021).unwrap().earned, 1000.0);

        let assumptions = ModellingAssumptions {
            method: ProjectionMethod::ChainLadder,
            ..ModellingAssumptions::default()
        };
        let burn_cost = model.burn_cost_model(2, assumptions).calculate_burn_cost();
        assert_relative_eq!(burn_cost[&2020], 0.24);
        assert_relative_eq!(burn_cost[&2021], 0.15);
    }

    #[test]
    fn test_developed_burn_cost_uses_triangle_factors() {
        let model = model();
        let assumptions = ModellingAssumptions {
            method: ProjectionMethod::ChainLadder,
            ..ModellingAssumptions::default()
        };
        let burn_model = model
            .developed_burn_cost_model(2, assumptions, TriangleValue::Incurred, AverageMethod::VolumeWeighted)
            .unwrap();

        // 2021 is at period 2; the only 2 -> 3 link ratio is 240 / 180
        assert_relative_eq!(burn_model.selection(2021).development_factor, 240.0 / 180.0);
        assert_relative_eq!(burn_model.selection(2020).development_factor, 1.0);
        let ultimates = burn_model.calculate_ultimates();
        assert_relative_eq!(ultimates[&2021], 150.0 * 240.0 / 180.0);
    }

    #[test]
    fn test_pipeline_ibner() {
        let extractor = model().ibner(2).unwrap();
        let pattern = extractor.ibner_pattern();
        // decreases: 2020 at 2: -60, 2021 at 2: -30
        assert_relative_eq!(pattern[&2].unwrap(), -45.0);
        assert_relative_eq!(pattern[&3].unwrap(), -60.0);
    }

    #[test]
    fn test_trigger_basis_required() {
        let result = ExperienceModel::new(contract(None), &claims(), &exposures(), trending(), date(2024, 1, 1));
        match result {
            Err(err) => assert_eq!(err.to_string(), "contract CNT001: Trigger basis missing in data"),
            Ok(_) => panic!("expected missing trigger basis to fail"),
        }
    }

    #[test]
    fn test_unknown_layer() {
        assert!(model().triangle(9, TriangleValue::Paid).is_err());
    }
}
