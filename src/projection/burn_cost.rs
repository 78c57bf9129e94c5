//! Burn cost projection by modelling year
//!
//! Each modelling year carries its own selection of method, development
//! factor, a priori loss ratio, trend factor and weighting. A year whose
//! selected method cannot produce an ultimate is projected by chain ladder
//! with the same development factor instead. Results are recomputed on every
//! call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::methods::{bornhuetter_ferguson, cape_cod_prior, chainladder, CapeCodYear, ProjectionMethod};
use super::summary::ExperienceSummary;
use crate::error::{PricingError, Result};

/// Defaults applied to every modelling year without an explicit selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModellingAssumptions {
    /// Decay rate of the generalised Cape Cod year weights
    pub cape_cod_decay: f64,
    pub weighting: f64,
    pub method: ProjectionMethod,
    pub development_factor: f64,
    pub a_priori: f64,
    pub trend_factor: f64,
}

impl Default for ModellingAssumptions {
    fn default() -> Self {
        Self {
            cape_cod_decay: 0.1,
            weighting: 1.0,
            method: ProjectionMethod::CapeCod,
            development_factor: 1.0,
            a_priori: 0.0,
            trend_factor: 1.0,
        }
    }
}

/// Projection choices for one modelling year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearSelection {
    pub weighting: f64,
    pub method: ProjectionMethod,
    pub development_factor: f64,
    pub a_priori: f64,
    pub trend_factor: f64,
}

impl YearSelection {
    pub fn from_assumptions(assumptions: &ModellingAssumptions) -> Self {
        Self {
            weighting: assumptions.weighting,
            method: assumptions.method,
            development_factor: assumptions.development_factor,
            a_priori: assumptions.a_priori,
            trend_factor: assumptions.trend_factor,
        }
    }
}

impl Default for YearSelection {
    fn default() -> Self {
        Self::from_assumptions(&ModellingAssumptions::default())
    }
}

/// Burn cost model for one layer
#[derive(Debug, Clone)]
pub struct BurnCostModel<'a> {
    summary: &'a ExperienceSummary,
    layer_id: u32,
    assumptions: ModellingAssumptions,
    selections: BTreeMap<i32, YearSelection>,
}

impl<'a> BurnCostModel<'a> {
    pub fn new(summary: &'a ExperienceSummary, layer_id: u32, assumptions: ModellingAssumptions) -> Self {
        Self {
            summary,
            layer_id,
            assumptions,
            selections: BTreeMap::new(),
        }
    }

    pub fn layer_id(&self) -> u32 {
        self.layer_id
    }

    pub fn assumptions(&self) -> &ModellingAssumptions {
        &self.assumptions
    }

    /// Years with both layered claims and exposure
    pub fn modelling_years(&self) -> Vec<i32> {
        self.summary.modelling_years(self.layer_id)
    }

    /// Selection in force for `year`
    pub fn selection(&self, year: i32) -> YearSelection {
        self.selections
            .get(&year)
            .copied()
            .unwrap_or_else(|| YearSelection::from_assumptions(&self.assumptions))
    }

    /// Selection for `year`, created from the defaults if absent
    pub fn selection_mut(&mut self, year: i32) -> &mut YearSelection {
        let defaults = YearSelection::from_assumptions(&self.assumptions);
        self.selections.entry(year).or_insert(defaults)
    }

    pub fn set_selection(&mut self, year: i32, selection: YearSelection) {
        self.selections.insert(year, selection);
    }

    /// Apply the same method to every year
    pub fn set_method(&mut self, method: ProjectionMethod) {
        for year in self.modelling_years() {
            self.selection_mut(year).method = method;
        }
    }

    /// Development factors to ultimate by year, e.g. from a triangle
    pub fn set_development_factors(&mut self, factors: &BTreeMap<i32, f64>) {
        for (&year, &factor) in factors {
            self.selection_mut(year).development_factor = factor;
        }
    }

    fn latest_incurred(&self, year: i32) -> f64 {
        self.summary
            .claims(self.layer_id, year)
            .map_or(0.0, |aggregate| aggregate.latest_incurred)
    }

    fn earned_exposure(&self, year: i32) -> f64 {
        self.summary.exposure(year).map_or(0.0, |exposure| exposure.earned)
    }

    /// Cape Cod prior for `target_year`, decay-weighted when `generalised`
    pub fn cape_cod_prior(&self, target_year: i32, generalised: bool) -> Result<f64> {
        let years: Vec<CapeCodYear> = self
            .modelling_years()
            .into_iter()
            .map(|year| {
                let selection = self.selection(year);
                CapeCodYear {
                    year,
                    latest_incurred: self.latest_incurred(year),
                    exposure: self.earned_exposure(year),
                    development_factor: selection.development_factor,
                    trend_factor: selection.trend_factor,
                    weighting: selection.weighting,
                }
            })
            .collect();

        let decay = generalised.then_some(self.assumptions.cape_cod_decay);
        cape_cod_prior(&years, target_year, decay, self.layer_id)
    }

    /// Ultimate for `year` under its selected method, without fallback
    pub fn project_year(&self, year: i32) -> Result<f64> {
        let selection = self.selection(year);
        let latest = self.latest_incurred(year);
        let exposure = self.earned_exposure(year);

        let a_priori = match selection.method {
            ProjectionMethod::ChainLadder => return Ok(chainladder(latest, selection.development_factor)),
            ProjectionMethod::BornhuetterFerguson => selection.a_priori,
            ProjectionMethod::CapeCod => self.cape_cod_prior(year, false)?,
            ProjectionMethod::GeneralisedCapeCod => self.cape_cod_prior(year, true)?,
        };

        if selection.development_factor <= 0.0 {
            return Err(PricingError::Projection {
                method: selection.method.name(),
                year,
                reason: format!("development factor {} is not positive", selection.development_factor),
            });
        }
        Ok(bornhuetter_ferguson(latest, exposure, selection.development_factor, a_priori))
    }

    /// Ultimate for every modelling year
    pub fn calculate_ultimates(&self) -> BTreeMap<i32, f64> {
        self.modelling_years()
            .into_iter()
            .map(|year| {
                let ultimate = self.project_year(year).unwrap_or_else(|err| {
                    let selection = self.selection(year);
                    log::warn!(
                        "Layer {} year {}: {} failed ({}), using chain ladder",
                        self.layer_id,
                        year,
                        selection.method,
                        err
                    );
                    chainladder(self.latest_incurred(year), selection.development_factor)
                });
                (year, ultimate)
            })
            .collect()
    }

    /// Ultimate over earned exposure; years with no earned exposure are left out
    pub fn calculate_burn_cost(&self) -> BTreeMap<i32, f64> {
        self.calculate_ultimates()
            .into_iter()
            .filter_map(|(year, ultimate)| {
                let exposure = self.earned_exposure(year);
                if exposure == 0.0 {
                    log::debug!("Layer {} year {}: no earned exposure, burn cost omitted", self.layer_id, year);
                    return None;
                }
                Some((year, ultimate / exposure))
            })
            .collect()
    }

    /// Weighted mean burn cost, None when the weights sum to zero
    pub fn weighted_burn_cost(&self) -> Option<f64> {
        let (weighted, total_weight) = self
            .calculate_burn_cost()
            .into_iter()
            .fold((0.0, 0.0), |(sum, weights), (year, burn_cost)| {
                let weight = self.selection(year).weighting;
                (sum + weight * burn_cost, weights + weight)
            });
        (total_weight != 0.0).then(|| weighted / total_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Claim, ClaimDevelopmentHistory, Claims, ClaimsMetaData};
    use crate::exposures::{Exposure, ExposureBasis, ExposureMetaData, ExposureValues, Exposures};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn claim(id: &str, year: i32, incurred: f64) -> Claim {
        Claim::new(
            ClaimsMetaData::new(id, "USD").with_dates(Some(date(year, 6, 1)), None, None),
            ClaimDevelopmentHistory::new(id, vec![12], vec![incurred / 2.0], vec![incurred]).unwrap(),
        )
    }

    fn exposure(id: &str, year: i32, value: f64) -> Exposure {
        Exposure::new(
            ExposureMetaData {
                exposure_id: id.into(),
                exposure_name: id.into(),
                period_start: date(year, 1, 1),
                period_end: date(year, 12, 31),
                currency: "USD".into(),
                line_of_business: None,
                basis: ExposureBasis::Earned,
            },
            ExposureValues { exposure_value: value, attachment_point: 0.0, limit: f64::INFINITY },
        )
        .unwrap()
    }

    fn summary() -> ExperienceSummary {
        let claims = Claims::new(vec![
            claim("A", 2020, 500.0),
            claim("B", 2021, 300.0),
            claim("C", 2022, 100.0),
            claim("D", 2023, 50.0),
        ]);
        let allocated: BTreeMap<u32, Claims> = [(1, claims)].into_iter().collect();
        let exposures = Exposures::new(vec![
            exposure("E20", 2020, 1000.0),
            exposure("E21", 2021, 1000.0),
            exposure("E22", 2022, 0.0),
        ]);
        ExperienceSummary::new(&allocated, &exposures, date(2024, 1, 1)).unwrap()
    }

    fn chain_ladder_model(summary: &ExperienceSummary) -> BurnCostModel<'_> {
        let assumptions = ModellingAssumptions {
            method: ProjectionMethod::ChainLadder,
            ..ModellingAssumptions::default()
        };
        BurnCostModel::new(summary, 1, assumptions)
    }

    #[test]
    fn test_defaults() {
        let selection = YearSelection::default();
        assert_eq!(selection.weighting, 1.0);
        assert_eq!(selection.method, ProjectionMethod::CapeCod);
        assert_eq!(selection.development_factor, 1.0);
        assert_eq!(selection.a_priori, 0.0);
        assert_eq!(ModellingAssumptions::default().cape_cod_decay, 0.1);
    }

    #[test]
    fn test_years_without_exposure_data_are_not_modelled() {
        let summary = summary();
        let model = chain_ladder_model(&summary);
        assert_eq!(model.modelling_years(), vec![2020, 2021, 2022]);
    }

    #[test]
    fn test_chain_ladder_burn_cost_skips_zero_exposure() {
        let summary = summary();
        let mut model = chain_ladder_model(&summary);
        model.selection_mut(2021).development_factor = 2.0;

        let ultimates = model.calculate_ultimates();
        assert_relative_eq!(ultimates[&2021], 600.0);
        assert_relative_eq!(ultimates[&2022], 100.0);

        let burn_cost = model.calculate_burn_cost();
        assert_relative_eq!(burn_cost[&2020], 0.5);
        assert_relative_eq!(burn_cost[&2021], 0.6);
        assert!(!burn_cost.contains_key(&2022));
    }

    #[test]
    fn test_bornhuetter_ferguson_year() {
        let summary = summary();
        let mut model = chain_ladder_model(&summary);
        model.set_selection(
            2021,
            YearSelection {
                method: ProjectionMethod::BornhuetterFerguson,
                development_factor: 2.0,
                a_priori: 0.5,
                ..YearSelection::default()
            },
        );
        // 300 + 0.5 * 0.5 * 1000
        assert_relative_eq!(model.project_year(2021).unwrap(), 550.0);
    }

    #[test]
    fn test_cape_cod_uses_data_prior() {
        let summary = summary();
        let model = BurnCostModel::new(&summary, 1, ModellingAssumptions::default());
        // dev 1.0 everywhere: prior = (0.5 + 0.3) / 2000 (2022 has no exposure)
        let prior = model.cape_cod_prior(2021, false).unwrap();
        assert_relative_eq!(prior, 0.8 / 2000.0);
        // fully developed, so BF adds nothing to the latest incurred
        assert_relative_eq!(model.project_year(2021).unwrap(), 300.0);
    }

    #[test]
    fn test_failed_method_falls_back_to_chain_ladder() {
        let summary = summary();
        let mut model = chain_ladder_model(&summary);
        model.set_selection(
            2020,
            YearSelection {
                method: ProjectionMethod::BornhuetterFerguson,
                development_factor: 0.0,
                a_priori: 0.5,
                ..YearSelection::default()
            },
        );
        assert!(matches!(model.project_year(2020), Err(PricingError::Projection { year: 2020, .. })));
        assert_eq!(model.calculate_ultimates()[&2020], 0.0);
    }

    #[test]
    fn test_zero_pseudo_exposure_falls_back() {
        let claims = Claims::new(vec![claim("A", 2020, 500.0)]);
        let allocated: BTreeMap<u32, Claims> = [(3, claims)].into_iter().collect();
        let exposures = Exposures::new(vec![exposure("E20", 2020, 0.0)]);
        let summary = ExperienceSummary::new(&allocated, &exposures, date(2024, 1, 1)).unwrap();

        let model = BurnCostModel::new(&summary, 3, ModellingAssumptions::default());
        assert_eq!(model.project_year(2020), Err(PricingError::ZeroPseudoExposure { layer_id: 3 }));
        assert_relative_eq!(model.calculate_ultimates()[&2020], 500.0);
        assert!(model.calculate_burn_cost().is_empty());
    }

    #[test]
    fn test_weighted_burn_cost() {
        let summary = summary();
        let mut model = chain_ladder_model(&summary);
        model.selection_mut(2020).weighting = 3.0;
        // (3 * 0.5 + 1 * 0.3) / 4
        assert_relative_eq!(model.weighted_burn_cost().unwrap(), 1.8 / 4.0);

        model.selection_mut(2020).weighting = 0.0;
        model.selection_mut(2021).weighting = 0.0;
        assert_eq!(model.weighted_burn_cost(), None);
    }

    #[test]
    fn test_unknown_layer_has_no_results() {
        let summary = summary();
        let model = BurnCostModel::new(&summary, 99, ModellingAssumptions::default());
        assert!(model.calculate_burn_cost().is_empty());
        assert_eq!(model.weighted_burn_cost(), None);
    }

    #[test]
    fn test_results_recomputed_after_selection_change() {
        let summary = summary();
        let mut model = chain_ladder_model(&summary);
        let before = model.calculate_burn_cost()[&2020];
        model.selection_mut(2020).development_factor = 1.5;
        let after = model.calculate_burn_cost()[&2020];
        assert_relative_eq!(after, before * 1.5);
    }
}
