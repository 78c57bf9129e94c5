//! Ultimate loss projection methods

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Method used to project a modelling year to ultimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectionMethod {
    ChainLadder,
    BornhuetterFerguson,
    #[default]
    CapeCod,
    GeneralisedCapeCod,
}

impl ProjectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ProjectionMethod::ChainLadder => "Chain Ladder",
            ProjectionMethod::BornhuetterFerguson => "Bornhuetter-Ferguson",
            ProjectionMethod::CapeCod => "Cape Cod",
            ProjectionMethod::GeneralisedCapeCod => "Generalised Cape Cod",
        }
    }
}

impl fmt::Display for ProjectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "chainladder" | "cl" => Ok(ProjectionMethod::ChainLadder),
            "bornhuetterferguson" | "bf" => Ok(ProjectionMethod::BornhuetterFerguson),
            "capecod" | "cc" => Ok(ProjectionMethod::CapeCod),
            "generalisedcapecod" | "generalizedcapecod" | "gcc" => Ok(ProjectionMethod::GeneralisedCapeCod),
            _ => Err(format!("unknown projection method: {}", s)),
        }
    }
}

/// Latest incurred developed to ultimate
pub fn chainladder(latest_incurred: f64, development_factor: f64) -> f64 {
    latest_incurred * development_factor
}

/// Latest incurred plus the a priori expectation for the unreported share
///
/// `development_factor` must be positive.
pub fn bornhuetter_ferguson(latest_incurred: f64, exposure: f64, development_factor: f64, a_priori: f64) -> f64 {
    latest_incurred + (1.0 - 1.0 / development_factor) * a_priori * exposure
}

/// One modelling year's contribution to a Cape Cod prior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapeCodYear {
    pub year: i32,
    pub latest_incurred: f64,
    pub exposure: f64,
    pub development_factor: f64,
    pub trend_factor: f64,
    pub weighting: f64,
}

/// A priori loss ratio implied by the data across all years
///
/// `Σ w (trend · loss · dev / exposure) / Σ w (exposure / dev)`. With a
/// `decay`, each year's weight is further multiplied by
/// `exp(-decay · |year - target_year|)`. Years with no exposure or a
/// non-positive development factor contribute nothing.
pub fn cape_cod_prior(years: &[CapeCodYear], target_year: i32, decay: Option<f64>, layer_id: u32) -> Result<f64> {
    let mut numerator = 0.0;
    let mut pseudo_exposure = 0.0;

    for y in years {
        if y.exposure == 0.0 || y.development_factor <= 0.0 {
            log::debug!("Cape Cod prior skips {} for layer {}", y.year, layer_id);
            continue;
        }
        let decay_weight = decay.map_or(1.0, |d| (-d * (y.year - target_year).abs() as f64).exp());
        let weight = y.weighting * decay_weight;

        numerator += weight * y.trend_factor * y.latest_incurred * y.development_factor / y.exposure;
        pseudo_exposure += weight * y.exposure / y.development_factor;
    }

    if pseudo_exposure == 0.0 {
        return Err(PricingError::ZeroPseudoExposure { layer_id });
    }
    Ok(numerator / pseudo_exposure)
}
