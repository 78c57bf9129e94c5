//! Trending of claims and exposures to a common base year
//!
//! Yearly factors are multiplicative: the factor for year `y` carries a value
//! from `y` to `y + 1`. Bringing an older origin year up to the base year
//! multiplies the factors for `[origin, base)`; forward-dated data is
//! de-trended by dividing by the factors for `[base, origin)`.
//!
//! Trending produces new collections and never touches its inputs. It must run
//! before layer allocation, since layer terms are not linear in the loss.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::claims::Claims;
use crate::error::{PricingError, Result};
use crate::exposures::Exposures;

/// Yearly multiplicative trend factors keyed by calendar year
pub type YearlyFactors = BTreeMap<i32, f64>;

/// How years absent from a factor table are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendLookup {
    /// Missing years contribute a factor of 1.0
    #[default]
    Lenient,
    /// Missing years are an error
    Strict,
}

fn yearly_factor(year: i32, yearly_factors: &YearlyFactors, lookup: TrendLookup) -> Result<f64> {
    match (yearly_factors.get(&year), lookup) {
        (Some(&factor), _) => Ok(factor),
        (None, TrendLookup::Lenient) => Ok(1.0),
        (None, TrendLookup::Strict) => Err(PricingError::MissingTrendFactor { year }),
    }
}

/// Scalar bringing a value from `origin_year` to `base_year`
pub fn trend_factor(
    origin_year: i32,
    base_year: i32,
    yearly_factors: &YearlyFactors,
    lookup: TrendLookup,
) -> Result<f64> {
    if origin_year <= base_year {
        (origin_year..base_year).try_fold(1.0, |acc, year| {
            Ok::<f64, PricingError>(acc * yearly_factor(year, yearly_factors, lookup)?)
        })
    } else {
        let forward = (base_year..origin_year).try_fold(1.0, |acc, year| {
            Ok::<f64, PricingError>(acc * yearly_factor(year, yearly_factors, lookup)?)
        })?;
        Ok(1.0 / forward)
    }
}

/// Trend factor tables and the base year they trend to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trending {
    pub claim_factors: YearlyFactors,
    pub exposure_factors: YearlyFactors,
    pub base_year: i32,
    #[serde(default)]
    pub lookup: TrendLookup,
}

impl Trending {
    pub fn new(claim_factors: YearlyFactors, exposure_factors: YearlyFactors, base_year: i32) -> Self {
        Self {
            claim_factors,
            exposure_factors,
            base_year,
            lookup: TrendLookup::Lenient,
        }
    }

    pub fn with_lookup(mut self, lookup: TrendLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn claim_trend_factor(&self, origin_year: i32) -> Result<f64> {
        trend_factor(origin_year, self.base_year, &self.claim_factors, self.lookup)
    }

    pub fn exposure_trend_factor(&self, origin_year: i32) -> Result<f64> {
        trend_factor(origin_year, self.base_year, &self.exposure_factors, self.lookup)
    }

    /// Scale each claim's history by the factor for its modelling year
    pub fn trend_claims(&self, claims: &Claims) -> Result<Claims> {
        claims.map_histories(|claim| {
            let factor = self.claim_trend_factor(claim.modelling_year()?)?;
            Ok(claim.history().scaled(factor))
        })
    }

    /// Scale each exposure value by the factor for its modelling year
    pub fn trend_exposures(&self, exposures: &Exposures) -> Result<Exposures> {
        exposures.map_values(|exposure| {
            let factor = self.exposure_trend_factor(exposure.modelling_year())?;
            Ok(exposure.exposure_value() * factor)
        })
    }
}

/// Raw CSV row of the trend factor file
#[derive(Debug, Deserialize)]
struct TrendRow {
    year: i32,
    claim_factor: f64,
    exposure_factor: f64,
}

/// Load claim and exposure factor tables from a `year,claim_factor,exposure_factor` CSV
pub fn load_trend_factors<P: AsRef<Path>>(path: P) -> anyhow::Result<(YearlyFactors, YearlyFactors)> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening trend factor file {}", path.display()))?;

    let mut claim_factors = YearlyFactors::new();
    let mut exposure_factors = YearlyFactors::new();
    for result in reader.deserialize() {
        let row: TrendRow = result.context("parsing trend factor row")?;
        claim_factors.insert(row.year, row.claim_factor);
        exposure_factors.insert(row.year, row.exposure_factor);
    }

    Ok((claim_factors, exposure_factors))
}
