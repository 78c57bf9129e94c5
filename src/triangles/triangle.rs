//! Origin year by development period triangles
//!
//! Cells are sparse: a cell that was never observed is absent, while an
//! observed zero is stored as zero. All derived views (incremental values,
//! link ratios, development factors) skip absent cells rather than treating
//! them as zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::curve_fitting::{fit_curve, CurveType, FitConfig, FittedCurve};
use crate::claims::Claims;
use crate::error::{PricingError, Result};

/// Which cumulative claim value a triangle is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TriangleValue {
    Paid,
    #[default]
    Incurred,
}

/// How link ratios are averaged across origin years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AverageMethod {
    /// Arithmetic mean of the individual ratios
    Simple,
    /// Sum of next-period values over sum of current-period values
    #[default]
    VolumeWeighted,
}

/// Sparse triangle of values by origin year and development period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    cells: BTreeMap<i32, BTreeMap<u32, f64>>,
    origin_years: Vec<i32>,
    dev_periods: Vec<u32>,
}

impl Triangle {
    /// Build a triangle from nested cells, rejecting non-finite values
    pub fn new(cells: BTreeMap<i32, BTreeMap<u32, f64>>) -> Result<Self> {
        for (origin_year, row) in &cells {
            if let Some((period, value)) = row.iter().find(|(_, v)| !v.is_finite()) {
                return Err(PricingError::Triangle(format!(
                    "non-finite value {} at origin year {}, development period {}",
                    value, origin_year, period
                )));
            }
        }

        let mut triangle = Self {
            cells,
            origin_years: Vec::new(),
            dev_periods: Vec::new(),
        };
        triangle.cells.retain(|_, row| !row.is_empty());
        triangle.refresh_axes();
        Ok(triangle)
    }

    /// Sum each claim's capped history into its modelling year row
    ///
    /// A development period a claim does not report leaves its cell untouched.
    pub fn from_claims(claims: &Claims, value: TriangleValue) -> Result<Self> {
        let mut cells: BTreeMap<i32, BTreeMap<u32, f64>> = BTreeMap::new();

        for claim in claims {
            let origin_year = claim.modelling_year()?;
            let history = claim.capped_history();
            let values = match value {
                TriangleValue::Paid => history.cumulative_paid(),
                TriangleValue::Incurred => history.cumulative_incurred(),
            };

            let row = cells.entry(origin_year).or_default();
            for (&period, &amount) in history.development_periods().iter().zip(values) {
                *row.entry(period).or_insert(0.0) += amount;
            }
        }

        Self::new(cells)
    }

    fn refresh_axes(&mut self) {
        self.origin_years = self.cells.keys().copied().collect();
        let mut periods: Vec<u32> = self.cells.values().flat_map(|row| row.keys().copied()).collect();
        periods.sort_unstable();
        periods.dedup();
        self.dev_periods = periods;
    }

    pub fn origin_years(&self) -> &[i32] {
        &self.origin_years
    }

    pub fn dev_periods(&self) -> &[u32] {
        &self.dev_periods
    }

    pub fn cells(&self) -> &BTreeMap<i32, BTreeMap<u32, f64>> {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, origin_year: i32, dev_period: u32) -> Option<f64> {
        self.cells.get(&origin_year)?.get(&dev_period).copied()
    }

    pub fn row(&self, origin_year: i32) -> Option<&BTreeMap<u32, f64>> {
        self.cells.get(&origin_year)
    }

    /// Set a single cell during population
    pub fn set(&mut self, origin_year: i32, dev_period: u32, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(PricingError::Triangle(format!(
                "non-finite value {} at origin year {}, development period {}",
                value, origin_year, dev_period
            )));
        }
        self.cells.entry(origin_year).or_default().insert(dev_period, value);
        self.refresh_axes();
        Ok(())
    }

    /// Latest observed period and value for each origin year
    pub fn latest_diagonal(&self) -> BTreeMap<i32, (u32, f64)> {
        self.cells
            .iter()
            .filter_map(|(&oy, row)| row.iter().next_back().map(|(&d, &v)| (oy, (d, v))))
            .collect()
    }

    /// Row-wise differences between consecutive present cells
    pub fn to_incremental(&self) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|(&oy, row)| {
                let mut prior = 0.0;
                let incremental: BTreeMap<u32, f64> = row
                    .iter()
                    .map(|(&d, &v)| {
                        let step = v - prior;
                        prior = v;
                        (d, step)
                    })
                    .collect();
                (oy, incremental)
            })
            .collect();

        Self {
            cells,
            origin_years: self.origin_years.clone(),
            dev_periods: self.dev_periods.clone(),
        }
    }

    /// Row-wise running totals over present cells
    pub fn to_cumulative(&self) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|(&oy, row)| {
                let mut total = 0.0;
                let cumulative: BTreeMap<u32, f64> = row
                    .iter()
                    .map(|(&d, &v)| {
                        total += v;
                        (d, total)
                    })
                    .collect();
                (oy, cumulative)
            })
            .collect();

        Self {
            cells,
            origin_years: self.origin_years.clone(),
            dev_periods: self.dev_periods.clone(),
        }
    }

    /// Consecutive development period pairs `(d, next(d))`
    fn steps(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.dev_periods.windows(2).map(|w| (w[0], w[1]))
    }

    /// Link ratios keyed by origin year and the period each step starts from
    ///
    /// Defined only where both cells are present and the earlier one is non-zero.
    pub fn age_to_age_factors(&self) -> BTreeMap<i32, BTreeMap<u32, f64>> {
        let mut factors = BTreeMap::new();
        for &oy in &self.origin_years {
            let row: BTreeMap<u32, f64> = self
                .steps()
                .filter_map(|(d, next)| {
                    let current = self.get(oy, d)?;
                    let following = self.get(oy, next)?;
                    (current != 0.0).then(|| (d, following / current))
                })
                .collect();
            if !row.is_empty() {
                factors.insert(oy, row);
            }
        }
        factors
    }

    /// Link ratios averaged across origin years, keyed by starting period
    pub fn average_age_to_age_factors(&self, method: AverageMethod) -> BTreeMap<u32, f64> {
        let mut averages = BTreeMap::new();

        for (d, next) in self.steps() {
            let pairs: Vec<(f64, f64)> = self
                .origin_years
                .iter()
                .filter_map(|&oy| Some((self.get(oy, d)?, self.get(oy, next)?)))
                .collect();

            let average = match method {
                AverageMethod::Simple => {
                    let ratios: Vec<f64> = pairs
                        .iter()
                        .filter(|(current, _)| *current != 0.0)
                        .map(|(current, following)| following / current)
                        .collect();
                    (!ratios.is_empty()).then(|| ratios.iter().sum::<f64>() / ratios.len() as f64)
                }
                AverageMethod::VolumeWeighted => {
                    let current: f64 = pairs.iter().map(|(c, _)| c).sum();
                    let following: f64 = pairs.iter().map(|(_, f)| f).sum();
                    (current != 0.0).then(|| following / current)
                }
            };

            match average {
                Some(factor) => {
                    averages.insert(d, factor);
                }
                None => log::debug!("No defined link ratio from development period {}", d),
            }
        }

        averages
    }

    /// Factor to ultimate from each development period
    ///
    /// The product of the selected link ratios from `d` onward; the last
    /// observed period develops no further and gets 1.0.
    pub fn cumulative_development_factors(&self, selected: &BTreeMap<u32, f64>) -> BTreeMap<u32, f64> {
        let mut cdfs = BTreeMap::new();
        let mut running = 1.0;
        for &d in self.dev_periods.iter().rev() {
            if let Some(factor) = selected.get(&d) {
                running *= factor;
            }
            cdfs.insert(d, running);
        }
        cdfs
    }

    /// Factor to ultimate for each origin year from its latest observed period
    pub fn development_factors_by_origin(&self, selected: &BTreeMap<u32, f64>) -> BTreeMap<i32, f64> {
        let cdfs = self.cumulative_development_factors(selected);
        self.latest_diagonal()
            .into_iter()
            .map(|(oy, (d, _))| (oy, cdfs.get(&d).copied().unwrap_or(1.0)))
            .collect()
    }

    /// Fit a development curve to the averaged link ratios
    pub fn fit_curve(&self, curve_type: CurveType, config: &FitConfig) -> Result<FittedCurve> {
        let averages = self.average_age_to_age_factors(config.average_method);
        fit_curve(curve_type, &averages, config)
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Empty Triangle");
        }

        write!(f, "{:<12}", "Origin Year")?;
        for d in &self.dev_periods {
            write!(f, "{:>14}", d)?;
        }
        writeln!(f)?;

        for &oy in &self.origin_years {
            write!(f, "{:<12}", oy)?;
            for &d in &self.dev_periods {
                match self.get(oy, d) {
                    Some(v) => write!(f, "{:>14.2}", v)?,
                    None => write!(f, "{:>14}", "")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
