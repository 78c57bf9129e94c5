//! IBNER pattern extraction
//!
//! Splits cumulative incurred development into N (incurred on newly reported
//! claims) and D (development on claims already reported), following
//! Schnieper, "Separating True IBNR and IBNER Claims", ASTIN Bulletin 21.
//! The IBNER pattern is the average D per development period across origin
//! years.
//!
//! Built from an aggregate triangle the split cannot see individual claims:
//! D is the period-over-period decrease `prior - current` and N reconciles to
//! `current - prior + D`, which is zero wherever both cells exist. Built from
//! claims, each claim is classified as new or already reported in each period.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Triangle;
use crate::claims::Claims;
use crate::error::Result;

/// Cells that may be undefined, keyed by origin year and development period
pub type SparseCells = BTreeMap<i32, BTreeMap<u32, Option<f64>>>;

/// N and D triangles and the IBNER pattern, computed once at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IbnerPatternExtractor {
    origin_years: Vec<i32>,
    dev_periods: Vec<u32>,
    new_claims: SparseCells,
    ibner: SparseCells,
}

impl IbnerPatternExtractor {
    /// Decompose a cumulative triangle
    ///
    /// At the first development period N is the cumulative value and D is
    /// undefined. Later cells need the preceding period's cell; without it
    /// both N and D are undefined.
    pub fn from_triangle(triangle: &Triangle) -> Self {
        let origin_years = triangle.origin_years().to_vec();
        let dev_periods = triangle.dev_periods().to_vec();
        let mut new_claims = SparseCells::new();
        let mut ibner = SparseCells::new();

        for &oy in &origin_years {
            let n_row = new_claims.entry(oy).or_default();
            let d_row = ibner.entry(oy).or_default();

            for (idx, &d) in dev_periods.iter().enumerate() {
                let (n, decrease) = match (idx, triangle.get(oy, d)) {
                    (_, None) => (None, None),
                    (0, Some(current)) => (Some(current), None),
                    (_, Some(current)) => match triangle.get(oy, dev_periods[idx - 1]) {
                        Some(prior) => {
                            let decrease = prior - current;
                            (Some(current - prior + decrease), Some(decrease))
                        }
                        None => (None, None),
                    },
                };
                n_row.insert(d, n);
                d_row.insert(d, decrease);
            }
        }

        Self {
            origin_years,
            dev_periods,
            new_claims,
            ibner,
        }
    }

    /// Decompose claim-level incurred development
    ///
    /// A claim counts as new in the first period it reports; its incurred
    /// there goes to N. In every later period it reports, its decrease in
    /// incurred since its previous period goes to D. Cells where no claim of
    /// the origin year reports a given kind of movement are undefined.
    pub fn from_claims(claims: &Claims) -> Result<Self> {
        let mut new_claims = SparseCells::new();
        let mut ibner = SparseCells::new();
        let mut periods = BTreeSet::new();

        for claim in claims {
            let oy = claim.modelling_year()?;
            let history = claim.capped_history();
            let incurred = history.cumulative_incurred();
            let n_row = new_claims.entry(oy).or_default();
            let d_row = ibner.entry(oy).or_default();

            for (idx, &d) in history.development_periods().iter().enumerate() {
                periods.insert(d);
                if idx == 0 {
                    *n_row.entry(d).or_insert(None).get_or_insert(0.0) += incurred[idx];
                } else {
                    *d_row.entry(d).or_insert(None).get_or_insert(0.0) += incurred[idx - 1] - incurred[idx];
                }
            }
        }

        let origin_years: Vec<i32> = new_claims.keys().copied().collect();
        let dev_periods: Vec<u32> = periods.into_iter().collect();

        // every origin year carries every period, undefined where unobserved
        for rows in [&mut new_claims, &mut ibner] {
            for row in rows.values_mut() {
                for &d in &dev_periods {
                    row.entry(d).or_insert(None);
                }
            }
        }

        Ok(Self {
            origin_years,
            dev_periods,
            new_claims,
            ibner,
        })
    }

    pub fn origin_years(&self) -> &[i32] {
        &self.origin_years
    }

    pub fn dev_periods(&self) -> &[u32] {
        &self.dev_periods
    }

    /// N: incurred on newly reported claims
    pub fn new_claims_triangle(&self) -> &SparseCells {
        &self.new_claims
    }

    /// D: IBNER development on reported claims
    pub fn ibner_triangle(&self) -> &SparseCells {
        &self.ibner
    }

    /// Average D per development period over the origin years where it is defined
    pub fn ibner_pattern(&self) -> BTreeMap<u32, Option<f64>> {
        self.dev_periods
            .iter()
            .map(|&d| {
                let observed: Vec<f64> = self
                    .ibner
                    .values()
                    .filter_map(|row| row.get(&d).copied().flatten())
                    .collect();
                let average = (!observed.is_empty()).then(|| observed.iter().sum::<f64>() / observed.len() as f64);
                (d, average)
            })
            .collect()
    }
}
