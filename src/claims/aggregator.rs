//! Claim aggregation by modelling year and other attributes
//!
//! All figures are taken from the capped development history, so they are
//! net of policy deductibles and limits (or of layer terms, once allocated).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::data::{Claim, ClaimStatus, Claims};
use crate::error::Result;

/// Attribute a claim can be grouped on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimGrouping {
    ModellingYear,
    Currency,
    LineOfBusiness,
}

/// One component of a grouping key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Year(i32),
    Text(String),
    /// Attribute not recorded on the claim
    Missing,
}

/// Totals over a group of claims
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimsAggregate {
    /// Sum of latest capped paid
    pub latest_paid: f64,

    /// Sum of latest capped incurred
    pub latest_incurred: f64,

    /// Latest paid on open and reopened claims
    pub open_paid: f64,

    /// Latest incurred on open and reopened claims
    pub open_incurred: f64,

    pub count_by_status: BTreeMap<ClaimStatus, usize>,

    pub total_count: usize,

    /// Mean of the claims' payment durations (claims with no payments ignored)
    pub mean_payment_duration: Option<f64>,

    #[serde(skip)]
    duration_sum: f64,
    #[serde(skip)]
    duration_count: usize,
}

impl ClaimsAggregate {
    /// Aggregate a set of claims
    pub fn from_claims<'a, I>(claims: I) -> Self
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        let mut aggregate = Self::default();
        for claim in claims {
            aggregate.add(claim);
        }
        aggregate
    }

    /// Fold one claim into the totals
    pub fn add(&mut self, claim: &Claim) {
        let capped = claim.capped_history();
        let paid = capped.latest_paid();
        let incurred = capped.latest_incurred();

        self.latest_paid += paid;
        self.latest_incurred += incurred;
        if claim.status().is_open() {
            self.open_paid += paid;
            self.open_incurred += incurred;
        }

        *self.count_by_status.entry(claim.status()).or_insert(0) += 1;
        self.total_count += 1;

        if let Some(duration) = capped.mean_payment_duration() {
            self.duration_sum += duration;
            self.duration_count += 1;
            self.mean_payment_duration = Some(self.duration_sum / self.duration_count as f64);
        }
    }

    pub fn count(&self, status: ClaimStatus) -> usize {
        self.count_by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn open_count(&self) -> usize {
        self.count(ClaimStatus::Open) + self.count(ClaimStatus::Reopened)
    }
}

/// Groups a claims collection and aggregates each group
pub struct ClaimAggregator<'a> {
    claims: &'a Claims,
}

impl<'a> ClaimAggregator<'a> {
    pub fn new(claims: &'a Claims) -> Self {
        Self { claims }
    }

    /// Aggregate per modelling year
    pub fn by_modelling_year(&self) -> Result<BTreeMap<i32, ClaimsAggregate>> {
        let mut result: BTreeMap<i32, ClaimsAggregate> = BTreeMap::new();
        for claim in self.claims {
            result.entry(claim.modelling_year()?).or_default().add(claim);
        }
        Ok(result)
    }

    /// Aggregate on any combination of attributes, keyed in grouping order
    pub fn aggregate_by(&self, grouping: &[ClaimGrouping]) -> Result<BTreeMap<Vec<GroupKey>, ClaimsAggregate>> {
        let mut result: BTreeMap<Vec<GroupKey>, ClaimsAggregate> = BTreeMap::new();
        for claim in self.claims {
            let key = grouping
                .iter()
                .map(|g| Self::group_key(claim, *g))
                .collect::<Result<Vec<_>>>()?;
            result.entry(key).or_default().add(claim);
        }
        Ok(result)
    }

    fn group_key(claim: &Claim, grouping: ClaimGrouping) -> Result<GroupKey> {
        Ok(match grouping {
            ClaimGrouping::ModellingYear => GroupKey::Year(claim.modelling_year()?),
            ClaimGrouping::Currency => GroupKey::Text(claim.currency().to_string()),
            ClaimGrouping::LineOfBusiness => claim
                .line_of_business()
                .map(|lob| GroupKey::Text(lob.to_string()))
                .unwrap_or(GroupKey::Missing),
        })
    }
}
