//! Claim records, development histories and claim collections

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Which claim date attributes a claim to a modelling year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClaimYearType {
    /// Year of the loss date
    #[default]
    AccidentYear,
    /// Year of the underlying policy's inception
    UnderwritingYear,
    /// Year the claim was reported
    ReportedYear,
}

/// Reported status of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ClaimStatus {
    #[default]
    Open,
    Closed,
    Reopened,
}

impl ClaimStatus {
    /// Open and reopened claims still carry case reserves
    pub fn is_open(&self) -> bool {
        matches!(self, ClaimStatus::Open | ClaimStatus::Reopened)
    }
}

/// Identity, policy terms and dates of a single claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimsMetaData {
    /// Unique claim identifier
    pub claim_id: String,

    /// Currency the amounts are recorded in
    pub currency: String,

    /// Underlying policy limit (None = unlimited)
    pub contract_limit: Option<f64>,

    /// Underlying policy deductible
    pub contract_deductible: f64,

    /// True when the recorded amounts are already net of the deductible
    pub claim_in_xs_of_deductible: bool,

    /// Date used to derive the modelling year
    pub claim_year_basis: ClaimYearType,

    pub loss_date: Option<NaiveDate>,
    pub policy_inception_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,

    pub line_of_business: Option<String>,

    pub status: ClaimStatus,
}

impl ClaimsMetaData {
    /// Create metadata with no policy terms, no dates and accident-year basis
    pub fn new(claim_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            claim_id: claim_id.into(),
            currency: currency.into(),
            contract_limit: None,
            contract_deductible: 0.0,
            claim_in_xs_of_deductible: false,
            claim_year_basis: ClaimYearType::AccidentYear,
            loss_date: None,
            policy_inception_date: None,
            report_date: None,
            line_of_business: None,
            status: ClaimStatus::Open,
        }
    }

    /// Set the underlying policy deductible and limit
    pub fn with_policy_terms(mut self, deductible: f64, limit: Option<f64>, in_xs_of_deductible: bool) -> Self {
        self.contract_deductible = deductible;
        self.contract_limit = limit;
        self.claim_in_xs_of_deductible = in_xs_of_deductible;
        self
    }

    /// Set the loss, policy inception and report dates
    pub fn with_dates(
        mut self,
        loss_date: Option<NaiveDate>,
        policy_inception_date: Option<NaiveDate>,
        report_date: Option<NaiveDate>,
    ) -> Self {
        self.loss_date = loss_date;
        self.policy_inception_date = policy_inception_date;
        self.report_date = report_date;
        self
    }

    pub fn with_year_basis(mut self, basis: ClaimYearType) -> Self {
        self.claim_year_basis = basis;
        self
    }

    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    /// Modelling year under the configured year basis
    ///
    /// Fails when the date the basis relies on is absent.
    pub fn modelling_year(&self) -> Result<i32> {
        let date = match self.claim_year_basis {
            ClaimYearType::AccidentYear => self.loss_date,
            ClaimYearType::UnderwritingYear => self.policy_inception_date,
            ClaimYearType::ReportedYear => self.report_date,
        };

        date.map(|d| d.year())
            .ok_or_else(|| PricingError::claims(&self.claim_id, "Required date missing from data"))
    }
}

/// Cumulative paid and incurred amounts by development period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimDevelopmentHistory {
    development_periods: Vec<u32>,
    cumulative_paid: Vec<f64>,
    cumulative_incurred: Vec<f64>,
}

impl ClaimDevelopmentHistory {
    /// Build a history, checking the sequences line up
    ///
    /// `claim_id` only labels the error when the sequences are inconsistent.
    pub fn new(
        claim_id: &str,
        development_periods: Vec<u32>,
        cumulative_paid: Vec<f64>,
        cumulative_incurred: Vec<f64>,
    ) -> Result<Self> {
        if development_periods.len() != cumulative_paid.len()
            || development_periods.len() != cumulative_incurred.len()
        {
            return Err(PricingError::claims(
                claim_id,
                format!(
                    "development sequences differ in length (periods {}, paid {}, incurred {})",
                    development_periods.len(),
                    cumulative_paid.len(),
                    cumulative_incurred.len()
                ),
            ));
        }

        if development_periods.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PricingError::claims(
                claim_id,
                "development periods must be strictly increasing",
            ));
        }

        Ok(Self {
            development_periods,
            cumulative_paid,
            cumulative_incurred,
        })
    }

    pub fn development_periods(&self) -> &[u32] {
        &self.development_periods
    }

    pub fn cumulative_paid(&self) -> &[f64] {
        &self.cumulative_paid
    }

    pub fn cumulative_incurred(&self) -> &[f64] {
        &self.cumulative_incurred
    }

    pub fn len(&self) -> usize {
        self.development_periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.development_periods.is_empty()
    }

    pub fn latest_paid(&self) -> f64 {
        self.cumulative_paid.last().copied().unwrap_or(0.0)
    }

    pub fn latest_incurred(&self) -> f64 {
        self.cumulative_incurred.last().copied().unwrap_or(0.0)
    }

    /// Latest case reserve (incurred less paid)
    pub fn latest_reserved(&self) -> f64 {
        self.latest_incurred() - self.latest_paid()
    }

    pub fn latest_development_period(&self) -> u32 {
        self.development_periods.last().copied().unwrap_or(0)
    }

    /// Case reserve at each development period
    pub fn cumulative_reserved(&self) -> Vec<f64> {
        self.cumulative_incurred
            .iter()
            .zip(&self.cumulative_paid)
            .map(|(incurred, paid)| incurred - paid)
            .collect()
    }

    pub fn incremental_paid(&self) -> Vec<f64> {
        Self::incremental(&self.cumulative_paid)
    }

    pub fn incremental_incurred(&self) -> Vec<f64> {
        Self::incremental(&self.cumulative_incurred)
    }

    /// Differences between consecutive cumulative values, first value kept as-is
    pub fn incremental(cumulative: &[f64]) -> Vec<f64> {
        let mut prior = 0.0;
        cumulative
            .iter()
            .map(|&value| {
                let step = value - prior;
                prior = value;
                step
            })
            .collect()
    }

    /// Development period weighted by incremental payments
    ///
    /// None when nothing has been paid.
    pub fn mean_payment_duration(&self) -> Option<f64> {
        let incremental = self.incremental_paid();
        let total_paid: f64 = incremental.iter().sum();
        if self.is_empty() || total_paid == 0.0 {
            return None;
        }

        let weighted: f64 = self
            .development_periods
            .iter()
            .zip(&incremental)
            .map(|(&period, &paid)| period as f64 * paid)
            .sum();

        Some(weighted / total_paid)
    }

    /// Apply `f` to every paid and incurred value, keeping the periods
    pub fn map_values<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            development_periods: self.development_periods.clone(),
            cumulative_paid: self.cumulative_paid.iter().map(|&v| f(v)).collect(),
            cumulative_incurred: self.cumulative_incurred.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Multiply every value by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        self.map_values(|v| v * factor)
    }
}

/// A claim: metadata plus its raw development history
///
/// Derived histories are recomputed from the stored state on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    meta: ClaimsMetaData,
    history: ClaimDevelopmentHistory,
}

impl Claim {
    pub fn new(meta: ClaimsMetaData, history: ClaimDevelopmentHistory) -> Self {
        Self { meta, history }
    }

    pub fn meta(&self) -> &ClaimsMetaData {
        &self.meta
    }

    /// Development history exactly as recorded
    pub fn history(&self) -> &ClaimDevelopmentHistory {
        &self.history
    }

    pub fn claim_id(&self) -> &str {
        &self.meta.claim_id
    }

    pub fn currency(&self) -> &str {
        &self.meta.currency
    }

    pub fn status(&self) -> ClaimStatus {
        self.meta.status
    }

    pub fn line_of_business(&self) -> Option<&str> {
        self.meta.line_of_business.as_deref()
    }

    pub fn modelling_year(&self) -> Result<i32> {
        self.meta.modelling_year()
    }

    /// History with the policy deductible removed (floored at zero)
    ///
    /// Returned unchanged when the recorded amounts are already excess of
    /// the deductible.
    pub fn uncapped_history(&self) -> ClaimDevelopmentHistory {
        if self.meta.claim_in_xs_of_deductible {
            return self.history.clone();
        }
        let deductible = self.meta.contract_deductible;
        self.history.map_values(|v| (v - deductible).max(0.0))
    }

    /// Uncapped history clipped to `[0, contract_limit]`
    pub fn capped_history(&self) -> ClaimDevelopmentHistory {
        let limit = self.meta.contract_limit.unwrap_or(f64::INFINITY);
        self.uncapped_history().map_values(|v| v.max(0.0).min(limit))
    }

    /// Same metadata, different history
    pub fn with_history(&self, history: ClaimDevelopmentHistory) -> Self {
        Self {
            meta: self.meta.clone(),
            history,
        }
    }

    /// Same history, different metadata
    pub fn with_meta(&self, meta: ClaimsMetaData) -> Self {
        Self {
            meta,
            history: self.history.clone(),
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self
            .modelling_year()
            .map(|y| y.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        write!(
            f,
            "Claim(claim_id={}, modelling_year={}, latest_incurred={}, latest_capped_incurred={})",
            self.meta.claim_id,
            year,
            self.history.latest_incurred(),
            self.capped_history().latest_incurred()
        )
    }
}

/// Ordered collection of claims
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    claims: Vec<Claim>,
}

impl Claims {
    pub fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    pub fn push(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Claim> {
        self.claims.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Claim> {
        self.claims.get(index)
    }

    pub fn as_slice(&self) -> &[Claim] {
        &self.claims
    }

    /// Copy of a contiguous range of claims
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.claims.len());
        let start = range.start.min(end);
        Self::new(self.claims[start..end].to_vec())
    }

    /// Distinct modelling years, ascending
    pub fn modelling_years(&self) -> Result<Vec<i32>> {
        let mut years = BTreeSet::new();
        for claim in &self.claims {
            years.insert(claim.modelling_year()?);
        }
        Ok(years.into_iter().collect())
    }

    /// Distinct development period sequences
    pub fn development_periods(&self) -> Vec<Vec<u32>> {
        self.claims
            .iter()
            .map(|c| c.history.development_periods().to_vec())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn currencies(&self) -> BTreeSet<String> {
        self.claims.iter().map(|c| c.meta.currency.clone()).collect()
    }

    /// Every claim re-attributed under `basis`
    pub fn with_year_basis(&self, basis: ClaimYearType) -> Self {
        self.claims
            .iter()
            .map(|c| c.with_meta(c.meta.clone().with_year_basis(basis)))
            .collect()
    }

    /// Apply `f` to each claim's raw history, keeping metadata
    pub fn map_histories<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&Claim) -> Result<ClaimDevelopmentHistory>,
    {
        let claims = self
            .claims
            .iter()
            .map(|c| Ok(c.with_history(f(c)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(claims))
    }
}

impl FromIterator<Claim> for Claims {
    fn from_iter<I: IntoIterator<Item = Claim>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Claims {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn history() -> ClaimDevelopmentHistory {
        ClaimDevelopmentHistory::new(
            "123",
            vec![1, 2, 3],
            vec![1000.0, 2000.0, 3000.0],
            vec![1500.0, 2500.0, 3500.0],
        )
        .unwrap()
    }

    fn meta() -> ClaimsMetaData {
        ClaimsMetaData::new("123", "USD")
            .with_policy_terms(100.0, Some(100_000.0), false)
            .with_dates(date(2020, 1, 1), date(2019, 1, 1), date(2021, 1, 1))
    }

    #[test]
    fn test_history_rejects_mismatched_lengths() {
        let err = ClaimDevelopmentHistory::new("C9", vec![1, 2], vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert_eq!(err.identifier(), Some("C9"));
    }

    #[test]
    fn test_history_rejects_unordered_periods() {
        let result = ClaimDevelopmentHistory::new("C9", vec![2, 1], vec![1.0, 2.0], vec![1.0, 2.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_latest_values_and_empty_defaults() {
        let h = history();
        assert_eq!(h.latest_paid(), 3000.0);
        assert_eq!(h.latest_incurred(), 3500.0);
        assert_eq!(h.latest_reserved(), 500.0);
        assert_eq!(h.latest_development_period(), 3);

        let empty = ClaimDevelopmentHistory::default();
        assert_eq!(empty.latest_paid(), 0.0);
        assert_eq!(empty.latest_incurred(), 0.0);
        assert_eq!(empty.latest_development_period(), 0);
        assert_eq!(empty.mean_payment_duration(), None);
    }

    #[test]
    fn test_incremental_and_reserved() {
        let h = history();
        assert_eq!(h.incremental_paid(), vec![1000.0, 1000.0, 1000.0]);
        assert_eq!(h.incremental_incurred(), vec![1500.0, 1000.0, 1000.0]);
        assert_eq!(h.cumulative_reserved(), vec![500.0, 500.0, 500.0]);
        assert_eq!(ClaimDevelopmentHistory::incremental(&[2.0, 5.0, 9.0]), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_mean_payment_duration() {
        assert_eq!(history().mean_payment_duration(), Some(2.0));
    }

    #[test]
    fn test_modelling_year_follows_basis() {
        let m = meta();
        assert_eq!(m.modelling_year().unwrap(), 2020);
        assert_eq!(m.clone().with_year_basis(ClaimYearType::UnderwritingYear).modelling_year().unwrap(), 2019);
        assert_eq!(m.with_year_basis(ClaimYearType::ReportedYear).modelling_year().unwrap(), 2021);
    }

    #[test]
    fn test_modelling_year_missing_date_is_error() {
        let m = ClaimsMetaData::new("C1", "USD").with_year_basis(ClaimYearType::ReportedYear);
        match m.modelling_year() {
            Err(PricingError::Claims { claim_id, message }) => {
                assert_eq!(claim_id, "C1");
                assert_eq!(message, "Required date missing from data");
            }
            other => panic!("expected claims error, got {:?}", other),
        }
    }

    #[test]
    fn test_uncapped_removes_deductible() {
        let claim = Claim::new(meta(), history());
        let uncapped = claim.uncapped_history();
        assert_eq!(uncapped.cumulative_paid(), &[900.0, 1900.0, 2900.0]);
        assert_eq!(uncapped.cumulative_incurred(), &[1400.0, 2400.0, 3400.0]);
    }

    #[test]
    fn test_uncapped_unchanged_when_already_excess() {
        let claim = Claim::new(meta().with_policy_terms(100.0, Some(100_000.0), true), history());
        assert_eq!(claim.uncapped_history(), history());
    }

    #[test]
    fn test_capped_applies_limit_after_deductible() {
        let claim = Claim::new(meta().with_policy_terms(100.0, Some(2000.0), false), history());
        let capped = claim.capped_history();
        assert_eq!(capped.cumulative_paid(), &[900.0, 1900.0, 2000.0]);
        assert_eq!(capped.cumulative_incurred(), &[1400.0, 2000.0, 2000.0]);
    }

    #[test]
    fn test_capped_within_bounds_when_deductible_exceeds_loss() {
        let claim = Claim::new(meta().with_policy_terms(5000.0, Some(2000.0), false), history());
        for &v in claim.capped_history().cumulative_incurred() {
            assert!((0.0..=2000.0).contains(&v));
        }
        assert_eq!(claim.uncapped_history().cumulative_paid(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_display() {
        let claim = Claim::new(meta(), history());
        let text = claim.to_string();
        assert!(text.contains("claim_id=123"));
        assert!(text.contains("modelling_year=2020"));
        assert!(text.contains("latest_incurred=3500"));
        assert!(text.contains("latest_capped_incurred=3400"));
    }

    #[test]
    fn test_claims_collection_views() {
        let second = Claim::new(
            ClaimsMetaData::new("2", "EUR").with_dates(date(2021, 1, 1), None, None),
            ClaimDevelopmentHistory::new("2", vec![1, 2], vec![500.0, 900.0], vec![700.0, 1100.0]).unwrap(),
        );
        let mut claims = Claims::new(vec![Claim::new(meta(), history())]);
        claims.push(second);

        assert_eq!(claims.len(), 2);
        assert_eq!(claims.modelling_years().unwrap(), vec![2020, 2021]);
        assert_eq!(claims.development_periods(), vec![vec![1, 2], vec![1, 2, 3]]);
        assert_eq!(
            claims.currencies().into_iter().collect::<Vec<_>>(),
            vec!["EUR".to_string(), "USD".to_string()]
        );

        let first = claims.slice(0..1);
        assert_eq!(first.len(), 1);
        assert_eq!(first.get(0).unwrap().claim_id(), "123");
    }

    #[test]
    fn test_with_year_basis_reattributes() {
        let claims = Claims::new(vec![Claim::new(meta(), history())]);
        let reported = claims.with_year_basis(ClaimYearType::ReportedYear);
        assert_eq!(reported.modelling_years().unwrap(), vec![2021]);
        assert_eq!(claims.modelling_years().unwrap(), vec![2020]);
    }
}
