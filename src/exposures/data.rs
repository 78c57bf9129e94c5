//! Exposure records and per-year exposure totals

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Whether an exposure value is already earned or is a written figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExposureBasis {
    #[default]
    Earned,
    Written,
}

/// Identity and period of an exposure record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureMetaData {
    pub exposure_id: String,
    pub exposure_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub currency: String,
    pub line_of_business: Option<String>,
    pub basis: ExposureBasis,
}

impl ExposureMetaData {
    pub fn term_length_days(&self) -> i64 {
        (self.period_end - self.period_start).num_days()
    }
}

/// Monetary values of an exposure record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureValues {
    /// Core exposure measure (premium, sum insured, ...)
    pub exposure_value: f64,
    pub attachment_point: f64,
    pub limit: f64,
}

/// A single exposure record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    meta: ExposureMetaData,
    values: ExposureValues,
}

impl Exposure {
    /// Create an exposure, rejecting periods that end before they start
    pub fn new(meta: ExposureMetaData, values: ExposureValues) -> Result<Self> {
        if meta.period_start > meta.period_end {
            return Err(PricingError::exposure(
                &meta.exposure_id,
                "Exposure period start date cannot be after the end date.",
            ));
        }
        Ok(Self { meta, values })
    }

    pub fn meta(&self) -> &ExposureMetaData {
        &self.meta
    }

    pub fn values(&self) -> &ExposureValues {
        &self.values
    }

    pub fn exposure_id(&self) -> &str {
        &self.meta.exposure_id
    }

    pub fn currency(&self) -> &str {
        &self.meta.currency
    }

    pub fn exposure_value(&self) -> f64 {
        self.values.exposure_value
    }

    /// Year the exposure period starts in
    pub fn modelling_year(&self) -> i32 {
        self.meta.period_start.year()
    }

    /// Share of the exposure term elapsed at `analysis_date`, in `[0, 1]`
    pub fn earned_pct(&self, analysis_date: NaiveDate) -> f64 {
        let term = self.meta.term_length_days();
        if term == 0 {
            return 0.0;
        }
        let elapsed = (analysis_date - self.meta.period_start).num_days();
        (elapsed as f64 / term as f64).clamp(0.0, 1.0)
    }

    /// Earned exposure at `analysis_date`
    ///
    /// Earned-basis values are taken in full; written values are earned
    /// pro rata over the exposure term.
    pub fn earned_exposure(&self, analysis_date: NaiveDate) -> f64 {
        match self.meta.basis {
            ExposureBasis::Earned => self.values.exposure_value,
            ExposureBasis::Written => self.values.exposure_value * self.earned_pct(analysis_date),
        }
    }

    /// Written exposure (zero for earned-basis records)
    pub fn written_exposure(&self) -> f64 {
        match self.meta.basis {
            ExposureBasis::Written => self.values.exposure_value,
            ExposureBasis::Earned => 0.0,
        }
    }

    /// Same record with a new exposure value
    pub fn with_exposure_value(&self, exposure_value: f64) -> Self {
        Self {
            meta: self.meta.clone(),
            values: ExposureValues {
                exposure_value,
                ..self.values
            },
        }
    }

    /// Same record relabelled to another currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.meta.currency = currency.into();
        self
    }
}

/// Ordered collection of exposures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exposures {
    exposures: Vec<Exposure>,
}

impl Exposures {
    pub fn new(exposures: Vec<Exposure>) -> Self {
        Self { exposures }
    }

    pub fn push(&mut self, exposure: Exposure) {
        self.exposures.push(exposure);
    }

    pub fn len(&self) -> usize {
        self.exposures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exposures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Exposure> {
        self.exposures.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Exposure> {
        self.exposures.get(index)
    }

    /// Distinct modelling years, ascending
    pub fn modelling_years(&self) -> Vec<i32> {
        self.exposures
            .iter()
            .map(|e| e.modelling_year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn currencies(&self) -> BTreeSet<String> {
        self.exposures.iter().map(|e| e.meta.currency.clone()).collect()
    }

    /// Replace every exposure value with `f(exposure)`
    pub fn map_values<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&Exposure) -> Result<f64>,
    {
        let exposures = self
            .exposures
            .iter()
            .map(|e| Ok(e.with_exposure_value(f(e)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(exposures))
    }
}

impl FromIterator<Exposure> for Exposures {
    fn from_iter<I: IntoIterator<Item = Exposure>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Exposures {
    type Item = &'a Exposure;
    type IntoIter = std::slice::Iter<'a, Exposure>;

    fn into_iter(self) -> Self::IntoIter {
        self.exposures.iter()
    }
}

/// Written and earned exposure totals for one modelling year
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateExposures {
    pub written: f64,
    pub earned: f64,
    pub count: usize,
}

impl AggregateExposures {
    /// Totals per modelling year as at `analysis_date`
    pub fn by_modelling_year(exposures: &Exposures, analysis_date: NaiveDate) -> BTreeMap<i32, Self> {
        let mut result: BTreeMap<i32, Self> = BTreeMap::new();
        for exposure in exposures {
            let entry = result.entry(exposure.modelling_year()).or_default();
            entry.written += exposure.written_exposure();
            entry.earned += exposure.earned_exposure(analysis_date);
            entry.count += 1;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn exposure(id: &str, start: NaiveDate, end: NaiveDate, basis: ExposureBasis, value: f64) -> Exposure {
        Exposure::new(
            ExposureMetaData {
                exposure_id: id.to_string(),
                exposure_name: format!("Exposure {}", id),
                period_start: start,
                period_end: end,
                currency: "USD".to_string(),
                line_of_business: None,
                basis,
            },
            ExposureValues {
                exposure_value: value,
                attachment_point: 0.0,
                limit: value,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_term_length_and_modelling_year() {
        let e = exposure("E1", date(2023, 1, 1), date(2023, 12, 31), ExposureBasis::Written, 100.0);
        assert_eq!(e.meta().term_length_days(), 364);
        assert_eq!(e.modelling_year(), 2023);
    }

    #[test]
    fn test_start_after_end_rejected() {
        let meta = ExposureMetaData {
            exposure_id: "BAD".to_string(),
            exposure_name: "bad".to_string(),
            period_start: date(2023, 6, 1),
            period_end: date(2023, 1, 1),
            currency: "USD".to_string(),
            line_of_business: None,
            basis: ExposureBasis::Earned,
        };
        let values = ExposureValues { exposure_value: 1.0, attachment_point: 0.0, limit: 1.0 };
        let err = Exposure::new(meta, values).unwrap_err();
        assert_eq!(err.identifier(), Some("BAD"));
    }

    #[test]
    fn test_written_exposure_earns_pro_rata() {
        // 2023-01-01 to 2023-12-31 is 364 days; 182 days elapsed by 2023-07-02
        let e = exposure("E1", date(2023, 1, 1), date(2023, 12, 31), ExposureBasis::Written, 364_000.0);
        assert_relative_eq!(e.earned_pct(date(2023, 7, 2)), 0.5);
        assert_relative_eq!(e.earned_exposure(date(2023, 7, 2)), 182_000.0);
        assert_eq!(e.earned_pct(date(2022, 1, 1)), 0.0);
        assert_eq!(e.earned_pct(date(2025, 1, 1)), 1.0);
    }

    #[test]
    fn test_zero_length_term_earns_nothing() {
        let e = exposure("E1", date(2023, 1, 1), date(2023, 1, 1), ExposureBasis::Written, 100.0);
        assert_eq!(e.earned_exposure(date(2024, 1, 1)), 0.0);
    }

    #[test]
    fn test_aggregate_by_year() {
        let exposures = Exposures::new(vec![
            exposure("E1", date(2022, 1, 1), date(2022, 12, 31), ExposureBasis::Written, 1000.0),
            exposure("E2", date(2022, 7, 1), date(2023, 6, 30), ExposureBasis::Earned, 500.0),
            exposure("E3", date(2023, 1, 1), date(2023, 12, 31), ExposureBasis::Written, 2000.0),
        ]);
        let totals = AggregateExposures::by_modelling_year(&exposures, date(2024, 1, 1));

        assert_eq!(totals.len(), 2);
        assert_relative_eq!(totals[&2022].written, 1000.0);
        assert_relative_eq!(totals[&2022].earned, 1500.0);
        assert_eq!(totals[&2022].count, 2);
        assert_relative_eq!(totals[&2023].earned, 2000.0);
    }
}
