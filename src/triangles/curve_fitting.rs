//! Development curve fitting
//!
//! Each family is linearised and fitted by ordinary least squares against the
//! development period `t` a link ratio starts from:
//!
//! | Curve         | Model                        | Regression                          |
//! |---------------|------------------------------|-------------------------------------|
//! | Exponential   | r = 1 + exp(a + b t)         | ln(r - 1) on t                      |
//! | Power         | r = a^(b^t)                  | ln(ln r) on t                       |
//! | Weibull       | r = 1 / (1 - exp(-a t^b))    | ln(-ln(1 - 1/r)) on ln t            |
//! | Inverse power | r = 1 + a (t + c)^b          | ln(r - 1) on ln(t + c), per c       |
//!
//! Reference: Lyons, Forster, Kedney, Warren and Wilkinson, Claims Reserving
//! Working Party Paper.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::triangle::AverageMethod;
use crate::error::{PricingError, Result};

/// Parametric family of development curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveType {
    Exponential,
    Power,
    Weibull,
    /// Sherman curve
    InversePower,
}

impl CurveType {
    pub fn name(&self) -> &'static str {
        match self {
            CurveType::Exponential => "exponential",
            CurveType::Power => "power",
            CurveType::Weibull => "weibull",
            CurveType::InversePower => "inverse power",
        }
    }

    pub fn num_parameters(&self) -> usize {
        match self {
            CurveType::InversePower => 3,
            _ => 2,
        }
    }
}

/// Fitting options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Candidate shift constants searched by the inverse power fit
    pub sherman_shifts: Vec<f64>,
    pub average_method: AverageMethod,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            sherman_shifts: vec![0.0, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0],
            average_method: AverageMethod::VolumeWeighted,
        }
    }
}

/// Fitted parameters; `c` is zero for the two-parameter families
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Goodness of fit on the link ratio scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// None when the observed ratios have no variance
    pub r_squared: Option<f64>,
    pub proportion_positive: f64,
    /// Share of standardized residuals outside (-2, 2)
    pub proportion_outside_range: f64,
    pub mean_residual: f64,
    pub std_residual: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    pub curve_type: CurveType,
    pub parameters: CurveParameters,
    pub fit: FitQuality,
}

impl FittedCurve {
    /// Modelled link ratio from development period `t`
    pub fn expected_factor(&self, t: f64) -> f64 {
        expected_factor(self.curve_type, &self.parameters, t)
    }

    /// Modelled link ratio for each period in `periods`
    pub fn smoothed_pattern(&self, periods: &[u32]) -> BTreeMap<u32, f64> {
        periods
            .iter()
            .map(|&d| (d, self.expected_factor(d as f64)))
            .collect()
    }
}

fn expected_factor(curve_type: CurveType, p: &CurveParameters, t: f64) -> f64 {
    match curve_type {
        CurveType::Exponential => 1.0 + (p.a + p.b * t).exp(),
        CurveType::Power => p.a.powf(p.b.powf(t)),
        CurveType::Weibull => 1.0 / (1.0 - (-p.a * t.powf(p.b)).exp()),
        CurveType::InversePower => 1.0 + p.a * (t + p.c).powf(p.b),
    }
}

/// Ordinary least squares, returning `(slope, intercept)`
///
/// None when `x` has no spread or the inputs are empty.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n == 0 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let (numerator, denominator) = x[..n].iter().zip(&y[..n]).fold((0.0, 0.0), |(num, den), (xi, yi)| {
        (num + (xi - mean_x) * (yi - mean_y), den + (xi - mean_x).powi(2))
    });
    if denominator == 0.0 {
        return None;
    }

    let slope = numerator / denominator;
    Some((slope, mean_y - slope * mean_x))
}

fn regress(curve: CurveType, x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    linear_regression(x, y).ok_or(PricingError::DegenerateRegression { curve: curve.name() })
}

/// Exponential parameters `(a, b)` from link ratios `r > 1` at periods `t`
pub fn exponential_fit(factors: &[f64], periods: &[f64]) -> Result<(f64, f64)> {
    let ln_excess: Vec<f64> = factors.iter().map(|r| (r - 1.0).ln()).collect();
    let (b, a) = regress(CurveType::Exponential, periods, &ln_excess)?;
    Ok((a, b))
}

/// Power parameters `(a, b)` from link ratios `r > 1` at periods `t`
pub fn power_fit(factors: &[f64], periods: &[f64]) -> Result<(f64, f64)> {
    let ln_ln: Vec<f64> = factors.iter().map(|r| r.ln().ln()).collect();
    let (ln_b, ln_ln_a) = regress(CurveType::Power, periods, &ln_ln)?;
    Ok((ln_ln_a.exp().exp(), ln_b.exp()))
}

/// Weibull parameters `(a, b)` from link ratios `r > 1` at periods `t > 0`
pub fn weibull_fit(factors: &[f64], periods: &[f64]) -> Result<(f64, f64)> {
    let transformed: Vec<f64> = factors.iter().map(|r| (-(1.0 - 1.0 / r).ln()).ln()).collect();
    let ln_t: Vec<f64> = periods.iter().map(|t| t.ln()).collect();
    let (b, ln_a) = regress(CurveType::Weibull, &ln_t, &transformed)?;
    Ok((ln_a.exp(), b))
}

/// Inverse power parameters `(a, b, c)` minimising the standard error over `shifts`
///
/// A shift that would take any `t + c` to zero or below is skipped.
pub fn inverse_power_fit(factors: &[f64], periods: &[f64], shifts: &[f64]) -> Result<(f64, f64, f64)> {
    let curve = CurveType::InversePower;
    let ln_excess: Vec<f64> = factors.iter().map(|r| (r - 1.0).ln()).collect();

    let mut best: Option<(f64, f64, f64, f64)> = None;
    for &c in shifts {
        if periods.iter().any(|t| t + c <= 0.0) {
            log::debug!("Skipping inverse power shift {}: non-positive t + c", c);
            continue;
        }
        let ln_shifted: Vec<f64> = periods.iter().map(|t| (t + c).ln()).collect();
        let Some((b, ln_a)) = linear_regression(&ln_shifted, &ln_excess) else {
            continue;
        };
        let a = ln_a.exp();

        let squared: f64 = factors
            .iter()
            .zip(periods)
            .map(|(r, t)| ((r - 1.0) - a * (t + c).powf(b)).powi(2))
            .sum();
        let error = (squared / factors.len() as f64).sqrt();

        if best.map_or(true, |(_, _, _, min_error)| error < min_error) {
            best = Some((a, b, c, error));
        }
    }

    let (a, b, c, error) = best.ok_or(PricingError::DegenerateRegression { curve: curve.name() })?;
    log::debug!("Inverse power fit selected c = {} (standard error {:.6})", c, error);
    Ok((a, b, c))
}

/// Coefficient of determination, None when `actual` has no variance
pub fn r_squared(actual: &[f64], expected: &[f64]) -> Option<f64> {
    if actual.is_empty() {
        return None;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if total == 0.0 {
        return None;
    }
    let residual: f64 = actual.iter().zip(expected).map(|(a, e)| (a - e).powi(2)).sum();
    Some(1.0 - residual / total)
}

/// Residuals scaled by `sqrt(RSS / (n - num_parameters))`
///
/// All zero when there are no residual degrees of freedom or the fit is exact.
pub fn standardized_residuals(actual: &[f64], expected: &[f64], num_parameters: usize) -> Vec<f64> {
    let residuals: Vec<f64> = actual.iter().zip(expected).map(|(a, e)| a - e).collect();
    let n = residuals.len();
    if n <= num_parameters {
        return vec![0.0; n];
    }
    let sigma = (residuals.iter().map(|r| r * r).sum::<f64>() / (n - num_parameters) as f64).sqrt();
    if sigma == 0.0 {
        return vec![0.0; n];
    }
    residuals.iter().map(|r| r / sigma).collect()
}

impl FitQuality {
    pub fn assess(actual: &[f64], expected: &[f64], num_parameters: usize) -> Self {
        let residuals = standardized_residuals(actual, expected, num_parameters);
        if residuals.is_empty() {
            return Self::default();
        }
        let n = residuals.len() as f64;
        let mean_residual = residuals.iter().sum::<f64>() / n;

        Self {
            r_squared: r_squared(actual, expected),
            proportion_positive: residuals.iter().filter(|&&r| r > 0.0).count() as f64 / n,
            proportion_outside_range: residuals.iter().filter(|r| r.abs() > 2.0).count() as f64 / n,
            mean_residual,
            std_residual: (residuals.iter().map(|r| (r - mean_residual).powi(2)).sum::<f64>() / n).sqrt(),
        }
    }
}

/// Fit `curve_type` to averaged link ratios keyed by starting development period
///
/// Ratios at or below 1.0 cannot be linearised and are left out of the fit.
pub fn fit_curve(curve_type: CurveType, factors: &BTreeMap<u32, f64>, config: &FitConfig) -> Result<FittedCurve> {
    let mut periods = Vec::with_capacity(factors.len());
    let mut ratios = Vec::with_capacity(factors.len());
    for (&d, &r) in factors {
        if !r.is_finite() || r <= 1.0 {
            log::warn!("Excluding link ratio {:.6} at period {} from {} fit", r, d, curve_type.name());
            continue;
        }
        if curve_type == CurveType::Weibull && d == 0 {
            log::warn!("Excluding period 0 from weibull fit");
            continue;
        }
        periods.push(d as f64);
        ratios.push(r);
    }

    if ratios.len() < 2 {
        return Err(PricingError::InsufficientFitData {
            curve: curve_type.name(),
            points: ratios.len(),
        });
    }

    let parameters = match curve_type {
        CurveType::Exponential => {
            let (a, b) = exponential_fit(&ratios, &periods)?;
            CurveParameters { a, b, c: 0.0 }
        }
        CurveType::Power => {
            let (a, b) = power_fit(&ratios, &periods)?;
            CurveParameters { a, b, c: 0.0 }
        }
        CurveType::Weibull => {
            let (a, b) = weibull_fit(&ratios, &periods)?;
            CurveParameters { a, b, c: 0.0 }
        }
        CurveType::InversePower => {
            let (a, b, c) = inverse_power_fit(&ratios, &periods, &config.sherman_shifts)?;
            CurveParameters { a, b, c }
        }
    };

    let expected: Vec<f64> = periods
        .iter()
        .map(|&t| expected_factor(curve_type, &parameters, t))
        .collect();

    Ok(FittedCurve {
        curve_type,
        parameters,
        fit: FitQuality::assess(&ratios, &expected, curve_type.num_parameters()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn periods() -> Vec<u32> {
        vec![1, 2, 3, 4, 5]
    }

    fn factors_from(f: impl Fn(f64) -> f64) -> BTreeMap<u32, f64> {
        periods().into_iter().map(|d| (d, f(d as f64))).collect()
    }

    #[test]
    fn test_linear_regression() {
        let (slope, intercept) = linear_regression(&[1.0, 2.0, 3.0], &[3.0, 5.0, 7.0]).unwrap();
        assert_relative_eq!(slope, 2.0);
        assert_relative_eq!(intercept, 1.0);
        assert_eq!(linear_regression(&[2.0, 2.0], &[1.0, 3.0]), None);
    }

    #[test]
    fn test_exponential_recovers_parameters() {
        let factors = factors_from(|t| 1.0 + (-0.5 - 0.7 * t).exp());
        let fitted = fit_curve(CurveType::Exponential, &factors, &FitConfig::default()).unwrap();
        assert_relative_eq!(fitted.parameters.a, -0.5, epsilon = 1e-9);
        assert_relative_eq!(fitted.parameters.b, -0.7, epsilon = 1e-9);
        assert_abs_diff_eq!(fitted.fit.r_squared.unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(fitted.expected_factor(3.0), factors[&3], epsilon = 1e-9);
    }

    #[test]
    fn test_power_recovers_parameters() {
        let factors = factors_from(|t| 2.0_f64.powf(0.6_f64.powf(t)));
        let fitted = fit_curve(CurveType::Power, &factors, &FitConfig::default()).unwrap();
        assert_relative_eq!(fitted.parameters.a, 2.0, epsilon = 1e-9);
        assert_relative_eq!(fitted.parameters.b, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn test_weibull_recovers_parameters() {
        let factors = factors_from(|t| 1.0 / (1.0 - (-0.8 * t.powf(0.9)).exp()));
        let fitted = fit_curve(CurveType::Weibull, &factors, &FitConfig::default()).unwrap();
        assert_relative_eq!(fitted.parameters.a, 0.8, epsilon = 1e-8);
        assert_relative_eq!(fitted.parameters.b, 0.9, epsilon = 1e-8);
    }

    #[test]
    fn test_inverse_power_selects_generating_shift() {
        let factors = factors_from(|t| 1.0 + 0.9 * (t + 2.0).powf(-1.5));
        let config = FitConfig {
            sherman_shifts: vec![0.0, 1.0, 2.0, 5.0],
            ..FitConfig::default()
        };
        let fitted = fit_curve(CurveType::InversePower, &factors, &config).unwrap();
        assert_eq!(fitted.parameters.c, 2.0);
        assert_relative_eq!(fitted.parameters.a, 0.9, epsilon = 1e-9);
        assert_relative_eq!(fitted.parameters.b, -1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_power_without_valid_shift_is_degenerate() {
        let factors = factors_from(|t| 1.0 + 1.0 / t);
        let config = FitConfig {
            sherman_shifts: vec![-1.0],
            ..FitConfig::default()
        };
        assert!(matches!(
            fit_curve(CurveType::InversePower, &factors, &config),
            Err(PricingError::DegenerateRegression { .. })
        ));
    }

    #[test]
    fn test_factors_at_or_below_one_are_excluded() {
        let factors: BTreeMap<u32, f64> = [(1, 1.5), (2, 1.0), (3, 0.98)].into_iter().collect();
        match fit_curve(CurveType::Exponential, &factors, &FitConfig::default()) {
            Err(PricingError::InsufficientFitData { points, .. }) => assert_eq!(points, 1),
            other => panic!("expected insufficient data, got {:?}", other),
        }
    }

    #[test]
    fn test_r_squared_and_residual_guards() {
        assert_eq!(r_squared(&[1.2, 1.2], &[1.1, 1.3]), None);
        assert_relative_eq!(r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap(), 1.0);

        assert_eq!(standardized_residuals(&[1.0, 2.0], &[0.5, 2.5], 2), vec![0.0, 0.0]);
        assert_eq!(standardized_residuals(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 2), vec![0.0; 3]);
    }

    #[test]
    fn test_fit_quality_proportions() {
        // residuals 1, -1, 1, -1: sigma = sqrt(4 / 2), standardized +-0.7071
        let quality = FitQuality::assess(&[2.0, 1.0, 2.0, 1.0], &[1.0, 2.0, 1.0, 2.0], 2);
        assert_relative_eq!(quality.proportion_positive, 0.5);
        assert_eq!(quality.proportion_outside_range, 0.0);
        assert_abs_diff_eq!(quality.mean_residual, 0.0);
        assert_relative_eq!(quality.std_residual, 1.0 / 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_smoothed_pattern() {
        let fitted = FittedCurve {
            curve_type: CurveType::Exponential,
            parameters: CurveParameters { a: 0.0, b: -1.0, c: 0.0 },
            fit: FitQuality::default(),
        };
        let pattern = fitted.smoothed_pattern(&[0, 1]);
        assert_relative_eq!(pattern[&0], 2.0);
        assert_relative_eq!(pattern[&1], 1.0 + (-1.0_f64).exp());
    }
}
