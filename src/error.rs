//! Error types for the pricing pipeline
//!
//! Structurally invalid configuration (a claim without the date its year basis
//! needs, a contract without a trigger basis, mismatched development sequences)
//! is reported through [`PricingError`] carrying the identifier of the offending
//! record. Sparse data (zero exposure, missing cells, undefined factors) is not an
//! error: those cells and years are simply left out of results.

use thiserror::Error;

/// Errors raised by the pricing pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Invalid claim data
    #[error("claim {claim_id}: {message}")]
    Claims { claim_id: String, message: String },

    /// Invalid exposure data
    #[error("exposure {exposure_id}: {message}")]
    Exposure { exposure_id: String, message: String },

    /// Invalid contract or layer configuration
    #[error("contract {contract_id}: {message}")]
    Contract { contract_id: String, message: String },

    /// Strict trending was requested and a year has no factor
    #[error("no trend factor supplied for year {year}")]
    MissingTrendFactor { year: i32 },

    /// Malformed triangle input
    #[error("invalid triangle: {0}")]
    Triangle(String),

    /// Too few usable age-to-age factors to fit a curve
    #[error("{curve} fit needs at least 2 usable factors, found {points}")]
    InsufficientFitData { curve: &'static str, points: usize },

    /// All regression abscissae are identical
    #[error("{curve} fit is degenerate: development periods have no spread")]
    DegenerateRegression { curve: &'static str },

    /// A projection method could not produce an ultimate for a year
    #[error("{method} projection failed for {year}: {reason}")]
    Projection {
        method: &'static str,
        year: i32,
        reason: String,
    },

    /// Cape Cod prior has no exposure to spread losses over
    #[error("Cape Cod pseudo-exposure is zero for layer {layer_id}")]
    ZeroPseudoExposure { layer_id: u32 },
}

impl PricingError {
    pub fn claims(claim_id: impl Into<String>, message: impl Into<String>) -> Self {
        PricingError::Claims {
            claim_id: claim_id.into(),
            message: message.into(),
        }
    }

    pub fn exposure(exposure_id: impl Into<String>, message: impl Into<String>) -> Self {
        PricingError::Exposure {
            exposure_id: exposure_id.into(),
            message: message.into(),
        }
    }

    pub fn contract(contract_id: impl Into<String>, message: impl Into<String>) -> Self {
        PricingError::Contract {
            contract_id: contract_id.into(),
            message: message.into(),
        }
    }

    /// Identifier of the record the error concerns, if any
    pub fn identifier(&self) -> Option<&str> {
        match self {
            PricingError::Claims { claim_id, .. } => Some(claim_id),
            PricingError::Exposure { exposure_id, .. } => Some(exposure_id),
            PricingError::Contract { contract_id, .. } => Some(contract_id),
            _ => None,
        }
    }
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, PricingError>;
