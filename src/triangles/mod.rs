//! Development triangles, curve fitting and IBNER extraction

mod triangle;
pub mod curve_fitting;
mod ibner;

pub use triangle::{AverageMethod, Triangle, TriangleValue};
pub use curve_fitting::{fit_curve, CurveParameters, CurveType, FitConfig, FitQuality, FittedCurve};
pub use ibner::{IbnerPatternExtractor, SparseCells};
