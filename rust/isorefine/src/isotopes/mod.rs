pub mod cache;
pub mod pattern;
pub mod prediction;
pub mod resolution;

pub use cache::PredictionCache;
pub use pattern::{
    IsotopePattern,
    MeasuredIsotopePattern,
    MultiChargeIsotopePattern,
};
pub use prediction::{
    ConvolutionPredictor,
    IsotopeLine,
    IsotopePatternPredictor,
    ResolutionPatterns,
    isotope_distribution,
};
pub use resolution::{
    DEFAULT_RESOLUTION_WIDTHS,
    Resolution,
};
