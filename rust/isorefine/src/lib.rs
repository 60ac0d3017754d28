#![doc = include_str!("../README.md")]

pub mod chemistry;
pub mod errors;
pub mod isotopes;
pub mod refinement;
pub mod similarity;

pub use crate::chemistry::{
    IonType,
    MolecularFormula,
};
pub use crate::errors::{
    FormulaError,
    PredictionError,
    RefinementError,
    Result,
    UnscorableReason,
};
pub use crate::isotopes::{
    ConvolutionPredictor,
    IsotopePattern,
    IsotopePatternPredictor,
    MeasuredIsotopePattern,
    PredictionCache,
    Resolution,
};
pub use crate::refinement::{
    BatchSummary,
    CompoundAnnotation,
    FeatureRow,
    IsotopeRefiner,
    IsotopeRefinerConfig,
    RepresentativeScan,
    ResolutionMode,
    RowSummary,
};
