pub mod annotation;
pub mod config;
pub mod refiner;

pub use annotation::{
    CompoundAnnotation,
    FeatureRow,
    RepresentativeScan,
    sort_by_isotope_score,
};
pub use config::{
    IsotopeRefinerConfig,
    ResolutionMode,
};
pub use refiner::{
    BatchSummary,
    IsotopeRefiner,
    RowSummary,
};
