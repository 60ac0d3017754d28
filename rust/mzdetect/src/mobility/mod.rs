pub mod binning;

pub use binning::{
    BinnedMobilogram,
    MOBILITY_EPSILON,
    MobilityTrace,
    MobilityType,
    MobilogramBinner,
    recommended_bin_width,
};
