#![doc = include_str!("../README.md")]

pub mod detectors;
pub mod errors;
pub mod mobility;
pub mod models;
pub mod utils;

pub use crate::detectors::{
    CentroidConfig,
    GaussianFitConfig,
    LocalMaximumConfig,
    MassDetector,
    SpectrumDetection,
    SpectrumInput,
    ZScoreConfig,
    detect_batch,
};
pub use crate::errors::{
    DetectionError,
    Result,
};
pub use crate::models::{
    MzSpectrum,
    MzTolerance,
    Peak,
    SpectrumView,
};
pub use crate::utils::CancellationToken;
