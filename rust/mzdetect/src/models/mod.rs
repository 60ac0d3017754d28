pub mod spectrum;
pub mod tolerance;

pub use spectrum::{
    MzSpectrum,
    Peak,
    SpectrumView,
};
pub use tolerance::MzTolerance;
