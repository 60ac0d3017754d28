pub mod gaussian_fit;
pub mod local;
pub mod zscore;

use crate::errors::{
    DetectionError,
    Result,
};
use crate::models::{
    MzSpectrum,
    Peak,
    SpectrumView,
};
use crate::utils::CancellationToken;
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    info,
    instrument,
    warn,
};

pub use gaussian_fit::{
    GaussianFitConfig,
    GaussianParams,
};
pub use local::{
    CentroidConfig,
    LocalMaximumConfig,
};
pub use zscore::ZScoreConfig;

/// Peak detection algorithm together with its parameters.
///
/// Serialized with an `algorithm` tag, for instance
/// `{"algorithm": "z_score", "lag": 5, "threshold": 3.5, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum MassDetector {
    ZScore(ZScoreConfig),
    GaussianFit(GaussianFitConfig),
    Centroid(CentroidConfig),
    LocalMaximum(LocalMaximumConfig),
}

impl Default for MassDetector {
    fn default() -> Self {
        MassDetector::ZScore(ZScoreConfig::default())
    }
}

impl MassDetector {
    /// Parameter checks that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        match self {
            MassDetector::ZScore(cfg) => cfg.validate(),
            MassDetector::GaussianFit(cfg) => cfg.validate(),
            MassDetector::Centroid(cfg) => cfg.validate(),
            MassDetector::LocalMaximum(cfg) => cfg.validate(),
        }
    }

    pub fn requires_mass_list(&self) -> bool {
        matches!(self, MassDetector::GaussianFit(_))
    }

    /// Runs the detector on one spectrum.
    ///
    /// `mass_list` is the coarse peak list of a previous detection step,
    /// only used by detectors that refine existing peaks.
    ///
    /// ```
    /// use mzdetect::{MassDetector, MzSpectrum, LocalMaximumConfig};
    ///
    /// let spec = MzSpectrum::try_new(
    ///     vec![100.0, 100.1, 100.2, 100.3],
    ///     vec![1.0, 10.0, 2.0, 1.0],
    /// ).unwrap();
    /// let detector = MassDetector::LocalMaximum(LocalMaximumConfig { noise_level: 5.0 });
    /// let peaks = detector.detect(&spec, None).unwrap();
    /// assert_eq!(peaks.len(), 1);
    /// assert_eq!(peaks[0].mz, 100.1);
    /// ```
    pub fn detect<S: SpectrumView + ?Sized>(
        &self,
        spectrum: &S,
        mass_list: Option<&[Peak]>,
    ) -> Result<Vec<Peak>> {
        match self {
            MassDetector::ZScore(cfg) => cfg.detect(spectrum),
            MassDetector::GaussianFit(cfg) => cfg.detect(spectrum, mass_list),
            MassDetector::Centroid(cfg) => cfg.detect(spectrum),
            MassDetector::LocalMaximum(cfg) => cfg.detect(spectrum),
        }
    }
}

/// One spectrum of a detection batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumInput {
    pub id: String,
    pub spectrum: MzSpectrum,
    #[serde(default)]
    pub mass_list: Option<Vec<Peak>>,
}

#[derive(Debug, Clone)]
pub struct SpectrumDetection {
    pub id: String,
    pub peaks: Result<Vec<Peak>>,
}

/// Runs `detector` over many spectra in parallel.
///
/// Invalid parameters fail the whole batch before any spectrum is touched.
/// Everything else (missing mass lists, malformed spectra, cancellation)
/// is reported per spectrum and does not stop the rest of the batch.
#[instrument(skip_all, fields(num_spectra = inputs.len()))]
pub fn detect_batch(
    detector: &MassDetector,
    inputs: &[SpectrumInput],
    cancel: Option<&CancellationToken>,
) -> Result<Vec<SpectrumDetection>> {
    detector.validate()?;

    let out: Vec<SpectrumDetection> = inputs
        .par_iter()
        .map(|input| {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return SpectrumDetection {
                    id: input.id.clone(),
                    peaks: Err(DetectionError::Cancelled),
                };
            }
            let peaks = input
                .spectrum
                .validate()
                .and_then(|_| detector.detect(&input.spectrum, input.mass_list.as_deref()));
            if let Err(e) = &peaks {
                warn!("Peak detection failed for spectrum {}: {}", input.id, e);
            }
            SpectrumDetection {
                id: input.id.clone(),
                peaks,
            }
        })
        .collect();

    let num_ok = out.iter().filter(|x| x.peaks.is_ok()).count();
    info!("Detected peaks in {}/{} spectra", num_ok, out.len());
    Ok(out)
}
