use crate::errors::{
    DetectionError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A single (m/z, intensity) point.
///
/// Used both as detector output and as the signal type of isotope patterns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

impl Peak {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

/// Read-only, index-addressable access to a spectrum sorted by m/z.
///
/// Detectors are generic over this trait so that callers can hand in
/// whatever storage they already have (owned vectors, memory maps, views
/// into a larger frame) without copying.
pub trait SpectrumView {
    fn len(&self) -> usize;
    fn mz(&self, index: usize) -> f64;
    fn intensity(&self, index: usize) -> f64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the sample whose m/z is closest to `mz`.
    ///
    /// Returns `None` only for empty spectra. When two samples are
    /// equally close the lower index is returned.
    fn closest_index(&self, mz: f64) -> Option<usize> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        // Lower bound binary search, same as `partition_point` on a slice.
        let mut lo = 0;
        let mut hi = len;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.mz(mid) < mz {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == 0 {
            return Some(0);
        }
        if lo == len {
            return Some(len - 1);
        }
        let below = mz - self.mz(lo - 1);
        let above = self.mz(lo) - mz;
        if below <= above {
            Some(lo - 1)
        } else {
            Some(lo)
        }
    }
}

/// Owned spectrum in struct-of-arrays layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MzSpectrum {
    mz: Vec<f64>,
    intensity: Vec<f64>,
}

impl MzSpectrum {
    pub fn try_new(mz: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        let out = Self { mz, intensity };
        out.validate()?;
        Ok(out)
    }

    /// Checks the invariants the detectors rely on.
    ///
    /// Needed after deserialization, since serde builds the struct
    /// without going through `try_new`.
    pub fn validate(&self) -> Result<()> {
        if self.mz.len() != self.intensity.len() {
            return Err(DetectionError::InvalidSpectrum(format!(
                "m/z and intensity arrays differ in length ({} vs {})",
                self.mz.len(),
                self.intensity.len()
            )));
        }
        if let Some(pos) = self.mz.iter().position(|x| x.is_nan()) {
            return Err(DetectionError::InvalidSpectrum(format!(
                "NaN m/z value at index {pos}"
            )));
        }
        if let Some(pos) = self.intensity.iter().position(|x| !x.is_finite()) {
            return Err(DetectionError::InvalidSpectrum(format!(
                "non-finite intensity {} at index {pos}",
                self.intensity[pos]
            )));
        }
        if let Some(pos) = self.mz.windows(2).position(|w| w[0] > w[1]) {
            return Err(DetectionError::InvalidSpectrum(format!(
                "m/z values are not sorted at index {}",
                pos + 1
            )));
        }
        Ok(())
    }

    pub fn mz_values(&self) -> &[f64] {
        &self.mz
    }

    pub fn intensity_values(&self) -> &[f64] {
        &self.intensity
    }

    pub fn iter(&self) -> impl Iterator<Item = Peak> + '_ {
        self.mz
            .iter()
            .zip(self.intensity.iter())
            .map(|(&mz, &intensity)| Peak { mz, intensity })
    }
}

impl SpectrumView for MzSpectrum {
    fn len(&self) -> usize {
        self.mz.len()
    }

    fn mz(&self, index: usize) -> f64 {
        self.mz[index]
    }

    fn intensity(&self, index: usize) -> f64 {
        self.intensity[index]
    }
}

impl TryFrom<Vec<Peak>> for MzSpectrum {
    type Error = DetectionError;

    fn try_from(value: Vec<Peak>) -> Result<Self> {
        let (mz, intensity) = value.into_iter().map(|p| (p.mz, p.intensity)).unzip();
        Self::try_new(mz, intensity)
    }
}
