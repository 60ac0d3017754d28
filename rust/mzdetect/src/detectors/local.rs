use crate::errors::{
    DetectionError,
    Result,
};
use crate::models::{
    Peak,
    SpectrumView,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Every sample at or above the noise level is a peak.
///
/// Meant for spectra that were centroided upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CentroidConfig {
    pub noise_level: f64,
}

/// Samples that are local maxima and at or above the noise level.
///
/// A plateau reports its first sample: a sample must be strictly higher
/// than its left neighbour and at least as high as its right one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocalMaximumConfig {
    pub noise_level: f64,
}

fn validate_noise_level(noise_level: f64) -> Result<()> {
    if noise_level.is_nan() {
        return Err(DetectionError::invalid_parameter(
            "noise_level",
            "must not be NaN",
        ));
    }
    Ok(())
}

impl CentroidConfig {
    pub fn validate(&self) -> Result<()> {
        validate_noise_level(self.noise_level)
    }

    pub fn detect<S: SpectrumView + ?Sized>(&self, spectrum: &S) -> Result<Vec<Peak>> {
        self.validate()?;
        Ok((0..spectrum.len())
            .filter(|&i| spectrum.intensity(i) >= self.noise_level)
            .map(|i| Peak::new(spectrum.mz(i), spectrum.intensity(i)))
            .collect())
    }
}

impl LocalMaximumConfig {
    pub fn validate(&self) -> Result<()> {
        validate_noise_level(self.noise_level)
    }

    pub fn detect<S: SpectrumView + ?Sized>(&self, spectrum: &S) -> Result<Vec<Peak>> {
        self.validate()?;
        let n = spectrum.len();
        let mut out = Vec::new();
        for i in 0..n {
            let y = spectrum.intensity(i);
            if y < self.noise_level || y <= 0.0 {
                continue;
            }
            let left_ok = i == 0 || y > spectrum.intensity(i - 1);
            let right_ok = i + 1 == n || y >= spectrum.intensity(i + 1);
            if left_ok && right_ok {
                out.push(Peak::new(spectrum.mz(i), y));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MzSpectrum;

    #[test]
    fn test_local_maxima() {
        let spec = MzSpectrum::try_new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            vec![0.0, 5.0, 1.0, 3.0, 3.0, 2.0, 0.5, 9.0],
        )
        .unwrap();
        let out = LocalMaximumConfig { noise_level: 1.0 }.detect(&spec).unwrap();
        let mzs: Vec<f64> = out.iter().map(|p| p.mz).collect();
        assert_eq!(mzs, vec![2.0, 4.0, 8.0]);
    }

    #[test]
    fn test_centroid_noise_filter() {
        let spec = MzSpectrum::try_new(vec![1.0, 2.0, 3.0], vec![0.5, 5.0, 1.0]).unwrap();
        let out = CentroidConfig { noise_level: 1.0 }.detect(&spec).unwrap();
        assert_eq!(out, vec![Peak::new(2.0, 5.0), Peak::new(3.0, 1.0)]);
    }
}
