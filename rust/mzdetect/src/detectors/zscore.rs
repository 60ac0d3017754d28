use crate::errors::{
    DetectionError,
    Result,
};
use crate::models::{
    Peak,
    SpectrumView,
};
use crate::utils::window_stats::RollingWindowStats;
use serde::{
    Deserialize,
    Serialize,
};

/// Parameters of the adaptive z-score detector.
///
/// Each sample is compared against the mean (or median) and population
/// standard deviation of the preceding `lag` *filtered* values. Samples
/// that stand out by more than `threshold` spreads open a peak run, and
/// only contribute `influence` of their intensity to the filtered signal
/// so that a tall peak does not inflate the baseline it is compared with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZScoreConfig {
    pub lag: usize,
    pub threshold: f64,
    pub min_points_for_peak: usize,
    #[serde(default)]
    pub use_median: bool,
    pub influence: f64,
    #[serde(default)]
    pub noise_level: f64,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            lag: 5,
            threshold: 3.5,
            min_points_for_peak: 2,
            use_median: false,
            influence: 0.5,
            noise_level: 0.0,
        }
    }
}

impl ZScoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lag < 2 {
            return Err(DetectionError::invalid_parameter(
                "lag",
                format!("must be at least 2, got {}", self.lag),
            ));
        }
        if self.min_points_for_peak < 1 {
            return Err(DetectionError::invalid_parameter(
                "min_points_for_peak",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.influence) {
            return Err(DetectionError::invalid_parameter(
                "influence",
                format!("must be within [0, 1], got {}", self.influence),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(DetectionError::invalid_parameter(
                "threshold",
                "must be finite",
            ));
        }
        if self.noise_level.is_nan() {
            return Err(DetectionError::invalid_parameter(
                "noise_level",
                "must not be NaN",
            ));
        }
        Ok(())
    }

    pub fn detect<S: SpectrumView + ?Sized>(&self, spectrum: &S) -> Result<Vec<Peak>> {
        self.validate()?;
        let n = spectrum.len();
        if n < self.lag {
            return Err(DetectionError::invalid_parameter(
                "lag",
                format!("spectrum has {} points, fewer than the lag {}", n, self.lag),
            ));
        }

        let mut window = RollingWindowStats::new(self.lag);
        let mut last_filtered = 0.0;
        for i in 0..self.lag {
            let raw = spectrum.intensity(i);
            if raw.is_finite() {
                last_filtered = raw;
                window.push(raw);
            }
        }

        let mut peak_indices = Vec::new();
        let mut run_length = 0usize;
        for i in self.lag..n {
            let raw = spectrum.intensity(i);
            // Non-finite samples end the current run and never enter the window.
            if !raw.is_finite() {
                if run_length >= self.min_points_for_peak {
                    peak_indices.push(argmax_first(spectrum, i - run_length, i));
                }
                run_length = 0;
                continue;
            }
            if raw < self.noise_level && run_length == 0 {
                last_filtered = raw;
                window.push(raw);
                continue;
            }

            let center = if self.use_median {
                window.median()
            } else {
                window.mean()
            };
            let (Some(center), Some(spread)) = (center, window.std_dev()) else {
                last_filtered = raw;
                window.push(raw);
                continue;
            };

            let filtered = if exceeds_threshold(raw, center, spread, self.threshold) {
                run_length += 1;
                self.influence * raw + (1.0 - self.influence) * last_filtered
            } else {
                if run_length >= self.min_points_for_peak {
                    peak_indices.push(argmax_first(spectrum, i - run_length, i));
                }
                run_length = 0;
                raw
            };
            last_filtered = filtered;
            window.push(filtered);
        }

        Ok(peak_indices
            .into_iter()
            .map(|i| Peak::new(spectrum.mz(i), spectrum.intensity(i)))
            .collect())
    }
}

/// `(raw - center) / spread > threshold` with the zero-spread case resolved:
/// a flat window only lets through samples strictly above its center.
fn exceeds_threshold(raw: f64, center: f64, spread: f64, threshold: f64) -> bool {
    if spread == 0.0 {
        return raw > center;
    }
    (raw - center) / spread > threshold
}

/// Index of the largest intensity in `start..end`, first occurrence on ties.
fn argmax_first<S: SpectrumView + ?Sized>(spectrum: &S, start: usize, end: usize) -> usize {
    let mut best = start;
    let mut best_val = spectrum.intensity(start);
    for j in (start + 1)..end {
        let val = spectrum.intensity(j);
        if val > best_val {
            best = j;
            best_val = val;
        }
    }
    best
}
