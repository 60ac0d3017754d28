use crate::errors::PredictionError;
use mzdetect::MzTolerance;
use ordered_float::OrderedFloat;
use serde::{
    Deserialize,
    Serialize,
};

/// Instrument resolution used to merge isotope lines.
///
/// Either a fixed m/z width, or a resolving power `R` for which the
/// width at `mz` is `mz / R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Width(OrderedFloat<f64>),
    ResolvingPower(OrderedFloat<f64>),
}

/// Widths scored by default in multi-resolution mode, coarse enough at the
/// top end to merge the fine structure of most small molecules.
pub const DEFAULT_RESOLUTION_WIDTHS: [f64; 4] = [0.0001, 0.001, 0.01, 0.1];

impl Resolution {
    pub fn width(width: f64) -> Self {
        Resolution::Width(OrderedFloat(width))
    }

    pub fn resolving_power(power: f64) -> Self {
        Resolution::ResolvingPower(OrderedFloat(power))
    }

    pub fn defaults() -> Vec<Resolution> {
        DEFAULT_RESOLUTION_WIDTHS
            .iter()
            .map(|w| Resolution::width(*w))
            .collect()
    }

    pub fn validate(&self) -> Result<(), PredictionError> {
        let value = match self {
            Resolution::Width(x) | Resolution::ResolvingPower(x) => x.0,
        };
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(PredictionError::InvalidResolution(format!("{self:?}")))
        }
    }

    /// m/z width within which lines cannot be told apart.
    pub fn width_at(&self, mz: f64) -> f64 {
        match self {
            Resolution::Width(w) => w.0,
            Resolution::ResolvingPower(r) => mz.abs() / r.0,
        }
    }

    pub fn ppm_at(&self, mz: f64) -> f64 {
        self.width_at(mz) / mz.abs() * 1e6
    }

    /// Matching tolerance equivalent to this resolution around `mz`.
    pub fn tolerance_at(&self, mz: f64) -> MzTolerance {
        MzTolerance::AbsoluteOrPpm {
            da: self.width_at(mz),
            ppm: self.ppm_at(mz),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_and_ppm() {
        let r = Resolution::resolving_power(100_000.0);
        assert!((r.width_at(500.0) - 0.005).abs() < 1e-12);
        assert!((r.ppm_at(500.0) - 10.0).abs() < 1e-9);

        let w = Resolution::width(0.01);
        assert_eq!(w.width_at(200.0), 0.01);
        assert!((w.ppm_at(200.0) - 50.0).abs() < 1e-9);
        assert!((w.tolerance_at(200.0).tolerance_at(200.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_resolutions() {
        assert!(Resolution::width(0.0).validate().is_err());
        assert!(Resolution::resolving_power(-1.0).validate().is_err());
        assert!(Resolution::width(f64::NAN).validate().is_err());
        assert!(Resolution::width(0.001).validate().is_ok());
    }

    #[test]
    fn test_serde_format() {
        let r: Resolution = serde_json::from_str(r#"{"width": 0.001}"#).unwrap();
        assert_eq!(r, Resolution::width(0.001));
        let r: Resolution = serde_json::from_str(r#"{"resolving_power": 60000.0}"#).unwrap();
        assert_eq!(r, Resolution::resolving_power(60000.0));
    }
}
