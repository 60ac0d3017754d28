use crate::errors::{
    DetectionError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

/// m/z matching tolerance.
///
/// Example:
/// ```
/// use mzdetect::MzTolerance;
///
/// let tol = MzTolerance::AbsoluteOrPpm { da: 0.002, ppm: 5.0 };
/// // At m/z 1000 the ppm part (0.005) is wider than the absolute part.
/// assert!(tol.matches(1000.0, 1000.004));
/// assert!(!tol.matches(1000.0, 1000.006));
/// ```
///
/// Convention:
/// Tolerances are half-widths and are always symmetric, so a tolerance
/// of 0.01 Da around 100.0 means the closed range [99.99, 100.01].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MzTolerance {
    #[serde(rename = "da")]
    Absolute(f64),
    #[serde(rename = "ppm")]
    Ppm(f64),
    /// The larger of the two at any given m/z.
    #[serde(rename = "da_or_ppm")]
    AbsoluteOrPpm { da: f64, ppm: f64 },
}

impl Default for MzTolerance {
    fn default() -> Self {
        MzTolerance::AbsoluteOrPpm {
            da: 0.003,
            ppm: 10.0,
        }
    }
}

impl MzTolerance {
    /// Half-width of the tolerance window at `mz`, in m/z units.
    pub fn tolerance_at(&self, mz: f64) -> f64 {
        match self {
            MzTolerance::Absolute(da) => *da,
            MzTolerance::Ppm(ppm) => mz.abs() * ppm / 1e6,
            MzTolerance::AbsoluteOrPpm { da, ppm } => da.max(mz.abs() * ppm / 1e6),
        }
    }

    pub fn matches(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.tolerance_at(a).max(self.tolerance_at(b))
    }

    pub fn validate(&self) -> Result<()> {
        let ok = match self {
            MzTolerance::Absolute(x) | MzTolerance::Ppm(x) => x.is_finite() && *x >= 0.0,
            MzTolerance::AbsoluteOrPpm { da, ppm } => {
                da.is_finite() && ppm.is_finite() && *da >= 0.0 && *ppm >= 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(DetectionError::invalid_parameter(
                "mz_tolerance",
                format!("tolerances must be finite and non-negative, got {self:?}"),
            ))
        }
    }
}
