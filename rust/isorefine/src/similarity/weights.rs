use mzdetect::Peak;
use serde::{
    Deserialize,
    Serialize,
};

/// Signal weighting `mz^mz_exponent * intensity^intensity_exponent`
/// applied before the cosine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub mz_exponent: f64,
    pub intensity_exponent: f64,
}

impl Weights {
    pub const SQRT: Weights = Weights {
        mz_exponent: 0.0,
        intensity_exponent: 0.5,
    };
    pub const NONE: Weights = Weights {
        mz_exponent: 0.0,
        intensity_exponent: 1.0,
    };
    pub const MASSBANK: Weights = Weights {
        mz_exponent: 2.0,
        intensity_exponent: 0.5,
    };
    pub const NIST_GC: Weights = Weights {
        mz_exponent: 3.0,
        intensity_exponent: 0.6,
    };
    pub const NIST11: Weights = Weights {
        mz_exponent: 1.3,
        intensity_exponent: 0.53,
    };

    pub fn apply(&self, peak: &Peak) -> f64 {
        let intensity = peak.intensity.max(0.0).powf(self.intensity_exponent);
        if self.mz_exponent == 0.0 {
            intensity
        } else {
            peak.mz.powf(self.mz_exponent) * intensity
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::SQRT
    }
}
