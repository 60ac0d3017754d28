use crate::isotopes::Resolution;
use mzdetect::{
    DetectionError,
    MzTolerance,
};
use serde::{
    Deserialize,
    Serialize,
};

fn default_library_weight() -> f64 {
    2.0
}

/// How predicted patterns are generated and compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionMode {
    /// One pattern, merged within the matching tolerance, compared while
    /// keeping unmatched predicted signals.
    #[default]
    Single,
    /// One pattern per resolution. Each is scored twice (unmatched signals
    /// of both sides kept, and only predicted ones kept), the two scores
    /// are combined as `(plain + w * library) / (1 + w)` and the best
    /// resolution wins.
    MultiResolution {
        #[serde(default = "Resolution::defaults")]
        resolutions: Vec<Resolution>,
        #[serde(default = "default_library_weight")]
        library_weight: f64,
    },
}

impl ResolutionMode {
    pub fn multi_resolution_defaults() -> Self {
        ResolutionMode::MultiResolution {
            resolutions: Resolution::defaults(),
            library_weight: default_library_weight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotopeRefinerConfig {
    pub mz_tolerance: MzTolerance,
    /// Minimum predicted signal intensity, in percent of the base peak.
    pub min_intensity: f64,
    /// Annotations scoring below this are removed.
    pub min_isotope_score: f64,
    #[serde(default)]
    pub resolution_mode: ResolutionMode,
}

impl Default for IsotopeRefinerConfig {
    fn default() -> Self {
        Self {
            mz_tolerance: MzTolerance::default(),
            min_intensity: 1.0,
            min_isotope_score: 0.5,
            resolution_mode: ResolutionMode::Single,
        }
    }
}

fn invalid(parameter: &'static str, reason: String) -> DetectionError {
    DetectionError::InvalidParameter { parameter, reason }
}

impl IsotopeRefinerConfig {
    pub fn validate(&self) -> Result<(), DetectionError> {
        self.mz_tolerance.validate()?;
        if !(0.0..=100.0).contains(&self.min_intensity) {
            return Err(invalid(
                "min_intensity",
                format!("must be within [0, 100], got {}", self.min_intensity),
            ));
        }
        if self.min_isotope_score.is_nan() {
            return Err(invalid("min_isotope_score", "must not be NaN".to_string()));
        }
        if let ResolutionMode::MultiResolution {
            resolutions,
            library_weight,
        } = &self.resolution_mode
        {
            if resolutions.is_empty() {
                return Err(invalid(
                    "resolutions",
                    "at least one resolution is needed".to_string(),
                ));
            }
            for resolution in resolutions {
                resolution
                    .validate()
                    .map_err(|e| invalid("resolutions", e.to_string()))?;
            }
            if !library_weight.is_finite() || *library_weight < 0.0 {
                return Err(invalid(
                    "library_weight",
                    format!("must be finite and non-negative, got {library_weight}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_resolution_defaults_from_json() {
        let config: IsotopeRefinerConfig = serde_json::from_str(
            r#"{
                "mz_tolerance": {"da_or_ppm": {"da": 0.002, "ppm": 5.0}},
                "min_intensity": 0.5,
                "min_isotope_score": 0.6,
                "resolution_mode": {"mode": "multi_resolution"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.resolution_mode,
            ResolutionMode::multi_resolution_defaults()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = IsotopeRefinerConfig {
            min_intensity: 150.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.min_intensity = 1.0;
        config.resolution_mode = ResolutionMode::MultiResolution {
            resolutions: vec![],
            library_weight: 2.0,
        };
        assert!(config.validate().is_err());
        config.resolution_mode = ResolutionMode::MultiResolution {
            resolutions: Resolution::defaults(),
            library_weight: -1.0,
        };
        assert!(config.validate().is_err());
    }
}
