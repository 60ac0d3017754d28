use mzdetect::mobility::{
    BinnedMobilogram,
    MobilityTrace,
    MobilityType,
};
use mzdetect::Peak;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BinningConfig {
    pub mobility_type: MobilityType,
    /// Raw mobility scans per bin. Picked from the axis when missing.
    #[serde(default)]
    pub bin_width: Option<usize>,
}

/// Traces belonging to one ion, binned into a single mobilogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceGroup {
    pub id: String,
    pub traces: Vec<MobilityTrace>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningInput {
    /// Mobility axes of the file's representative scans. The trace
    /// mobilities are used when empty.
    #[serde(default)]
    pub mobility_axes: Vec<Vec<f64>>,
    pub groups: Vec<TraceGroup>,
}

#[derive(Debug, Serialize)]
pub struct DetectionOutput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peaks: Option<Vec<Peak>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MobilogramOutput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobilogram: Option<BinnedMobilogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<(String, Result<BinnedMobilogram, E>)> for MobilogramOutput {
    fn from((id, result): (String, Result<BinnedMobilogram, E>)) -> Self {
        match result {
            Ok(mobilogram) => Self {
                id,
                mobilogram: Some(mobilogram),
                error: None,
            },
            Err(e) => Self {
                id,
                mobilogram: None,
                error: Some(e.to_string()),
            },
        }
    }
}
