use crate::chemistry::{
    IonType,
    MolecularFormula,
};
use crate::isotopes::MeasuredIsotopePattern;
use mzdetect::Peak;
use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;

/// Candidate identity for a feature, as produced by a database search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundAnnotation {
    pub compound_name: String,
    #[serde(default)]
    pub formula: Option<MolecularFormula>,
    #[serde(default)]
    pub ion_type: Option<IonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isotope_pattern_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precursor_mz: Option<f64>,
}

impl CompoundAnnotation {
    pub fn new(
        compound_name: impl Into<String>,
        formula: Option<MolecularFormula>,
        ion_type: Option<IonType>,
    ) -> Self {
        Self {
            compound_name: compound_name.into(),
            formula,
            ion_type,
            isotope_pattern_score: None,
            database_id: None,
            precursor_mz: None,
        }
    }

    /// Absolute charge used to pick measured signals, 1 without an ion type.
    pub fn abs_charge(&self) -> u32 {
        self.ion_type
            .as_ref()
            .map(|t| t.abs_charge())
            .unwrap_or(1)
            .max(1)
    }

    fn sortable_score(&self) -> Option<f32> {
        self.isotope_pattern_score.filter(|x| !x.is_nan())
    }
}

/// Scan that represents a feature (usually its MS1 apex scan).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepresentativeScan {
    #[serde(default)]
    pub scan_number: Option<u32>,
    /// Centroided signals of the scan, `None` if mass detection was not run.
    #[serde(default)]
    pub mass_list: Option<Vec<Peak>>,
}

/// One feature with its measured isotope data and candidate annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub id: u64,
    #[serde(default)]
    pub annotations: Vec<CompoundAnnotation>,
    #[serde(default)]
    pub isotope_pattern: Option<MeasuredIsotopePattern>,
    #[serde(default)]
    pub representative_scan: Option<RepresentativeScan>,
}

/// Sorts by isotope pattern score, best first. Missing and NaN scores go
/// last, and the sort is stable so ties keep their input order.
pub fn sort_by_isotope_score(annotations: &mut [CompoundAnnotation]) {
    annotations.sort_by(|a, b| match (a.sortable_score(), b.sortable_score()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
