use crate::chemistry::{
    ELECTRON_MASS,
    Element,
    MolecularFormula,
};
use crate::errors::PredictionError;
use crate::isotopes::pattern::IsotopePattern;
use crate::isotopes::resolution::Resolution;
use mzdetect::{
    MzTolerance,
    Peak,
};
use std::collections::BTreeMap;

/// Lines closer than this (in Da) are the same line for all practical purposes.
const FINE_MERGE_DA: f64 = 1e-6;
/// Lines below this fraction of the largest line are dropped while convolving.
const PRUNE_RELATIVE: f64 = 1e-10;
const MAX_LINES: usize = 1000;

pub type ResolutionPatterns = BTreeMap<Resolution, IsotopePattern>;

/// Source of theoretical isotope patterns for ionized formulas.
///
/// The refiner only talks to this trait, which is what makes the
/// prediction cache observable in tests.
pub trait IsotopePatternPredictor: Send + Sync {
    /// Pattern with lines merged within `merge_tolerance` of the base peak,
    /// normalized to 100 and without signals below `min_intensity`.
    fn predict(
        &self,
        formula: &MolecularFormula,
        min_intensity: f64,
        merge_tolerance: &MzTolerance,
    ) -> Result<IsotopePattern, PredictionError>;

    /// One pattern per resolution, see [`IsotopePatternPredictor::predict`].
    fn predict_resolutions(
        &self,
        formula: &MolecularFormula,
        min_intensity: f64,
        resolutions: &[Resolution],
    ) -> Result<ResolutionPatterns, PredictionError>;
}

/// Exact isotope fine structure from element-wise convolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvolutionPredictor;

impl IsotopePatternPredictor for ConvolutionPredictor {
    fn predict(
        &self,
        formula: &MolecularFormula,
        min_intensity: f64,
        merge_tolerance: &MzTolerance,
    ) -> Result<IsotopePattern, PredictionError> {
        require_charge(formula)?;
        validate_min_intensity(min_intensity)?;
        let lines = isotope_distribution(formula)?;
        Ok(build_pattern(&lines, formula, min_intensity, |mz| {
            merge_tolerance.tolerance_at(mz)
        }))
    }

    fn predict_resolutions(
        &self,
        formula: &MolecularFormula,
        min_intensity: f64,
        resolutions: &[Resolution],
    ) -> Result<ResolutionPatterns, PredictionError> {
        require_charge(formula)?;
        validate_min_intensity(min_intensity)?;
        for resolution in resolutions {
            resolution.validate()?;
        }
        let lines = isotope_distribution(formula)?;
        Ok(resolutions
            .iter()
            .map(|r| {
                let pattern = build_pattern(&lines, formula, min_intensity, |mz| r.width_at(mz));
                (*r, pattern)
            })
            .collect())
    }
}

fn validate_min_intensity(min_intensity: f64) -> Result<(), PredictionError> {
    if (0.0..=100.0).contains(&min_intensity) {
        Ok(())
    } else {
        Err(PredictionError::InvalidMinIntensity(min_intensity))
    }
}

/// One line of an isotope distribution: neutral mass and probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotopeLine {
    pub mass: f64,
    pub abundance: f64,
}

/// Fine structure isotope distribution of a formula, sorted by mass.
///
/// Masses are atomic masses, the electron correction for charged
/// formulas is applied when converting to m/z.
pub fn isotope_distribution(
    formula: &MolecularFormula,
) -> Result<Vec<IsotopeLine>, PredictionError> {
    if formula.is_empty() {
        return Err(PredictionError::EmptyFormula);
    }
    if formula.first_negative().is_some() {
        return Err(PredictionError::NegativeCount(formula.to_string()));
    }
    let mut out = vec![IsotopeLine {
        mass: 0.0,
        abundance: 1.0,
    }];
    for (element, count) in formula.elements() {
        let dist = element_distribution(element, count as u32);
        out = convolve(&out, &dist);
    }
    Ok(out)
}

/// Distribution of `count` atoms of `element`, by repeated squaring.
fn element_distribution(element: Element, count: u32) -> Vec<IsotopeLine> {
    let mut result = vec![IsotopeLine {
        mass: 0.0,
        abundance: 1.0,
    }];
    let mut base: Vec<IsotopeLine> = element
        .isotopes()
        .iter()
        .map(|i| IsotopeLine {
            mass: i.mass,
            abundance: i.abundance,
        })
        .collect();
    let mut n = count;
    while n > 0 {
        if n & 1 == 1 {
            result = convolve(&result, &base);
        }
        n >>= 1;
        if n > 0 {
            base = convolve(&base, &base);
        }
    }
    result
}

fn convolve(a: &[IsotopeLine], b: &[IsotopeLine]) -> Vec<IsotopeLine> {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for x in a {
        for y in b {
            out.push(IsotopeLine {
                mass: x.mass + y.mass,
                abundance: x.abundance * y.abundance,
            });
        }
    }
    compact(out)
}

/// Sorts by mass, fuses coincident lines and prunes negligible ones.
fn compact(mut lines: Vec<IsotopeLine>) -> Vec<IsotopeLine> {
    lines.sort_by(|a, b| a.mass.total_cmp(&b.mass));
    let mut merged: Vec<IsotopeLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.last_mut() {
            Some(last) if line.mass - last.mass <= FINE_MERGE_DA => {
                let total = last.abundance + line.abundance;
                if total > 0.0 {
                    last.mass = (last.mass * last.abundance + line.mass * line.abundance) / total;
                }
                last.abundance = total;
            }
            _ => merged.push(line),
        }
    }
    let max = merged.iter().map(|x| x.abundance).fold(0.0, f64::max);
    merged.retain(|x| x.abundance >= max * PRUNE_RELATIVE);
    if merged.len() > MAX_LINES {
        merged.sort_by(|a, b| b.abundance.total_cmp(&a.abundance));
        merged.truncate(MAX_LINES);
        merged.sort_by(|a, b| a.mass.total_cmp(&b.mass));
    }
    merged
}

/// Converts a distribution to an m/z pattern at the formula's charge,
/// merging lines closer than `width_at(base peak m/z)`.
fn build_pattern(
    lines: &[IsotopeLine],
    formula: &MolecularFormula,
    min_intensity: f64,
    width_at: impl Fn(f64) -> f64,
) -> IsotopePattern {
    let charge = formula.charge();
    let abs_charge = charge.unsigned_abs().max(1) as f64;
    let to_mz = |mass: f64| (mass - charge as f64 * ELECTRON_MASS) / abs_charge;

    let base_mz = lines
        .iter()
        .copied()
        .reduce(|a, b| if b.abundance > a.abundance { b } else { a })
        .map(|x| to_mz(x.mass))
        .unwrap_or(0.0);
    let width = width_at(base_mz).max(0.0);

    // (intensity sum, intensity weighted m/z sum)
    let mut clusters: Vec<(f64, f64)> = Vec::new();
    for line in lines {
        let mz = to_mz(line.mass);
        match clusters.last_mut() {
            Some((sum, weighted)) if *sum > 0.0 && mz - *weighted / *sum <= width => {
                *sum += line.abundance;
                *weighted += mz * line.abundance;
            }
            _ => clusters.push((line.abundance, mz * line.abundance)),
        }
    }

    let max = clusters.iter().map(|c| c.0).fold(0.0, f64::max);
    let signals: Vec<Peak> = clusters
        .into_iter()
        .filter(|(sum, _)| *sum > 0.0)
        .map(|(sum, weighted)| Peak::new(weighted / sum, sum / max * 100.0))
        .filter(|p| p.intensity >= min_intensity)
        .collect();

    IsotopePattern {
        signals,
        charge,
        formula: Some(formula.to_string()),
    }
}

/// Only ions have an m/z pattern.
fn require_charge(formula: &MolecularFormula) -> Result<(), PredictionError> {
    if formula.charge() == 0 {
        return Err(PredictionError::Uncharged(formula.to_string()));
    }
    Ok(())
}
