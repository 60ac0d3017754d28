use super::annotation::{
    CompoundAnnotation,
    FeatureRow,
    sort_by_isotope_score,
};
use super::config::{
    IsotopeRefinerConfig,
    ResolutionMode,
};
use crate::chemistry::MolecularFormula;
use crate::errors::{
    RefinementError,
    Result,
    UnscorableReason,
};
use crate::isotopes::{
    IsotopePattern,
    IsotopePatternPredictor,
    PredictionCache,
    Resolution,
};
use crate::similarity::{
    HandleUnmatchedSignals,
    SimilarityParameters,
    cosine_score,
};
use mzdetect::{
    CancellationToken,
    MzTolerance,
    Peak,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{
    debug,
    info,
    instrument,
    warn,
};

/// What happened to the annotations of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowSummary {
    pub row_id: u64,
    pub retained: usize,
    /// Scored, but below the minimum isotope score.
    pub below_threshold: usize,
    /// Dropped because the row had no measured signals for their charge.
    pub no_measured_signals: usize,
    /// Scored as zero because scoring failed.
    pub unscorable: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub rows_refined: usize,
    pub rows_failed: Vec<(u64, RefinementError)>,
    pub cancelled: bool,
    pub annotations_retained: usize,
    pub annotations_removed: usize,
}

impl BatchSummary {
    fn add_row(&mut self, row: &RowSummary) {
        self.rows_refined += 1;
        self.annotations_retained += row.retained;
        self.annotations_removed +=
            row.below_threshold + row.no_measured_signals + row.unscorable;
    }

    /// Folds the summary of another batch into this one.
    pub fn merge(&mut self, other: BatchSummary) {
        self.rows_refined += other.rows_refined;
        self.rows_failed.extend(other.rows_failed);
        self.cancelled |= other.cancelled;
        self.annotations_retained += other.annotations_retained;
        self.annotations_removed += other.annotations_removed;
    }
}

/// Measured signals of a row, looked up by absolute charge.
struct MeasuredSignals<'r> {
    by_charge: Vec<(u32, &'r IsotopePattern)>,
    mass_list: Option<&'r [Peak]>,
}

impl<'r> MeasuredSignals<'r> {
    fn from_row(row: &'r FeatureRow) -> Result<Self> {
        let by_charge = row
            .isotope_pattern
            .as_ref()
            .map(|p| p.by_abs_charge())
            .unwrap_or_default();
        let mass_list = match &row.representative_scan {
            None => None,
            Some(scan) => match &scan.mass_list {
                Some(peaks) => Some(peaks.as_slice()),
                None => {
                    let context = match scan.scan_number {
                        Some(n) => format!("representative scan #{n} has no mass list"),
                        None => "representative scan has no mass list".to_string(),
                    };
                    return Err(RefinementError::MissingPrerequisiteData {
                        row_id: row.id,
                        context,
                    });
                }
            },
        };
        Ok(Self {
            by_charge,
            mass_list,
        })
    }

    /// Isotope pattern for the charge, or the whole mass list when no
    /// pattern was found at that charge.
    fn for_charge(&self, abs_charge: u32) -> Option<&'r [Peak]> {
        self.by_charge
            .iter()
            .find(|(z, _)| *z == abs_charge)
            .map(|(_, p)| p.signals.as_slice())
            .or(self.mass_list)
    }
}

/// Scores database annotations against measured isotope patterns and
/// removes the ones that do not fit.
///
/// The predictor is only called through the shared [`PredictionCache`], so
/// rows with the same ionized formula reuse one prediction.
pub struct IsotopeRefiner<'a, P: IsotopePatternPredictor + ?Sized> {
    config: &'a IsotopeRefinerConfig,
    predictor: &'a P,
    cache: &'a PredictionCache,
}

impl<'a, P: IsotopePatternPredictor + ?Sized> IsotopeRefiner<'a, P> {
    pub fn new(
        config: &'a IsotopeRefinerConfig,
        predictor: &'a P,
        cache: &'a PredictionCache,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            predictor,
            cache,
        })
    }

    pub fn config(&self) -> &IsotopeRefinerConfig {
        self.config
    }

    /// Scores every annotation of the row, keeps the ones reaching the
    /// minimum score and replaces the row's list with them, best first.
    ///
    /// A representative scan without a mass list is an error and leaves
    /// the row untouched.
    pub fn refine_row(&self, row: &mut FeatureRow) -> Result<RowSummary> {
        let mut summary = RowSummary {
            row_id: row.id,
            ..Default::default()
        };
        let mut retained = {
            let measured = MeasuredSignals::from_row(row)?;
            let mut retained = Vec::with_capacity(row.annotations.len());
            for annotation in row.annotations.iter() {
                let abs_charge = annotation.abs_charge();
                let Some(signals) = measured.for_charge(abs_charge) else {
                    debug!(
                        "Row {}: no measured signals for charge {}, dropping {}",
                        row.id, abs_charge, annotation.compound_name
                    );
                    summary.no_measured_signals += 1;
                    continue;
                };

                let score = match self.score_annotation(annotation, signals) {
                    Ok(score) => Some(score),
                    Err(UnscorableReason::MissingFormula | UnscorableReason::MissingIonType) => {
                        None
                    }
                    Err(reason) => {
                        warn!(
                            "Row {}: cannot score isotope pattern of {}: {}",
                            row.id, annotation.compound_name, reason
                        );
                        None
                    }
                };

                let value = score.unwrap_or(0.0);
                if value >= self.config.min_isotope_score {
                    let mut annotation = annotation.clone();
                    annotation.isotope_pattern_score = Some(value as f32);
                    retained.push(annotation);
                } else if score.is_some() {
                    summary.below_threshold += 1;
                } else {
                    summary.unscorable += 1;
                }
            }
            retained
        };
        sort_by_isotope_score(&mut retained);
        summary.retained = retained.len();
        row.annotations = retained;
        Ok(summary)
    }

    /// Refines all rows in parallel. Failing rows are reported in the
    /// summary and left as they were.
    #[instrument(skip_all, fields(num_rows = rows.len()))]
    pub fn refine_rows(
        &self,
        rows: &mut [FeatureRow],
        cancel: Option<&CancellationToken>,
    ) -> BatchSummary {
        let results: Vec<(u64, Result<RowSummary>)> = rows
            .par_iter_mut()
            .map(|row| {
                if cancel.is_some_and(|c| c.is_cancelled()) {
                    return (row.id, Err(RefinementError::Cancelled));
                }
                (row.id, self.refine_row(row))
            })
            .collect();

        let mut summary = BatchSummary::default();
        for (row_id, result) in results {
            match result {
                Ok(row) => summary.add_row(&row),
                Err(RefinementError::Cancelled) => summary.cancelled = true,
                Err(e) => {
                    warn!("Skipping row {}: {}", row_id, e);
                    summary.rows_failed.push((row_id, e));
                }
            }
        }
        info!(
            "Refined {} rows ({} failed), kept {} annotations, removed {}",
            summary.rows_refined,
            summary.rows_failed.len(),
            summary.annotations_retained,
            summary.annotations_removed,
        );
        if summary.cancelled {
            warn!("Refinement was cancelled before all rows were processed");
        }
        summary
    }

    fn score_annotation(
        &self,
        annotation: &CompoundAnnotation,
        measured: &[Peak],
    ) -> std::result::Result<f64, UnscorableReason> {
        let formula = annotation
            .formula
            .as_ref()
            .ok_or(UnscorableReason::MissingFormula)?;
        let ion_type = annotation
            .ion_type
            .as_ref()
            .ok_or(UnscorableReason::MissingIonType)?;
        let ionized = ion_type.ionize(formula)?;

        match &self.config.resolution_mode {
            ResolutionMode::Single => self.score_single(&ionized, measured),
            ResolutionMode::MultiResolution {
                resolutions,
                library_weight,
            } => self.score_resolutions(&ionized, measured, resolutions, *library_weight),
        }
    }

    fn score_single(
        &self,
        ionized: &MolecularFormula,
        measured: &[Peak],
    ) -> std::result::Result<f64, UnscorableReason> {
        let tolerance = self.config.mz_tolerance;
        let predicted = self.cache.get_or_predict(ionized, || {
            self.predictor
                .predict(ionized, self.config.min_intensity, &tolerance)
        })?;
        let params =
            SimilarityParameters::new(tolerance, HandleUnmatchedSignals::KeepLibrarySignals);
        Ok(cosine_score(&predicted.signals, measured, &params).unwrap_or(0.0))
    }

    /// Best combined score over all resolutions, 0 if none overlaps.
    fn score_resolutions(
        &self,
        ionized: &MolecularFormula,
        measured: &[Peak],
        resolutions: &[Resolution],
        library_weight: f64,
    ) -> std::result::Result<f64, UnscorableReason> {
        let patterns = self.cache.get_or_predict_resolutions(ionized, || {
            self.predictor
                .predict_resolutions(ionized, self.config.min_intensity, resolutions)
        })?;

        let mut best = 0.0;
        let mut best_resolution = None;
        for resolution in resolutions {
            let Some(predicted) = patterns.get(resolution) else {
                debug!("No predicted pattern of {} at {:?}", ionized, resolution);
                continue;
            };
            let Some(base) = predicted.base_peak() else {
                continue;
            };
            let tolerance = resolution.tolerance_at(base.mz);
            let Some(score) = combined_score(&predicted.signals, measured, tolerance, library_weight)
            else {
                continue;
            };
            if score >= best {
                best = score;
                best_resolution = Some(*resolution);
            }
        }
        debug!(
            "Best isotope score of {} is {:.3} at {:?}",
            ionized, best, best_resolution
        );
        Ok(best)
    }
}

/// `(plain + w * library) / (1 + w)`, where `plain` keeps unmatched signals
/// of both sides and `library` keeps only unmatched predicted signals.
fn combined_score(
    predicted: &[Peak],
    measured: &[Peak],
    tolerance: MzTolerance,
    library_weight: f64,
) -> Option<f64> {
    let plain = cosine_score(
        predicted,
        measured,
        &SimilarityParameters::new(tolerance, HandleUnmatchedSignals::KeepAllAndMatchToZero),
    )?;
    let library = cosine_score(
        predicted,
        measured,
        &SimilarityParameters::new(tolerance, HandleUnmatchedSignals::KeepLibrarySignals),
    )?;
    Some((plain + library_weight * library) / (1.0 + library_weight))
}
