mod alignment;
mod weights;

pub use alignment::{
    AlignedPair,
    align_signals,
};
pub use weights::Weights;

use mzdetect::{
    MzTolerance,
    Peak,
};
use serde::{
    Deserialize,
    Serialize,
};

/// What to do with signals that found no partner on the other side.
///
/// "Library" is the predicted side, "experimental" the measured side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnmatchedSignals {
    /// Both sides keep their unmatched signals, paired with a zero.
    KeepAllAndMatchToZero,
    /// Unmatched predicted signals count against the score, unmatched
    /// measured ones are ignored.
    KeepLibrarySignals,
    /// Unmatched measured signals count against the score, unmatched
    /// predicted ones are ignored.
    KeepExperimentalSignals,
    /// Only matched pairs are compared.
    RemoveAll,
}

impl HandleUnmatchedSignals {
    fn keeps(&self, pair: &AlignedPair) -> bool {
        match (pair.library.is_some(), pair.experimental.is_some()) {
            (true, true) => true,
            (true, false) => matches!(
                self,
                HandleUnmatchedSignals::KeepAllAndMatchToZero
                    | HandleUnmatchedSignals::KeepLibrarySignals
            ),
            (false, true) => matches!(
                self,
                HandleUnmatchedSignals::KeepAllAndMatchToZero
                    | HandleUnmatchedSignals::KeepExperimentalSignals
            ),
            (false, false) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityParameters {
    pub mz_tolerance: MzTolerance,
    pub weights: Weights,
    pub unmatched: HandleUnmatchedSignals,
    /// Fewer matched pairs than this gives no score.
    pub min_matched_signals: usize,
}

impl SimilarityParameters {
    pub fn new(mz_tolerance: MzTolerance, unmatched: HandleUnmatchedSignals) -> Self {
        Self {
            mz_tolerance,
            weights: Weights::SQRT,
            unmatched,
            min_matched_signals: 1,
        }
    }
}

/// Weighted cosine similarity between a predicted and a measured pattern.
///
/// Returns `None` when fewer than `min_matched_signals` (at least one)
/// signals overlap within tolerance, otherwise a value in [0, 1].
///
/// ```
/// use isorefine::similarity::{HandleUnmatchedSignals, SimilarityParameters, cosine_score};
/// use mzdetect::{MzTolerance, Peak};
///
/// let predicted = [Peak::new(181.0707, 100.0), Peak::new(182.0740, 6.9)];
/// let params = SimilarityParameters::new(
///     MzTolerance::Absolute(0.003),
///     HandleUnmatchedSignals::KeepLibrarySignals,
/// );
/// let score = cosine_score(&predicted, &predicted, &params).unwrap();
/// assert!((score - 1.0).abs() < 1e-12);
/// ```
pub fn cosine_score(
    library: &[Peak],
    experimental: &[Peak],
    params: &SimilarityParameters,
) -> Option<f64> {
    let aligned = align_signals(library, experimental, &params.mz_tolerance);
    let matched = aligned
        .iter()
        .filter(|p| p.library.is_some() && p.experimental.is_some())
        .count();
    if matched == 0 || matched < params.min_matched_signals {
        return None;
    }

    let mut dot = 0.0;
    let mut norm_library = 0.0;
    let mut norm_experimental = 0.0;
    for pair in aligned.iter().filter(|p| params.unmatched.keeps(p)) {
        let a = pair.library.map(|p| params.weights.apply(&p)).unwrap_or(0.0);
        let b = pair
            .experimental
            .map(|p| params.weights.apply(&p))
            .unwrap_or(0.0);
        dot += a * b;
        norm_library += a * a;
        norm_experimental += b * b;
    }
    if norm_library == 0.0 || norm_experimental == 0.0 {
        return Some(0.0);
    }
    let cosine = dot / (norm_library.sqrt() * norm_experimental.sqrt());
    if cosine.is_nan() {
        return None;
    }
    Some(cosine.clamp(0.0, 1.0))
}
