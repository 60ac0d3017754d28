use crate::chemistry::MolecularFormula;
use crate::errors::PredictionError;
use crate::isotopes::pattern::IsotopePattern;
use crate::isotopes::prediction::ResolutionPatterns;
use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
    OnceLock,
    PoisonError,
};

type Slot<V> = Arc<OnceLock<Result<Arc<V>, PredictionError>>>;
type SlotMap<V> = Mutex<HashMap<MolecularFormula, Slot<V>>>;

/// Predicted patterns keyed by ionized formula.
///
/// Holds single patterns and per-resolution pattern maps in two separate
/// maps, since the same formula can be requested both ways. Each key is
/// computed at most once even when many threads ask for it at the same
/// time: the map lock is only held to fetch the key's slot, and the
/// prediction itself runs inside the slot's `OnceLock`. Failures are
/// cached as well.
///
/// The key does not include the prediction settings (minimum intensity,
/// merge tolerance, resolutions), so a cache should only be shared by
/// work using the same settings, typically one batch.
#[derive(Debug, Default)]
pub struct PredictionCache {
    single: SlotMap<IsotopePattern>,
    per_resolution: SlotMap<ResolutionPatterns>,
}

fn slot<V>(map: &SlotMap<V>, key: &MolecularFormula) -> Slot<V> {
    let mut guard = map.lock().unwrap_or_else(PoisonError::into_inner);
    guard.entry(key.clone()).or_default().clone()
}

fn map_len<V>(map: &SlotMap<V>) -> usize {
    map.lock().unwrap_or_else(PoisonError::into_inner).len()
}

impl PredictionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_predict(
        &self,
        formula: &MolecularFormula,
        predict: impl FnOnce() -> Result<IsotopePattern, PredictionError>,
    ) -> Result<Arc<IsotopePattern>, PredictionError> {
        slot(&self.single, formula)
            .get_or_init(|| predict().map(Arc::new))
            .clone()
    }

    pub fn get_or_predict_resolutions(
        &self,
        formula: &MolecularFormula,
        predict: impl FnOnce() -> Result<ResolutionPatterns, PredictionError>,
    ) -> Result<Arc<ResolutionPatterns>, PredictionError> {
        slot(&self.per_resolution, formula)
            .get_or_init(|| predict().map(Arc::new))
            .clone()
    }

    /// Number of formulas with a single-pattern entry.
    pub fn num_single(&self) -> usize {
        map_len(&self.single)
    }

    /// Number of formulas with a per-resolution entry.
    pub fn num_per_resolution(&self) -> usize {
        map_len(&self.per_resolution)
    }

    /// Total entries over both maps.
    pub fn len(&self) -> usize {
        self.num_single() + self.num_per_resolution()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
