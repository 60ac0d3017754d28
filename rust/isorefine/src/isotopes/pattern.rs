use mzdetect::Peak;
use serde::{
    Deserialize,
    Serialize,
};

/// Isotope envelope: signals sorted by m/z, tagged with the charge.
///
/// Predicted patterns are normalized so the most intense signal is 100;
/// measured patterns keep whatever scale the instrument produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotopePattern {
    pub signals: Vec<Peak>,
    pub charge: i32,
    /// Ionized formula the pattern was predicted from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl IsotopePattern {
    pub fn new(mut signals: Vec<Peak>, charge: i32) -> Self {
        signals.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        Self {
            signals,
            charge,
            formula: None,
        }
    }

    pub fn abs_charge(&self) -> u32 {
        self.charge.unsigned_abs()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn base_peak(&self) -> Option<Peak> {
        self.signals
            .iter()
            .copied()
            .reduce(|best, p| if p.intensity > best.intensity { p } else { best })
    }
}

/// Measured pattern already split by charge state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiChargeIsotopePattern {
    pub patterns: Vec<IsotopePattern>,
}

/// Measured isotope signals attached to a feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasuredIsotopePattern {
    Single(IsotopePattern),
    MultiCharge(MultiChargeIsotopePattern),
}

impl MeasuredIsotopePattern {
    /// Sub-patterns keyed by absolute charge, the first one wins when a
    /// charge appears twice.
    pub fn by_abs_charge(&self) -> Vec<(u32, &IsotopePattern)> {
        let mut out: Vec<(u32, &IsotopePattern)> = Vec::new();
        let patterns: Vec<&IsotopePattern> = match self {
            MeasuredIsotopePattern::Single(p) => vec![p],
            MeasuredIsotopePattern::MultiCharge(m) => m.patterns.iter().collect(),
        };
        for pattern in patterns {
            let z = pattern.abs_charge();
            if !out.iter().any(|(k, _)| *k == z) {
                out.push((z, pattern));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_by_mz() {
        let p = IsotopePattern::new(vec![Peak::new(2.0, 10.0), Peak::new(1.0, 100.0)], 1);
        assert_eq!(p.signals[0].mz, 1.0);
        assert_eq!(p.base_peak(), Some(Peak::new(1.0, 100.0)));
    }

    #[test]
    fn test_multi_charge_lookup() {
        let measured = MeasuredIsotopePattern::MultiCharge(MultiChargeIsotopePattern {
            patterns: vec![
                IsotopePattern::new(vec![Peak::new(100.0, 1.0)], 1),
                IsotopePattern::new(vec![Peak::new(50.0, 1.0)], -2),
                IsotopePattern::new(vec![Peak::new(101.0, 1.0)], 1),
            ],
        });
        let by_charge = measured.by_abs_charge();
        assert_eq!(by_charge.len(), 2);
        assert_eq!(by_charge[0].0, 1);
        assert_eq!(by_charge[0].1.signals[0].mz, 100.0);
        assert_eq!(by_charge[1].0, 2);
    }
}
