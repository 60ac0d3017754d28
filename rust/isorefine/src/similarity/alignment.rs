use mzdetect::{
    MzTolerance,
    Peak,
};

/// A predicted ("library") signal and the measured signal it matched.
/// Either side is `None` for unmatched signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPair {
    pub library: Option<Peak>,
    pub experimental: Option<Peak>,
}

/// Greedy one-to-one matching of library to experimental signals.
///
/// Library signals are visited from most to least intense, and each takes
/// the closest not yet taken experimental signal within tolerance (the
/// more intense one on equal distance). Unmatched signals of both sides
/// are appended as half-empty pairs.
pub fn align_signals(
    library: &[Peak],
    experimental: &[Peak],
    tolerance: &MzTolerance,
) -> Vec<AlignedPair> {
    let mut library_order: Vec<usize> = (0..library.len()).collect();
    library_order.sort_by(|&a, &b| library[b].intensity.total_cmp(&library[a].intensity));

    let mut taken = vec![false; experimental.len()];
    let mut out = Vec::with_capacity(library.len() + experimental.len());
    for i in library_order {
        let lib = library[i];
        let mut best: Option<(usize, f64)> = None;
        for (j, exp) in experimental.iter().enumerate() {
            if taken[j] || !tolerance.matches(lib.mz, exp.mz) {
                continue;
            }
            let distance = (lib.mz - exp.mz).abs();
            let better = match best {
                None => true,
                Some((k, d)) => {
                    distance < d || (distance == d && exp.intensity > experimental[k].intensity)
                }
            };
            if better {
                best = Some((j, distance));
            }
        }
        match best {
            Some((j, _)) => {
                taken[j] = true;
                out.push(AlignedPair {
                    library: Some(lib),
                    experimental: Some(experimental[j]),
                });
            }
            None => out.push(AlignedPair {
                library: Some(lib),
                experimental: None,
            }),
        }
    }
    for (j, exp) in experimental.iter().enumerate() {
        if !taken[j] {
            out.push(AlignedPair {
                library: None,
                experimental: Some(*exp),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_intense_library_signal_claims_first() {
        let library = vec![Peak::new(100.000, 10.0), Peak::new(100.004, 100.0)];
        let experimental = vec![Peak::new(100.003, 50.0)];
        let aligned = align_signals(&library, &experimental, &MzTolerance::Absolute(0.005));
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[0].library.unwrap().intensity, 100.0);
        assert!(aligned[0].experimental.is_some());
        assert!(aligned[1].experimental.is_none());
    }

    #[test]
    fn test_unmatched_experimental_are_kept() {
        let library = vec![Peak::new(100.0, 10.0)];
        let experimental = vec![Peak::new(100.001, 5.0), Peak::new(200.0, 5.0)];
        let aligned = align_signals(&library, &experimental, &MzTolerance::Absolute(0.005));
        assert_eq!(aligned.len(), 2);
        assert!(aligned[1].library.is_none());
        assert_eq!(aligned[1].experimental.unwrap().mz, 200.0);
    }
}
