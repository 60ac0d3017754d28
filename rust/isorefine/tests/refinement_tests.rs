use isorefine::isotopes::ResolutionPatterns;
use isorefine::{
    CompoundAnnotation,
    ConvolutionPredictor,
    FeatureRow,
    IsotopePattern,
    IsotopePatternPredictor,
    IsotopeRefiner,
    IsotopeRefinerConfig,
    MeasuredIsotopePattern,
    MolecularFormula,
    PredictionCache,
    PredictionError,
    RefinementError,
    RepresentativeScan,
    Resolution,
    ResolutionMode,
};
use mzdetect::{
    CancellationToken,
    MzTolerance,
    Peak,
};
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};

/// Forwards to the convolution predictor and counts the calls.
#[derive(Default)]
struct CountingPredictor {
    single_calls: AtomicUsize,
    resolution_calls: AtomicUsize,
}

impl IsotopePatternPredictor for CountingPredictor {
    fn predict(
        &self,
        formula: &MolecularFormula,
        min_intensity: f64,
        merge_tolerance: &MzTolerance,
    ) -> Result<IsotopePattern, PredictionError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        ConvolutionPredictor.predict(formula, min_intensity, merge_tolerance)
    }

    fn predict_resolutions(
        &self,
        formula: &MolecularFormula,
        min_intensity: f64,
        resolutions: &[Resolution],
    ) -> Result<ResolutionPatterns, PredictionError> {
        self.resolution_calls.fetch_add(1, Ordering::SeqCst);
        ConvolutionPredictor.predict_resolutions(formula, min_intensity, resolutions)
    }
}

fn annotation(name: &str, formula: &str, ion_type: &str) -> CompoundAnnotation {
    CompoundAnnotation::new(
        name,
        Some(formula.parse().unwrap()),
        Some(ion_type.parse().unwrap()),
    )
}

/// Pattern the refiner itself predicts for the annotation under `config`.
fn predicted_for(annotation: &CompoundAnnotation, config: &IsotopeRefinerConfig) -> IsotopePattern {
    let ionized = annotation
        .ion_type
        .as_ref()
        .unwrap()
        .ionize(annotation.formula.as_ref().unwrap())
        .unwrap();
    ConvolutionPredictor
        .predict(&ionized, config.min_intensity, &config.mz_tolerance)
        .unwrap()
}

fn row_with_pattern(id: u64, annotations: Vec<CompoundAnnotation>, pattern: IsotopePattern) -> FeatureRow {
    FeatureRow {
        id,
        annotations,
        isotope_pattern: Some(MeasuredIsotopePattern::Single(pattern)),
        representative_scan: None,
    }
}

fn names(row: &FeatureRow) -> Vec<&str> {
    row.annotations
        .iter()
        .map(|a| a.compound_name.as_str())
        .collect()
}

#[test]
fn test_good_match_is_kept_and_poor_match_removed() {
    // Test: An annotation whose prediction matches the measured envelope survives with a score in [0, 1]
    let config = IsotopeRefinerConfig::default();
    let glucose = annotation("glucose", "C6H12O6", "[M+H]+");
    let measured = predicted_for(&glucose, &config);
    let chlorinated = annotation("chloro", "C6H11ClO5", "[M+H]+");
    let doubly_charged = annotation("dimer-ion", "C6H12O6", "[M+2H]2+");

    let mut row = row_with_pattern(7, vec![chlorinated, glucose, doubly_charged], measured);
    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &ConvolutionPredictor, &cache).unwrap();
    let summary = refiner.refine_row(&mut row).unwrap();

    assert_eq!(names(&row), vec!["glucose"]);
    let score = row.annotations[0].isotope_pattern_score.unwrap();
    assert!((0.0..=1.0).contains(&score));
    assert!(score > 0.999);
    assert_eq!(summary.row_id, 7);
    assert_eq!(summary.retained, 1);
    assert_eq!(summary.below_threshold, 1);
    // No measured signals at charge 2 and no scan to fall back on.
    assert_eq!(summary.no_measured_signals, 1);
}

#[test]
fn test_retained_annotations_are_sorted_by_score() {
    // Test: Survivors are re-ranked best first, regardless of input order
    let config = IsotopeRefinerConfig::default();
    let glucose = annotation("glucose", "C6H12O6", "[M+H]+");
    let other = annotation("other", "C7H14O5", "[M+H]+");

    // Mass list holding the exact glucose envelope and a distorted envelope
    // for the other candidate.
    let mut mass_list = predicted_for(&glucose, &config).signals;
    let mut distorted = predicted_for(&other, &config).signals;
    distorted[1].intensity = 30.0;
    mass_list.extend(distorted);
    mass_list.sort_by(|a, b| a.mz.total_cmp(&b.mz));

    let mut row = FeatureRow {
        id: 1,
        annotations: vec![other, glucose],
        isotope_pattern: None,
        representative_scan: Some(RepresentativeScan {
            scan_number: Some(12),
            mass_list: Some(mass_list),
        }),
    };
    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &ConvolutionPredictor, &cache).unwrap();
    refiner.refine_row(&mut row).unwrap();

    assert_eq!(names(&row), vec!["glucose", "other"]);
    let scores: Vec<f32> = row
        .annotations
        .iter()
        .map(|a| a.isotope_pattern_score.unwrap())
        .collect();
    assert!(scores[0] > scores[1]);
    assert!(scores[1] > 0.5);
}

#[test]
fn test_missing_mass_list_fails_row_only() {
    // Test: A representative scan without a mass list fails that row and leaves it untouched
    let config = IsotopeRefinerConfig::default();
    let glucose = annotation("glucose", "C6H12O6", "[M+H]+");
    let measured = predicted_for(&glucose, &config);

    let broken = FeatureRow {
        id: 2,
        annotations: vec![glucose.clone()],
        isotope_pattern: Some(MeasuredIsotopePattern::Single(measured.clone())),
        representative_scan: Some(RepresentativeScan {
            scan_number: Some(99),
            mass_list: None,
        }),
    };
    let good = row_with_pattern(3, vec![glucose], measured);
    let mut rows = vec![broken.clone(), good];

    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &ConvolutionPredictor, &cache).unwrap();

    let mut single = broken.clone();
    let err = refiner.refine_row(&mut single).unwrap_err();
    assert!(matches!(
        err,
        RefinementError::MissingPrerequisiteData { row_id: 2, .. }
    ));
    assert_eq!(single, broken);

    let summary = refiner.refine_rows(&mut rows, None);
    assert_eq!(summary.rows_refined, 1);
    assert_eq!(summary.rows_failed.len(), 1);
    assert_eq!(summary.rows_failed[0].0, 2);
    assert_eq!(rows[0], broken);
    assert!(rows[1].annotations[0].isotope_pattern_score.is_some());
}

#[test]
fn test_prediction_is_shared_across_rows() {
    // Test: The same ionized formula is predicted once per batch, a different adduct adds one prediction
    let config = IsotopeRefinerConfig::default();
    let glucose_h = annotation("glucose", "C6H12O6", "[M+H]+");
    let fructose_h = annotation("fructose", "C6H12O6", "[M+H]+");
    let glucose_na = annotation("glucose", "C6H12O6", "[M+Na]+");
    let measured = predicted_for(&glucose_h, &config);

    let mut rows: Vec<FeatureRow> = (0..20)
        .map(|id| {
            row_with_pattern(
                id,
                vec![glucose_h.clone(), fructose_h.clone(), glucose_na.clone()],
                measured.clone(),
            )
        })
        .collect();

    let predictor = CountingPredictor::default();
    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &predictor, &cache).unwrap();
    let summary = refiner.refine_rows(&mut rows, None);

    assert_eq!(summary.rows_refined, 20);
    assert_eq!(predictor.single_calls.load(Ordering::SeqCst), 2);
    assert_eq!(predictor.resolution_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.num_single(), 2);
    for row in rows.iter() {
        // The sodium adduct envelope sits elsewhere and is removed.
        assert_eq!(names(row), vec!["glucose", "fructose"]);
    }
}

#[test]
fn test_multi_resolution_scoring() {
    // Test: Multi-resolution mode scores a perfectly measured envelope close to 1 and predicts once
    let width = Resolution::width(0.01);
    let config = IsotopeRefinerConfig {
        resolution_mode: ResolutionMode::multi_resolution_defaults(),
        ..Default::default()
    };
    let glucose = annotation("glucose", "C6H12O6", "[M+H]+");
    let ionized = glucose
        .ion_type
        .as_ref()
        .unwrap()
        .ionize(glucose.formula.as_ref().unwrap())
        .unwrap();
    let measured = ConvolutionPredictor
        .predict_resolutions(&ionized, config.min_intensity, &[width])
        .unwrap()
        .remove(&width)
        .unwrap();

    let mut rows = vec![
        row_with_pattern(1, vec![glucose.clone()], measured.clone()),
        row_with_pattern(2, vec![glucose], measured),
    ];
    let predictor = CountingPredictor::default();
    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &predictor, &cache).unwrap();
    let summary = refiner.refine_rows(&mut rows, None);

    assert_eq!(summary.annotations_retained, 2);
    assert_eq!(predictor.resolution_calls.load(Ordering::SeqCst), 1);
    assert_eq!(predictor.single_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.num_per_resolution(), 1);
    for row in rows.iter() {
        let score = row.annotations[0].isotope_pattern_score.unwrap();
        assert!(score > 0.999 && score <= 1.0);
    }
}

#[test]
fn test_unscorable_annotations_score_zero() {
    // Test: Annotations without formula get a zero score and only survive a zero threshold
    let glucose = annotation("glucose", "C6H12O6", "[M+H]+");
    let unknown = CompoundAnnotation::new("unknown", None, Some("[M+H]+".parse().unwrap()));
    let strict = IsotopeRefinerConfig::default();
    let measured = predicted_for(&glucose, &strict);

    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&strict, &ConvolutionPredictor, &cache).unwrap();
    let mut row = row_with_pattern(1, vec![unknown.clone(), glucose.clone()], measured.clone());
    let summary = refiner.refine_row(&mut row).unwrap();
    assert_eq!(names(&row), vec!["glucose"]);
    assert_eq!(summary.unscorable, 1);

    let lenient = IsotopeRefinerConfig {
        min_isotope_score: 0.0,
        ..Default::default()
    };
    let refiner = IsotopeRefiner::new(&lenient, &ConvolutionPredictor, &cache).unwrap();
    let mut row = row_with_pattern(1, vec![unknown, glucose], measured);
    refiner.refine_row(&mut row).unwrap();
    assert_eq!(names(&row), vec!["glucose", "unknown"]);
    assert_eq!(row.annotations[1].isotope_pattern_score, Some(0.0));
}

#[test]
fn test_overflowing_multimer_is_unscorable() {
    // Test: An ion type whose counts overflow is removed without failing the row
    let config = IsotopeRefinerConfig::default();
    let glucose = annotation("glucose", "C6H12O6", "[M+H]+");
    let huge = annotation("huge-multimer", "C100000", "[100000M+H]+");
    let measured = predicted_for(&glucose, &config);

    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &ConvolutionPredictor, &cache).unwrap();
    let mut row = row_with_pattern(3, vec![huge, glucose], measured);
    let summary = refiner.refine_row(&mut row).unwrap();
    assert_eq!(names(&row), vec!["glucose"]);
    assert_eq!(summary.unscorable, 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_cancelled_batch_leaves_rows_untouched() {
    // Test: A cancelled token stops the batch before rows are modified
    let config = IsotopeRefinerConfig::default();
    let glucose = annotation("glucose", "C6H12O6", "[M+H]+");
    let measured = predicted_for(&glucose, &config);
    let original = row_with_pattern(1, vec![glucose], measured);
    let mut rows = vec![original.clone(); 4];

    let token = CancellationToken::new();
    token.cancel();
    let cache = PredictionCache::new();
    let refiner = IsotopeRefiner::new(&config, &ConvolutionPredictor, &cache).unwrap();
    let summary = refiner.refine_rows(&mut rows, Some(&token));

    assert!(summary.cancelled);
    assert_eq!(summary.rows_refined, 0);
    assert!(rows.iter().all(|r| *r == original));
    assert!(cache.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    // Test: Building a refiner validates its configuration
    let config = IsotopeRefinerConfig {
        min_intensity: -1.0,
        ..Default::default()
    };
    let cache = PredictionCache::new();
    let result = IsotopeRefiner::new(&config, &ConvolutionPredictor, &cache);
    assert!(matches!(result, Err(RefinementError::InvalidConfig(_))));
}

#[test]
fn test_rows_from_json() {
    // Test: Rows deserialize from the JSON layout the command line tool reads
    let json = r#"[
        {
            "id": 5,
            "annotations": [
                {"compound_name": "glucose", "formula": "C6H12O6", "ion_type": "[M+H]+"},
                {"compound_name": "no formula"}
            ],
            "isotope_pattern": {
                "kind": "single",
                "signals": [
                    {"mz": 181.0707, "intensity": 100.0},
                    {"mz": 182.0740, "intensity": 6.9}
                ],
                "charge": 1
            },
            "representative_scan": {"scan_number": 3, "mass_list": [{"mz": 181.0707, "intensity": 1.0e5}]}
        }
    ]"#;
    let rows: Vec<FeatureRow> = serde_json::from_str(json).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].annotations.len(), 2);
    assert!(rows[0].annotations[1].formula.is_none());
    let pattern = rows[0].isotope_pattern.as_ref().unwrap();
    assert_eq!(pattern.by_abs_charge().len(), 1);
    assert_eq!(
        rows[0].representative_scan.as_ref().unwrap().mass_list.as_ref().unwrap()[0],
        Peak::new(181.0707, 1.0e5)
    );
}
