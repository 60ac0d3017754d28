use mzdetect::mobility::{
    BinnedMobilogram,
    MobilityTrace,
    MobilityType,
    MobilogramBinner,
};

fn tims_axis() -> Vec<f64> {
    (0..200).map(|i| 1.45 - i as f64 * 0.0012).collect()
}

fn pseudo_random_trace(axis: &[f64], seed: usize, start: usize, end: usize) -> MobilityTrace {
    let idx: Vec<usize> = (start..end).collect();
    MobilityTrace {
        mobilities: idx.iter().map(|&i| axis[i]).collect(),
        intensities: idx
            .iter()
            .map(|&i| ((i * 37 + seed * 11) % 23) as f64 * 10.0 + 1.0)
            .collect(),
    }
}

fn traces(axis: &[f64]) -> Vec<MobilityTrace> {
    vec![
        pseudo_random_trace(axis, 1, 20, 90),
        pseudo_random_trace(axis, 2, 50, 150),
        pseudo_random_trace(axis, 3, 100, 199),
    ]
}

fn raw_total(traces: &[MobilityTrace]) -> f64 {
    traces.iter().flat_map(|t| t.intensities.iter()).sum()
}

#[test]
fn test_binning_conserves_intensity() {
    // Test: Every sample inside the axis lands in some bin
    let axis = tims_axis();
    let traces = traces(&axis);
    let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 3).unwrap();
    let binned = binner.bin_traces(&traces).unwrap();
    assert!((binned.total_intensity() - raw_total(&traces)).abs() < 1e-6);
    assert!(binned.mobilities.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(binned.bin_width, 3);
}

#[test]
fn test_rebin_same_width_is_idempotent() {
    // Test: bin(bin(x, w), w) has the same total intensity as bin(x, w)
    let axis = tims_axis();
    let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 4).unwrap();
    let once = binner.bin_traces(&traces(&axis)).unwrap();
    let twice = binner.rebin(&once).unwrap();
    assert!((once.total_intensity() - twice.total_intensity()).abs() < 1e-9);
    assert_eq!(once.len(), twice.len());
}

#[test]
fn test_rebin_coarser_conserves_intensity() {
    // Test: Coarsening to multiples and non multiples keeps the total
    let axis = tims_axis();
    let fine = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 2).unwrap();
    let binned = fine.bin_traces(&traces(&axis)).unwrap();
    for width in [3, 4, 7, 10] {
        let coarse = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, width).unwrap();
        let rebinned = coarse.rebin(&binned).unwrap();
        assert!(
            (rebinned.total_intensity() - binned.total_intensity()).abs() < 1e-6,
            "Width {} changed the total from {} to {}",
            width,
            binned.total_intensity(),
            rebinned.total_intensity()
        );
        assert!(rebinned.len() <= binned.len());
    }
}

#[test]
fn test_ascending_and_descending_traces_agree() {
    // Test: The same trace in both directions bins identically
    let axis = tims_axis();
    let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 5).unwrap();
    let trace = pseudo_random_trace(&axis, 7, 10, 120);
    let reversed = MobilityTrace {
        mobilities: trace.mobilities.iter().rev().copied().collect(),
        intensities: trace.intensities.iter().rev().copied().collect(),
    };
    let a = binner.bin_traces(&[trace]).unwrap();
    let b = binner.bin_traces(&[reversed]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_axes_from_several_frames_are_merged() {
    // Test: Overlapping axes collapse to their distinct values
    let axis = tims_axis();
    let first_half = &axis[..120];
    let second_half = &axis[80..];
    let merged =
        MobilogramBinner::new([first_half, second_half], MobilityType::Tims, 1).unwrap();
    let single = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 1).unwrap();
    assert_eq!(merged.num_bins(), single.num_bins());
    assert_eq!(merged.bin_centers(), single.bin_centers());
}

#[test]
fn test_mismatched_trace_is_an_error() {
    // Test: A trace with more mobilities than intensities is rejected
    let axis = tims_axis();
    let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 1).unwrap();
    let bad = MobilityTrace {
        mobilities: axis[..3].to_vec(),
        intensities: vec![1.0],
    };
    assert!(binner.bin_traces(&[bad]).is_err());
    let empty = BinnedMobilogram::default();
    assert!(binner.rebin(&empty).unwrap().is_empty());
}
