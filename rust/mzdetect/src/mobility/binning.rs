use crate::errors::{
    DetectionError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    warn,
};

/// Slack added to the bin edges so that a value sitting exactly on the
/// last member of a bin is not lost to rounding.
pub const MOBILITY_EPSILON: f64 = 1e-5;

/// Bins narrower than this (in 1/K0) are not worth having on TIMS data.
const TIMS_MIN_BIN_SPAN: f64 = 0.0008;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MobilityType {
    Tims,
    DriftTube,
    TravelingWave,
    Faims,
    #[default]
    None,
}

impl MobilityType {
    /// TIMS acquires mobility scans from high to low mobility.
    pub fn records_descending(&self) -> bool {
        matches!(self, MobilityType::Tims)
    }
}

/// Raw intensity over mobility for one ion, in acquisition order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MobilityTrace {
    pub mobilities: Vec<f64>,
    pub intensities: Vec<f64>,
}

/// Binned mobilogram, always sorted by ascending mobility.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BinnedMobilogram {
    pub mobilities: Vec<f64>,
    pub intensities: Vec<f64>,
    /// Number of raw mobility scans per bin this was produced with.
    pub bin_width: usize,
}

impl BinnedMobilogram {
    pub fn len(&self) -> usize {
        self.mobilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobilities.is_empty()
    }

    pub fn total_intensity(&self) -> f64 {
        self.intensities.iter().sum()
    }
}

/// Bin layout over the mobility axis of one raw data file.
///
/// The distinct mobility values of the file are sorted and grouped
/// `bin_width` at a time. A value `x` belongs to bin `k` when
/// `upper[k - 1] < x <= upper[k]`, where `upper[k]` is the last member
/// of the group plus [`MOBILITY_EPSILON`].
///
/// ```
/// use mzdetect::mobility::{MobilogramBinner, MobilityTrace, MobilityType};
///
/// let axis = vec![1.0, 0.99, 0.98, 0.97];
/// let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 2).unwrap();
/// let trace = MobilityTrace {
///     mobilities: axis.clone(),
///     intensities: vec![1.0, 2.0, 3.0, 4.0],
/// };
/// let out = binner.bin_traces(&[trace]).unwrap();
/// assert_eq!(out.intensities, vec![7.0, 3.0]);
/// ```
#[derive(Debug, Clone)]
pub struct MobilogramBinner {
    bin_width: usize,
    mobility_type: MobilityType,
    centers: Vec<f64>,
    upper_edges: Vec<f64>,
    lower_limit: f64,
}

impl MobilogramBinner {
    /// Builds the bins from the mobility axes of the representative
    /// frames/scans of a file, in any order and direction.
    pub fn new<'a>(
        mobility_axes: impl IntoIterator<Item = &'a [f64]>,
        mobility_type: MobilityType,
        bin_width: usize,
    ) -> Result<Self> {
        if bin_width < 1 {
            return Err(DetectionError::invalid_parameter(
                "bin_width",
                "must be at least 1",
            ));
        }

        let mut values: Vec<f64> = mobility_axes
            .into_iter()
            .flat_map(|axis| axis.iter().copied())
            .filter(|x| x.is_finite())
            .collect();
        values.sort_unstable_by(|a, b| a.total_cmp(b));
        values.dedup();
        if values.is_empty() {
            return Err(DetectionError::missing_data(
                "no mobility values to build mobilogram bins from",
            ));
        }

        let mut centers = Vec::with_capacity(values.len() / bin_width + 1);
        let mut upper_edges = Vec::with_capacity(values.len() / bin_width + 1);
        for group in values.chunks(bin_width) {
            let center = group.iter().sum::<f64>() / group.len() as f64;
            centers.push(center);
            // chunks never yields empty groups
            upper_edges.push(group[group.len() - 1] + MOBILITY_EPSILON);
        }

        let out = Self {
            bin_width,
            mobility_type,
            centers,
            upper_edges,
            lower_limit: values[0] - MOBILITY_EPSILON,
        };
        debug!(
            "Mobilogram bin width set to {} scans (approximately {} per bin)",
            bin_width,
            out.approximate_bin_size()
        );
        Ok(out)
    }

    pub fn bin_width(&self) -> usize {
        self.bin_width
    }

    pub fn mobility_type(&self) -> MobilityType {
        self.mobility_type
    }

    pub fn num_bins(&self) -> usize {
        self.centers.len()
    }

    pub fn bin_centers(&self) -> &[f64] {
        &self.centers
    }

    /// Mean distance between neighbouring bin centers, in mobility units.
    pub fn approximate_bin_size(&self) -> f64 {
        match (self.centers.first(), self.centers.last()) {
            (Some(first), Some(last)) if self.centers.len() > 1 => {
                (last - first) / (self.centers.len() - 1) as f64
            }
            _ => 0.0,
        }
    }

    /// Sums all traces into one binned mobilogram.
    pub fn bin_traces(&self, traces: &[MobilityTrace]) -> Result<BinnedMobilogram> {
        let mut sums = vec![0.0; self.centers.len()];
        let mut total = 0;
        let mut assigned = 0;
        for (i, trace) in traces.iter().enumerate() {
            if trace.mobilities.len() != trace.intensities.len() {
                return Err(DetectionError::InvalidTrace(format!(
                    "trace {} has {} mobilities but {} intensities",
                    i,
                    trace.mobilities.len(),
                    trace.intensities.len()
                )));
            }
            let trace_assigned = self.accumulate(&trace.mobilities, &trace.intensities, &mut sums);
            if trace_assigned != trace.mobilities.len() {
                debug!(
                    "Trace {}: assigned {}/{} mobility scans to bins",
                    i,
                    trace_assigned,
                    trace.mobilities.len()
                );
            }
            total += trace.mobilities.len();
            assigned += trace_assigned;
        }
        if assigned != total {
            warn!(
                "Assigned {}/{} mobility scans to bins, the rest fell outside the binned range",
                assigned, total
            );
        }
        Ok(self.trimmed(sums))
    }

    /// Re-bins a mobilogram produced with an equal or finer bin width.
    ///
    /// Going to a finer width than the input was binned with would only
    /// produce empty bins, and is rejected.
    pub fn rebin(&self, mobilogram: &BinnedMobilogram) -> Result<BinnedMobilogram> {
        if mobilogram.bin_width > self.bin_width {
            return Err(DetectionError::invalid_parameter(
                "bin_width",
                format!(
                    "cannot re-bin a mobilogram binned with width {} at the finer width {}",
                    mobilogram.bin_width, self.bin_width
                ),
            ));
        }
        if mobilogram.mobilities.len() != mobilogram.intensities.len() {
            return Err(DetectionError::InvalidTrace(
                "mobilogram mobilities and intensities differ in length".to_string(),
            ));
        }
        let mut sums = vec![0.0; self.centers.len()];
        let assigned = self.accumulate(&mobilogram.mobilities, &mobilogram.intensities, &mut sums);
        if assigned != mobilogram.len() {
            warn!(
                "Assigned {}/{} bins while re-binning the mobilogram",
                assigned,
                mobilogram.len()
            );
        }
        Ok(self.trimmed(sums))
    }

    fn is_descending(&self, mobilities: &[f64]) -> bool {
        match (mobilities.first(), mobilities.last()) {
            (Some(first), Some(last)) if mobilities.len() > 1 => first > last,
            _ => self.mobility_type.records_descending(),
        }
    }

    /// Adds one trace into `sums`, returns how many samples found a bin.
    fn accumulate(&self, mobilities: &[f64], intensities: &[f64], sums: &mut [f64]) -> usize {
        let descending = self.is_descending(mobilities);
        let n = mobilities.len();
        let mut bin = 0;
        let mut assigned = 0;
        for k in 0..n {
            // Always walk from low to high mobility.
            let i = if descending { n - 1 - k } else { k };
            let mobility = mobilities[i];
            if mobility <= self.lower_limit {
                continue;
            }
            while bin < self.upper_edges.len() && mobility > self.upper_edges[bin] {
                bin += 1;
            }
            if bin == self.upper_edges.len() {
                break;
            }
            sums[bin] += intensities[i];
            assigned += 1;
        }
        assigned
    }

    /// Drops empty bins at both ends, keeping one zero bin of padding on
    /// each side of the non-zero region.
    fn trimmed(&self, sums: Vec<f64>) -> BinnedMobilogram {
        let first = sums.iter().position(|x| *x != 0.0);
        let last = sums.iter().rposition(|x| *x != 0.0);
        let (Some(first), Some(last)) = (first, last) else {
            return BinnedMobilogram {
                bin_width: self.bin_width,
                ..Default::default()
            };
        };
        let start = first.saturating_sub(1);
        let end = (last + 1).min(sums.len() - 1);
        BinnedMobilogram {
            mobilities: self.centers[start..=end].to_vec(),
            intensities: sums[start..=end].to_vec(),
            bin_width: self.bin_width,
        }
    }
}

/// Bin width (in raw mobility scans) suited to the instrument.
///
/// Only TIMS data is binned by default, since its scans are much finer
/// than the mobility resolution of the device. `axis` is the mobility
/// axis of a representative frame.
pub fn recommended_bin_width(mobility_type: MobilityType, axis: &[f64]) -> usize {
    match mobility_type {
        MobilityType::Tims => {
            if axis.len() < 2 {
                return 1;
            }
            let index = (axis.len() / 2).min(axis.len() - 2);
            let delta = (axis[index] - axis[index + 1]).abs();
            if delta > 0.0 {
                (TIMS_MIN_BIN_SPAN / delta).max(1.0) as usize
            } else {
                1
            }
        }
        MobilityType::DriftTube
        | MobilityType::TravelingWave
        | MobilityType::Faims
        | MobilityType::None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tims_axis(n: usize) -> Vec<f64> {
        // Descending, like TIMS mobility scans.
        (0..n).map(|i| 1.4 - i as f64 * 0.001).collect()
    }

    #[test]
    fn test_bin_layout() {
        let axis = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::DriftTube, 2).unwrap();
        assert_eq!(binner.num_bins(), 3);
        let centers = binner.bin_centers();
        assert!((centers[0] - 0.15).abs() < 1e-12);
        assert!((centers[1] - 0.35).abs() < 1e-12);
        assert!((centers[2] - 0.5).abs() < 1e-12);
        assert!((binner.approximate_bin_size() - 0.175).abs() < 1e-12);
    }

    #[test]
    fn test_zero_bin_width_is_invalid() {
        let axis = vec![0.1, 0.2];
        assert!(matches!(
            MobilogramBinner::new([axis.as_slice()], MobilityType::None, 0),
            Err(DetectionError::InvalidParameter { .. })
        ));
        assert!(matches!(
            MobilogramBinner::new(std::iter::empty::<&[f64]>(), MobilityType::None, 1),
            Err(DetectionError::MissingPrerequisiteData { .. })
        ));
    }

    #[test]
    fn test_trimming_keeps_one_zero_pad() {
        let axis = tims_axis(10);
        let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 1).unwrap();
        let mut intensities = vec![0.0; 10];
        // Descending acquisition: index 4 and 5 are the 6th and 5th bins ascending.
        intensities[4] = 10.0;
        intensities[5] = 5.0;
        let out = binner
            .bin_traces(&[MobilityTrace {
                mobilities: axis.clone(),
                intensities,
            }])
            .unwrap();
        assert_eq!(out.intensities, vec![0.0, 5.0, 10.0, 0.0]);
        assert!(out.mobilities.windows(2).all(|w| w[0] < w[1]));
        assert!((out.mobilities[1] - axis[5]).abs() < 1e-12);
    }

    #[test]
    fn test_trimming_at_edges_and_all_zero() {
        let axis = vec![0.1, 0.2, 0.3];
        let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::None, 1).unwrap();
        let out = binner
            .bin_traces(&[MobilityTrace {
                mobilities: axis.clone(),
                intensities: vec![1.0, 0.0, 0.0],
            }])
            .unwrap();
        assert_eq!(out.intensities, vec![1.0, 0.0]);

        let out = binner
            .bin_traces(&[MobilityTrace {
                mobilities: axis.clone(),
                intensities: vec![0.0; 3],
            }])
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.bin_width, 1);
    }

    #[test]
    fn test_values_outside_range_are_not_assigned() {
        let axis = vec![0.2, 0.3];
        let binner = MobilogramBinner::new([axis.as_slice()], MobilityType::None, 1).unwrap();
        let out = binner
            .bin_traces(&[MobilityTrace {
                mobilities: vec![0.1, 0.2, 0.3, 0.4],
                intensities: vec![100.0, 1.0, 2.0, 100.0],
            }])
            .unwrap();
        assert_eq!(out.total_intensity(), 3.0);
    }

    #[test]
    fn test_rebin_finer_is_rejected() {
        let axis = tims_axis(20);
        let coarse = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 4).unwrap();
        let fine = MobilogramBinner::new([axis.as_slice()], MobilityType::Tims, 2).unwrap();
        let trace = MobilityTrace {
            mobilities: axis.clone(),
            intensities: vec![1.0; 20],
        };
        let binned = coarse.bin_traces(&[trace]).unwrap();
        assert!(matches!(
            fine.rebin(&binned),
            Err(DetectionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_recommended_bin_width() {
        let axis = tims_axis(100);
        assert_eq!(recommended_bin_width(MobilityType::Tims, &axis), 1);
        let fine_axis: Vec<f64> = (0..100).map(|i| 1.4 - i as f64 * 0.00015).collect();
        assert_eq!(recommended_bin_width(MobilityType::Tims, &fine_axis), 5);
        assert_eq!(recommended_bin_width(MobilityType::DriftTube, &fine_axis), 1);
        assert_eq!(recommended_bin_width(MobilityType::Tims, &[1.0]), 1);
    }
}
