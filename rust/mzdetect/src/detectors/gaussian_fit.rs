use crate::errors::{
    DetectionError,
    Result,
};
use crate::models::{
    Peak,
    SpectrumView,
};
use nalgebra::{
    Matrix3,
    Vector3,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

/// FWHM = 2 * sqrt(2 * ln(2)) * sigma
const FWHM_TO_SIGMA: f64 = 2.354_820_045_030_949;

/// Refines a coarse peak list by fitting a Gaussian to the profile points
/// around each coarse peak.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GaussianFitConfig {
    /// Neighbours taken on each side of the coarse peak.
    pub window_radius: usize,
    pub max_iterations: usize,
    /// Refined peaks whose mean moved further than this (in m/z) are dropped.
    pub max_mean_shift: f64,
}

impl Default for GaussianFitConfig {
    fn default() -> Self {
        Self {
            window_radius: 2,
            max_iterations: 1000,
            max_mean_shift: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianParams {
    pub norm: f64,
    pub mean: f64,
    pub sigma: f64,
}

impl GaussianParams {
    pub fn value_at(&self, x: f64) -> f64 {
        let d = x - self.mean;
        self.norm * (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FitError {
    TooFewPoints(usize),
    Singular,
    NonFinite,
    NotConverged { iterations: usize },
}

impl GaussianFitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_radius < 1 {
            return Err(DetectionError::invalid_parameter(
                "window_radius",
                "must be at least 1",
            ));
        }
        if self.max_iterations < 1 {
            return Err(DetectionError::invalid_parameter(
                "max_iterations",
                "must be at least 1",
            ));
        }
        if self.max_mean_shift.is_nan() || self.max_mean_shift <= 0.0 {
            return Err(DetectionError::invalid_parameter(
                "max_mean_shift",
                format!("must be positive, got {}", self.max_mean_shift),
            ));
        }
        Ok(())
    }

    fn window_len(&self) -> usize {
        2 * self.window_radius + 1
    }

    pub fn detect<S: SpectrumView + ?Sized>(
        &self,
        spectrum: &S,
        mass_list: Option<&[Peak]>,
    ) -> Result<Vec<Peak>> {
        self.validate()?;
        let Some(mass_list) = mass_list else {
            return Err(DetectionError::missing_data(
                "gaussian fitting needs a coarse peak list from another detector",
            ));
        };

        let mut xs = Vec::with_capacity(self.window_len());
        let mut ys = Vec::with_capacity(self.window_len());
        let mut out = Vec::with_capacity(mass_list.len());
        for coarse in mass_list {
            let Some(center) = spectrum.closest_index(coarse.mz) else {
                continue;
            };
            let start = center.saturating_sub(self.window_radius);
            let end = (center + self.window_radius + 1).min(spectrum.len());

            // The window buffers are reset per peak.
            xs.clear();
            ys.clear();
            for i in start..end {
                xs.push(spectrum.mz(i));
                ys.push(spectrum.intensity(i));
            }

            if xs.len() < self.window_len() {
                out.push(*coarse);
                continue;
            }

            match fit_gaussian(&xs, &ys, self.max_iterations) {
                Ok(params) if (params.mean - coarse.mz).abs() <= self.max_mean_shift => {
                    out.push(Peak::new(params.mean, params.norm));
                }
                Ok(params) => {
                    debug!(
                        "Dropping peak at {}: fitted mean {} moved too far",
                        coarse.mz, params.mean
                    );
                }
                Err(e) => {
                    debug!("Dropping peak at {}: gaussian fit failed {:?}", coarse.mz, e);
                }
            }
        }
        Ok(out)
    }
}

/// Least squares fit of `norm * exp(-(x - mean)^2 / (2 sigma^2))`.
///
/// Levenberg-Marquardt on the 3x3 normal equations. The problem is
/// solved in shifted and scaled coordinates (x relative to the most
/// intense point in units of the initial sigma, y relative to the max)
/// so that all three parameters are of order one.
pub(crate) fn fit_gaussian(
    xs: &[f64],
    ys: &[f64],
    max_iterations: usize,
) -> std::result::Result<GaussianParams, FitError> {
    if xs.len() < 3 || xs.len() != ys.len() {
        return Err(FitError::TooFewPoints(xs.len()));
    }
    let (apex, y_max) = ys
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, y)| if y > acc.1 { (i, y) } else { acc });
    if !y_max.is_finite() || y_max <= 0.0 {
        return Err(FitError::NonFinite);
    }
    let x0 = xs[apex];
    let scale = initial_sigma(xs, ys, y_max);
    if !scale.is_finite() || scale <= 0.0 {
        return Err(FitError::NonFinite);
    }

    let ts: Vec<f64> = xs.iter().map(|x| (x - x0) / scale).collect();
    let vs: Vec<f64> = ys.iter().map(|y| y / y_max).collect();

    let mut params = Vector3::new(1.0, 0.0, 1.0);
    let mut cost = sum_sq_residuals(&ts, &vs, &params);
    let mut lambda = 1e-3;
    let mut iterations = 0;

    loop {
        if iterations >= max_iterations {
            return Err(FitError::NotConverged { iterations });
        }
        iterations += 1;

        let (jtj, jtr) = normal_equations(&ts, &vs, &params);
        let damped = jtj + Matrix3::from_diagonal(&jtj.diagonal()) * lambda;
        let Some(step) = damped.lu().solve(&jtr) else {
            lambda *= 10.0;
            if lambda > 1e16 {
                return Err(FitError::Singular);
            }
            continue;
        };

        let candidate = params + step;
        let new_cost = if candidate[2] > 0.0 && candidate.iter().all(|x| x.is_finite()) {
            sum_sq_residuals(&ts, &vs, &candidate)
        } else {
            f64::INFINITY
        };

        if new_cost < cost {
            params = candidate;
            let improvement = cost - new_cost;
            cost = new_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if step.amax() < 1e-10 || improvement <= 1e-15 * cost.max(1e-300) {
                break;
            }
        } else {
            lambda *= 10.0;
            // No step direction decreases the cost any more: at a minimum.
            if lambda > 1e16 {
                break;
            }
        }
    }

    let out = GaussianParams {
        norm: params[0] * y_max,
        mean: x0 + params[1] * scale,
        sigma: params[2] * scale,
    };
    if !(out.norm.is_finite() && out.mean.is_finite() && out.sigma.is_finite()) {
        return Err(FitError::NonFinite);
    }
    Ok(out)
}

/// Sigma estimated from the span of points above half maximum,
/// never narrower than the smallest point spacing.
fn initial_sigma(xs: &[f64], ys: &[f64], y_max: f64) -> f64 {
    let half = y_max / 2.0;
    let above: Vec<f64> = xs
        .iter()
        .zip(ys.iter())
        .filter(|(_, y)| **y >= half)
        .map(|(x, _)| *x)
        .collect();
    let span = match (above.first(), above.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };
    let min_spacing = xs
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min);
    span.max(min_spacing) / FWHM_TO_SIGMA
}

fn model(t: f64, p: &Vector3<f64>) -> (f64, f64) {
    let d = t - p[1];
    let e = (-(d * d) / (2.0 * p[2] * p[2])).exp();
    (p[0] * e, e)
}

fn sum_sq_residuals(ts: &[f64], vs: &[f64], p: &Vector3<f64>) -> f64 {
    ts.iter()
        .zip(vs.iter())
        .map(|(t, v)| (v - model(*t, p).0).powi(2))
        .sum()
}

fn normal_equations(ts: &[f64], vs: &[f64], p: &Vector3<f64>) -> (Matrix3<f64>, Vector3<f64>) {
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();
    let s2 = p[2] * p[2];
    for (t, v) in ts.iter().zip(vs.iter()) {
        let (f, e) = model(*t, p);
        let d = t - p[1];
        let j = Vector3::new(e, f * d / s2, f * d * d / (s2 * p[2]));
        jtj += j * j.transpose();
        jtr += j * (v - f);
    }
    (jtj, jtr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MzSpectrum;

    fn gaussian_points(truth: GaussianParams, start: f64, step: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
        let xs: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        let ys = xs.iter().map(|x| truth.value_at(*x)).collect();
        (xs, ys)
    }

    #[test]
    fn test_recovers_exact_gaussian() {
        let truth = GaussianParams {
            norm: 1.0e5,
            mean: 500.0037,
            sigma: 0.01,
        };
        let (xs, ys) = gaussian_points(truth, 499.99, 0.005, 5);
        let fit = fit_gaussian(&xs, &ys, 1000).unwrap();
        assert!(
            (fit.mean - truth.mean).abs() < 1e-6,
            "Expected mean {}, got {:?}",
            truth.mean,
            fit
        );
        assert!((fit.sigma - truth.sigma).abs() < 1e-6, "{:?}", fit);
        assert!((fit.norm - truth.norm).abs() / truth.norm < 1e-4, "{:?}", fit);
    }

    #[test]
    fn test_flat_window_fails() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(fit_gaussian(&xs, &[0.0; 5], 1000).is_err());
    }

    #[test]
    fn test_requires_mass_list() {
        let spec = MzSpectrum::try_new(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap();
        let out = GaussianFitConfig::default().detect(&spec, None);
        assert!(matches!(
            out,
            Err(DetectionError::MissingPrerequisiteData { .. })
        ));
    }

    #[test]
    fn test_edge_peaks_pass_through() {
        let truth = GaussianParams {
            norm: 1000.0,
            mean: 300.02,
            sigma: 0.01,
        };
        let (xs, ys) = gaussian_points(truth, 300.0, 0.005, 12);
        let spec = MzSpectrum::try_new(xs.clone(), ys.clone()).unwrap();
        // Coarse peak on the first sample: only 3 points are available.
        let coarse = [Peak::new(xs[0], ys[0])];
        let out = GaussianFitConfig::default()
            .detect(&spec, Some(&coarse))
            .unwrap();
        assert_eq!(out, coarse.to_vec());
    }

    #[test]
    fn test_refines_apex_of_profile_peak() {
        let truth = GaussianParams {
            norm: 2.0e4,
            mean: 250.1234,
            sigma: 0.004,
        };
        let (xs, ys) = gaussian_points(truth, 250.10, 0.002, 25);
        let spec = MzSpectrum::try_new(xs, ys).unwrap();
        let idx = spec.closest_index(250.1234).unwrap();
        let coarse = [Peak::new(spec.mz(idx), spec.intensity(idx))];
        let out = GaussianFitConfig::default()
            .detect(&spec, Some(&coarse))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].mz - truth.mean).abs() < 1e-6, "{:?}", out);
    }
}
