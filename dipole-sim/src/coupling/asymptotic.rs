use rayon::prelude::*;

use super::kernel::coupling;
use crate::error::SimError;
use crate::geometry::{Basis, Mat3, Mat3d, Vec3};
use crate::sinks::{CouplingArtifact, ProgressSink};

/// Spacing of the default radius sequence.
pub const RADIUS_STEP: u32 = 10;
/// Number of radii in the default sequence (`10, 20, …, 300`).
pub const N_RADII: u32 = 30;

/// One truncated lattice sum of the estimation series.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusSample {
    pub radius: u32,
    pub inv_radius: f64,
    /// Number of dipoles inside the circle (origin excluded).
    pub count: usize,
    /// `(1,1)` component of the summed coupling.
    pub value: f64,
}

/// Extrapolated infinite-lattice coupling together with the raw series.
#[derive(Debug, Clone)]
pub struct AsymptoticEstimate {
    /// Intercept of the fit of `value` against `1/R`.
    pub j_inf: f64,
    pub slope: f64,
    pub samples: Vec<RadiusSample>,
}

pub fn default_radii() -> Vec<u32> {
    (1..=N_RADII).map(|i| i * RADIUS_STEP).collect()
}

/// `J(∞)` dyadic of a planar lattice: `diag(J, J, −2J)`.
pub fn j_infinity(j: f64) -> Mat3 {
    let j = j as f32;
    Mat3::from_diagonal(&Vec3::new(j, j, -2.0 * j))
}

/// Total coupling of the origin with every lattice point `i·a + j·b` of norm
/// `<= radius`, and the number of points included.
///
/// Rows of the index window are summed in parallel, then folded in index
/// order so the result does not depend on the pool size.
pub fn circle_sum(basis: &Basis, radius: f64) -> (Mat3d, usize) {
    let (wi, wj) = basis.window(radius);

    let rows: Vec<(Mat3d, usize)> = (-wi..=wi)
        .into_par_iter()
        .map(|i| {
            let mut total = Mat3d::zeros();
            let mut count = 0usize;
            for j in -wj..=wj {
                if i == 0 && j == 0 {
                    continue;
                }
                let r = basis.point(i, j);
                if r.norm() as f64 <= radius {
                    total += coupling(&r).cast::<f64>();
                    count += 1;
                }
            }
            (total, count)
        })
        .collect();

    rows.into_iter()
        .fold((Mat3d::zeros(), 0), |(total, count), (t, c)| {
            (total + t, count + c)
        })
}

/// Least-squares line through `(xs, ys)`, returned as `(slope, intercept)`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let sx = xs.iter().sum::<f64>() / n;
    let sy = ys.iter().sum::<f64>() / n;
    let sxy = xs.iter().zip(ys).map(|(x, y)| x * y).sum::<f64>() / n;
    let sx2 = xs.iter().map(|x| x * x).sum::<f64>() / n;

    let slope = (sxy - sx * sy) / (sx2 - sx * sx);
    (slope, sy - slope * sx)
}

/// Estimate `J₁₁(∞)` by extrapolating circular lattice sums in `1/R`.
///
/// Cost is `O(R²)` per radius; callers should cache the result through a
/// [`CouplingArtifact`] (see [`resolve_j_infinity`]).
pub fn estimate(
    basis: &Basis,
    radii: &[u32],
    progress: &dyn ProgressSink,
) -> Result<AsymptoticEstimate, SimError> {
    basis.check()?;
    let mut distinct = radii.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 2 || distinct[0] == 0 {
        return Err(SimError::InsufficientRadii(distinct.len()));
    }

    let mut samples = Vec::with_capacity(radii.len());
    for &radius in radii {
        let (total, count) = circle_sum(basis, radius as f64);
        let value = total[(1, 1)];
        progress.message(&format!(
            "J(R = {radius}) = {value:.5} ({count} dipoles)"
        ));
        samples.push(RadiusSample {
            radius,
            inv_radius: 1.0 / radius as f64,
            count,
            value,
        });
    }

    let xs: Vec<f64> = samples.iter().map(|s| s.inv_radius).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let (slope, j_inf) = linear_fit(&xs, &ys);
    progress.message(&format!("J11(inf) = {j_inf:.5}"));

    Ok(AsymptoticEstimate {
        j_inf,
        slope,
        samples,
    })
}

/// Return the cached `J₁₁(∞)`, estimating and storing it when the artifact
/// is absent, unreadable, belongs to another basis, or `force` is set.
///
/// A failed store is reported and otherwise ignored: the freshly computed
/// value is still returned, and the next run estimates again.
pub fn resolve_j_infinity(
    artifact: &dyn CouplingArtifact,
    basis: &Basis,
    force: bool,
    progress: &dyn ProgressSink,
) -> Result<f64, SimError> {
    if !force {
        match artifact.load(basis) {
            Ok(Some(j)) => {
                progress.message(&format!("loaded cached J11(inf) = {j}"));
                return Ok(j);
            }
            Ok(None) => progress.message("no cached J11(inf), estimating"),
            Err(e) => progress.message(&format!(
                "cannot read cached J11(inf) ({e}), estimating"
            )),
        }
    }

    let est = estimate(basis, &default_radii(), progress)?;
    if let Err(e) = artifact.store(basis, &est) {
        progress.message(&format!(
            "cannot store J11(inf) ({e}); it will be recomputed next run"
        ));
    }
    Ok(est.j_inf)
}
