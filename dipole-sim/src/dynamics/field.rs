use nalgebra::Vector3;
use rayon::prelude::*;

use crate::coupling::CouplingTensors;
use crate::geometry::Vec3;

/// Lattice-average direction, reduced serially in `f64` so the result does
/// not depend on the pool size.
pub fn mean_direction(mu: &[Vec3]) -> Vec3 {
    if mu.is_empty() {
        return Vec3::zeros();
    }
    let mut total = Vector3::<f64>::zeros();
    for m in mu {
        total += m.cast::<f64>();
    }
    (total / mu.len() as f64).cast::<f32>()
}

/// `BT[i] = B_ext + λ·(Σⱼ Jtilda[i][j]·mu[j] + dJ[i]·⟨mu⟩)` for every site.
///
/// The mean is reduced first; sites are then mapped independently.
#[cfg_attr(feature = "profile", inline(never))]
pub fn effective_field(
    tensors: &CouplingTensors,
    mu: &[Vec3],
    lambda: f64,
    external: &Vec3,
    bt: &mut [Vec3],
) {
    let mean = mean_direction(mu);
    let lambda = lambda as f32;

    bt.par_iter_mut().enumerate().for_each(|(i, b)| {
        let mut near = Vec3::zeros();
        for (j, m) in tensors.row(i).iter().zip(mu) {
            near += j * m;
        }
        *b = external + (near + tensors.remainder(i) * mean) * lambda;
    });
}

/// Magnetic energy per site in units of λ,
/// `−½ Σᵢ mu[i]·(B_ext + BT[i]) / (N·λ)`.
///
/// `bt` must be the field of the current `mu`. At `λ = 0` the λ
/// normalization is skipped.
pub fn magnetic_energy(mu: &[Vec3], bt: &[Vec3], external: &Vec3, lambda: f64) -> f64 {
    if mu.is_empty() {
        return 0.0;
    }
    let total: f64 = mu
        .iter()
        .zip(bt)
        .map(|(m, b)| m.dot(&(external + b)) as f64)
        .sum();
    let per_site = -0.5 * total / mu.len() as f64;
    if lambda == 0.0 {
        per_site
    } else {
        per_site / lambda
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TensorConfig;
    use crate::coupling::j_infinity;
    use crate::geometry::{square, triangular, Lattice};
    use approx::assert_relative_eq;

    fn tensors(size: usize, j: f64) -> (Lattice, CouplingTensors) {
        let lattice = Lattice::new(size, triangular()).unwrap();
        let config = TensorConfig {
            replication_radius: 30,
            cutoff_sq: None,
        };
        let t = CouplingTensors::build(&lattice, &j_infinity(j), &config);
        (lattice, t)
    }

    #[test]
    fn test_mean_direction() {
        let mu = vec![Vec3::x(), Vec3::y(), -Vec3::x(), Vec3::z()];
        assert_relative_eq!(mean_direction(&mu), Vec3::new(0.0, 0.25, 0.25));
        assert_eq!(mean_direction(&[]), Vec3::zeros());
    }

    #[test]
    fn test_zero_lambda_gives_external_field() {
        let (lattice, t) = tensors(2, 3.0);
        let mu = vec![Vec3::new(0.6, 0.0, 0.8); lattice.n_sites];
        let b = Vec3::new(0.1, -0.2, 0.3);
        let mut bt = vec![Vec3::zeros(); lattice.n_sites];
        effective_field(&t, &mu, 0.0, &b, &mut bt);
        for f in &bt {
            assert_eq!(*f, b);
        }
    }

    #[test]
    fn test_uniform_state_sees_j_inf() {
        // With every site aligned, near field plus remainder closes to J(∞)·m.
        let j = 2.5;
        let (lattice, t) = tensors(3, j);
        let m = Vec3::new(0.6, 0.0, 0.8);
        let mu = vec![m; lattice.n_sites];
        let mut bt = vec![Vec3::zeros(); lattice.n_sites];
        let lambda = 0.5;
        effective_field(&t, &mu, lambda, &Vec3::zeros(), &mut bt);

        let expected = j_infinity(j) * m * lambda as f32;
        for f in &bt {
            assert_relative_eq!(*f, expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_energy_of_uniform_in_plane_state() {
        let j = 2.5;
        let lattice = Lattice::new(2, square()).unwrap();
        let t = CouplingTensors::build(&lattice, &j_infinity(j), &TensorConfig::default());
        let mu = vec![Vec3::x(); lattice.n_sites];
        let mut bt = vec![Vec3::zeros(); lattice.n_sites];
        let lambda = 2.0;
        effective_field(&t, &mu, lambda, &Vec3::zeros(), &mut bt);

        let e = magnetic_energy(&mu, &bt, &Vec3::zeros(), lambda);
        assert!((e + 0.5 * j).abs() < 1e-4, "e = {e}");
    }

    #[test]
    fn test_energy_without_lambda_normalization() {
        let mu = vec![Vec3::z(); 4];
        let bt = vec![Vec3::new(0.0, 0.0, 2.0); 4];
        let b = Vec3::new(0.0, 0.0, 2.0);
        assert_relative_eq!(magnetic_energy(&mu, &bt, &b, 0.0), -2.0);
        assert_relative_eq!(magnetic_energy(&mu, &bt, &b, 4.0), -0.5);
    }
}
