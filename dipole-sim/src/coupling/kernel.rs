use crate::geometry::{Mat3, Vec3};

/// Squared separation below which two dipoles are treated as coincident.
pub const SELF_EPS: f32 = 1e-7;

/// Dipole-dipole coupling dyadic for relative displacement `r`:
///
/// `J(r) = (3·r·rᵗ − |r|²·I) / |r|⁵` for `|r|² > SELF_EPS`, zero otherwise.
///
/// `|r|⁻⁵` is evaluated as `1 / (|r|⁴·|r|)`. The result is exactly symmetric
/// and exactly even in `r`, since every entry is built from products `rᵢ·rⱼ`.
#[inline]
pub fn coupling(r: &Vec3) -> Mat3 {
    let r2 = r.norm_squared();
    if r2 > SELF_EPS {
        let inv_r5 = 1.0 / (r2 * r2 * r2.sqrt());
        (r * r.transpose() * 3.0 - Mat3::identity() * r2) * inv_r5
    } else {
        Mat3::zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Vec3> {
        vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.5, 0.866_025_4, 0.0),
            Vec3::new(-2.3, 1.7, 0.4),
            Vec3::new(0.01, -0.02, 0.005),
            Vec3::new(37.0, -12.5, 0.0),
        ]
    }

    #[test]
    fn test_zero_below_eps() {
        assert_eq!(coupling(&Vec3::zeros()), Mat3::zeros());
        assert_eq!(coupling(&Vec3::new(1e-4, 0.0, 0.0)), Mat3::zeros());
        assert_eq!(coupling(&Vec3::new(2e-4, 2e-4, 0.0)), Mat3::zeros());
    }

    #[test]
    fn test_symmetric_and_even() {
        for r in samples() {
            let j = coupling(&r);
            assert_eq!(j, j.transpose(), "not symmetric for {r:?}");
            assert_eq!(coupling(&-r), j, "not even for {r:?}");
        }
    }

    #[test]
    fn test_traceless() {
        for r in samples() {
            let j = coupling(&r);
            let scale = j.abs().max();
            assert!(j.trace().abs() <= 1e-5 * scale.max(1.0));
        }
    }

    #[test]
    fn test_axial_values() {
        // Along x at unit distance: diag(2, -1, -1).
        let j = coupling(&Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(j, Mat3::from_diagonal(&Vec3::new(2.0, -1.0, -1.0)));

        // Scales as |r|⁻³.
        let j2 = coupling(&Vec3::new(0.0, 2.0, 0.0));
        assert!((j2[(1, 1)] - 2.0 / 8.0).abs() < 1e-7);
        assert!((j2[(0, 0)] + 1.0 / 8.0).abs() < 1e-7);
    }
}
