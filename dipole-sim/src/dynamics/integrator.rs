use crate::geometry::Vec3;
use crate::parallel::par_over_sites;
use crate::random::RandomStream;

/// One projected Euler–Maruyama step of the rotational Langevin equation:
///
/// `mu ← mu + ½·dt·(BT − (mu·BT)·mu) + √dt·(W × mu)`, then renormalized,
/// with `W` three standard normals per site drawn from the stream owning the
/// site's chunk.
#[cfg_attr(feature = "profile", inline(never))]
pub fn step<S: RandomStream>(mu: &mut [Vec3], bt: &[Vec3], dt: f64, streams: &mut [S]) {
    let half_dt = (0.5 * dt) as f32;
    let sqrt_dt = dt.sqrt() as f32;

    par_over_sites(mu, streams, |offset, chunk, stream| {
        for (k, m) in chunk.iter_mut().enumerate() {
            let b = &bt[offset + k];
            let w = Vec3::new(stream.normal(), stream.normal(), stream.normal());
            let drift = (b - *m * m.dot(b)) * half_dt;
            let noise = w.cross(m) * sqrt_dt;
            *m = (*m + drift + noise).normalize();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{make_streams, random_direction, XoshiroStream};

    struct ZeroNoise;

    impl RandomStream for ZeroNoise {
        fn uniform(&mut self) -> f32 {
            0.0
        }
        fn normal(&mut self) -> f32 {
            0.0
        }
        fn reseed(&mut self, _seed: u64) {}
    }

    fn random_state(n: usize, seed: u64) -> Vec<Vec3> {
        let mut s = XoshiroStream::new(seed);
        (0..n).map(|_| random_direction(&mut s)).collect()
    }

    #[test]
    fn test_unit_norm_after_step() {
        let mut mu = random_state(50, 11);
        let bt: Vec<Vec3> = random_state(50, 12).iter().map(|b| b * 5.0).collect();
        let mut streams = make_streams(3, 4);
        for _ in 0..20 {
            step(&mut mu, &bt, 1.0 / 256.0, &mut streams);
            for m in &mu {
                assert!((m.norm() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_zero_noise_zero_field_is_identity() {
        let axes = vec![Vec3::x(), -Vec3::y(), Vec3::z(), -Vec3::x()];
        let mut mu = axes.clone();
        let bt = vec![Vec3::zeros(); 4];
        let mut streams = vec![ZeroNoise, ZeroNoise];
        step(&mut mu, &bt, 1.0 / 256.0, &mut streams);
        assert_eq!(mu, axes);

        let general = random_state(16, 5);
        let mut mu = general.clone();
        let bt = vec![Vec3::zeros(); 16];
        step(&mut mu, &bt, 0.1, &mut streams);
        for (a, b) in mu.iter().zip(&general) {
            assert!((a - b).norm() < 1e-6);
        }
    }

    #[test]
    fn test_zero_noise_relaxes_toward_field() {
        let mut mu = vec![Vec3::new(1.0, 0.0, 1.0).normalize(); 3];
        let bt = vec![Vec3::new(0.0, 0.0, 4.0); 3];
        let mut streams = vec![ZeroNoise];
        let mut last = mu[0].z;
        for _ in 0..200 {
            step(&mut mu, &bt, 1.0 / 64.0, &mut streams);
            assert!(mu[0].z >= last - 1e-6);
            last = mu[0].z;
        }
        assert!(last > 0.999);
    }

    #[test]
    fn test_same_streams_same_trajectory() {
        let start = random_state(30, 9);
        let bt = vec![Vec3::new(0.3, 0.0, 0.0); 30];

        let run = || {
            let mut mu = start.clone();
            let mut streams = make_streams(77, 3);
            for _ in 0..10 {
                step(&mut mu, &bt, 1.0 / 256.0, &mut streams);
            }
            mu
        };
        assert_eq!(run(), run());
    }
}
