use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256StarStar;

use crate::geometry::Vec3;

/// Per-worker source of uniform and normal deviates.
pub trait RandomStream: Send {
    /// Uniform deviate in `[0, 1)`.
    fn uniform(&mut self) -> f32;

    /// Standard normal deviate.
    fn normal(&mut self) -> f32;

    fn reseed(&mut self, seed: u64);
}

pub struct XoshiroStream {
    rng: Xoshiro256StarStar,
}

impl XoshiroStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }
}

impl RandomStream for XoshiroStream {
    #[inline]
    fn uniform(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    #[inline]
    fn normal(&mut self) -> f32 {
        self.rng.sample(StandardNormal)
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = Xoshiro256StarStar::seed_from_u64(seed);
    }
}

/// `n` independent streams seeded `base_seed, base_seed+1, …`, wrapping at
/// `u64::MAX`.
pub fn make_streams(base_seed: u64, n: usize) -> Vec<XoshiroStream> {
    (0..n)
        .map(|k| XoshiroStream::new(base_seed.wrapping_add(k as u64)))
        .collect()
}

/// Isotropic unit vector: rejection-sample the unit ball, then normalize.
pub fn random_direction<S: RandomStream + ?Sized>(stream: &mut S) -> Vec3 {
    loop {
        let v = Vec3::new(
            2.0 * stream.uniform() - 1.0,
            2.0 * stream.uniform() - 1.0,
            2.0 * stream.uniform() - 1.0,
        );
        let n2 = v.norm_squared();
        if n2 > 1e-6 && n2 <= 1.0 {
            return v / n2.sqrt();
        }
    }
}
