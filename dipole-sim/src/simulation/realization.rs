use crate::geometry::Vec3;
use crate::parallel::par_over_sites;
use crate::random::{make_streams, random_direction, RandomStream, XoshiroStream};
use crate::schedule::AnnealingSchedule;
use crate::statistics::BinderCumulant;

/// Mutable state of one independent run.
///
/// Holds the dipole directions, the effective-field buffer, the clock, the
/// annealing schedule, the order-parameter accumulator, and one random
/// stream per integrator chunk. Lattice and couplings live in the shared
/// [`Simulation`](super::Simulation).
pub struct Realization<S: RandomStream = XoshiroStream> {
    pub id: usize,
    /// Unit directions, length `n_sites`.
    pub mu: Vec<Vec3>,
    /// Effective field of the last evaluated configuration, length `n_sites`.
    pub field: Vec<Vec3>,
    pub time: f64,
    /// Steps taken since the last reset.
    pub steps: usize,
    pub schedule: AnnealingSchedule,
    pub external_field: Vec3,
    /// In-plane angle of the external field (rotating-field protocol).
    pub field_angle: f64,
    pub binder: BinderCumulant,
    pub streams: Vec<S>,
    base_seed: u64,
}

impl Realization<XoshiroStream> {
    /// Seeds streams deterministically as `base_seed, base_seed+1, …`.
    pub fn new(
        id: usize,
        n_sites: usize,
        schedule: AnnealingSchedule,
        external_field: Vec3,
        base_seed: u64,
        n_streams: usize,
    ) -> Self {
        let streams = make_streams(base_seed, n_streams.max(1));
        Self::with_streams(id, n_sites, schedule, external_field, base_seed, streams)
    }
}

impl<S: RandomStream> Realization<S> {
    pub fn with_streams(
        id: usize,
        n_sites: usize,
        schedule: AnnealingSchedule,
        external_field: Vec3,
        base_seed: u64,
        streams: Vec<S>,
    ) -> Self {
        let mut real = Self {
            id,
            mu: vec![Vec3::z(); n_sites],
            field: vec![Vec3::zeros(); n_sites],
            time: 0.0,
            steps: 0,
            schedule,
            external_field,
            field_angle: 0.0,
            binder: BinderCumulant::new(),
            streams,
            base_seed,
        };
        real.reset(external_field);
        real
    }

    pub fn n_sites(&self) -> usize {
        self.mu.len()
    }

    /// Reseed the streams, draw fresh isotropic directions, and rewind the
    /// clock, λ and the accumulator.
    pub fn reset(&mut self, external_field: Vec3) {
        for (k, s) in self.streams.iter_mut().enumerate() {
            s.reseed(self.base_seed.wrapping_add(k as u64));
        }
        par_over_sites(&mut self.mu, &mut self.streams, |_, chunk, stream| {
            for m in chunk.iter_mut() {
                *m = random_direction(stream);
            }
        });
        self.field.fill(Vec3::zeros());
        self.time = 0.0;
        self.steps = 0;
        self.schedule.reset();
        self.binder.reset();
        self.external_field = external_field;
        self.field_angle = 0.0;
    }
}
