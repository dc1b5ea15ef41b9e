pub mod realization;

pub use realization::Realization;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{HysteresisConfig, PostCriticalConfig, Protocol, RotatingFieldConfig, SimConfig};
use crate::coupling::{j_infinity, CouplingTensors};
use crate::dynamics::{self, effective_field, magnetic_energy, mean_direction};
use crate::error::SimError;
use crate::geometry::{Lattice, Vec3};
use crate::random::{RandomStream, XoshiroStream};
use crate::schedule::AnnealingSchedule;
use crate::sinks::{ProgressSink, ResultSink, SinkError, SnapshotSink, StepStatus};
use crate::statistics::{BlockRecord, SnapshotRecord};
use validator::Validate;

/// Fixed inputs shared by every realization: validated configuration,
/// lattice geometry and the precomputed coupling tensors.
pub struct Simulation {
    pub config: SimConfig,
    pub lattice: Lattice,
    pub tensors: CouplingTensors,
    n_streams: usize,
}

/// Outer collaborators of one realization run.
///
/// A sink that fails is reported through `progress` and dropped for the
/// rest of the run.
pub struct Sinks<'a> {
    pub results: Vec<&'a mut dyn ResultSink>,
    pub snapshots: Option<&'a mut dyn SnapshotSink>,
    pub progress: &'a dyn ProgressSink,
}

impl<'a> Sinks<'a> {
    pub fn new(progress: &'a dyn ProgressSink) -> Self {
        Self {
            results: Vec::new(),
            snapshots: None,
            progress,
        }
    }

    pub fn with_results(mut self, sink: &'a mut dyn ResultSink) -> Self {
        self.results.push(sink);
        self
    }

    pub fn with_snapshots(mut self, sink: &'a mut dyn SnapshotSink) -> Self {
        self.snapshots = Some(sink);
        self
    }

    fn record(&mut self, record: &BlockRecord) {
        let progress = self.progress;
        self.results.retain_mut(|sink| match sink.record(record) {
            Ok(()) => true,
            Err(e) => {
                progress.message(&format!(
                    "result export failed ({e}); disabled for realization {}",
                    record.realization
                ));
                false
            }
        });
    }

    fn with_snapshot_sink<F>(&mut self, realization: usize, f: F)
    where
        F: FnOnce(&mut dyn SnapshotSink) -> Result<(), SinkError>,
    {
        let failed = match self.snapshots.as_deref_mut() {
            Some(sink) => f(sink).err(),
            None => None,
        };
        if let Some(e) = failed {
            self.progress.message(&format!(
                "snapshot export failed ({e}); disabled for realization {realization}"
            ));
            self.snapshots = None;
        }
    }

    fn finish(&mut self, realization: usize) {
        let progress = self.progress;
        for sink in self.results.iter_mut() {
            if let Err(e) = sink.finish(realization) {
                progress.message(&format!("result export failed on finish ({e})"));
            }
        }
        self.with_snapshot_sink(realization, |s| s.finish(realization));
    }
}

/// Summary of a finished realization.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub realization: usize,
    /// Block records exported.
    pub samples: usize,
    pub steps: usize,
    pub time: f64,
    pub lambda: f64,
}

impl Simulation {
    /// Validate `config`, lay out the lattice, and build the coupling tensors
    /// against `J(∞) = diag(j_inf, j_inf, −2·j_inf)`.
    pub fn new(config: SimConfig, j_inf: f64) -> Result<Self, SimError> {
        config.validate()?;
        let basis = config.lattice.basis.basis();
        basis.check()?;
        let lattice = Lattice::new(config.lattice.size, basis)?;
        let tensors = CouplingTensors::build(&lattice, &j_infinity(j_inf), &config.tensor);
        let n_streams = config
            .n_streams
            .unwrap_or_else(rayon::current_num_threads)
            .max(1);

        Ok(Self {
            config,
            lattice,
            tensors,
            n_streams,
        })
    }

    pub fn n_sites(&self) -> usize {
        self.lattice.n_sites
    }

    pub fn n_streams(&self) -> usize {
        self.n_streams
    }

    pub fn lambda_c(&self) -> f64 {
        self.config.anneal.lambda_c(self.n_sites())
    }

    /// Fresh realization `id`, its streams seeded from
    /// `seed + id · n_streams`.
    pub fn new_realization(&self, id: usize) -> Realization<XoshiroStream> {
        let seed = self
            .config
            .seed
            .wrapping_add((id as u64).wrapping_mul(self.n_streams as u64));
        Realization::new(
            id,
            self.n_sites(),
            self.schedule(),
            Vec3::from(self.config.external_field),
            seed,
            self.n_streams,
        )
    }

    pub fn schedule(&self) -> AnnealingSchedule {
        AnnealingSchedule::new(&self.config.anneal, self.n_sites())
    }

    /// Evaluate the field at the current λ and advance every site by one
    /// integrator step.
    pub fn step<S: RandomStream>(&self, real: &mut Realization<S>) {
        effective_field(
            &self.tensors,
            &real.mu,
            real.schedule.lambda(),
            &real.external_field,
            &mut real.field,
        );
        dynamics::step(
            &mut real.mu,
            &real.field,
            self.config.dynamics.dt,
            &mut real.streams,
        );
        real.time += self.config.dynamics.dt;
        real.steps += 1;
    }

    /// Magnetic energy of the current configuration. Refreshes `real.field`.
    pub fn energy<S: RandomStream>(&self, real: &mut Realization<S>) -> f64 {
        let lambda = real.schedule.lambda();
        effective_field(
            &self.tensors,
            &real.mu,
            lambda,
            &real.external_field,
            &mut real.field,
        );
        magnetic_energy(&real.mu, &real.field, &real.external_field, lambda)
    }

    /// Reset `real` and run it through the configured protocol, exporting a
    /// record per block.
    ///
    /// `interrupted` is polled once per step; when set the run stops with
    /// [`SimError::Interrupted`] after flushing the sinks.
    pub fn run_realization<S: RandomStream>(
        &self,
        real: &mut Realization<S>,
        sinks: Sinks<'_>,
        interrupted: &AtomicBool,
    ) -> Result<RunOutcome, SimError> {
        let mut run = Run {
            sim: self,
            real,
            sinks,
            interrupted,
            sample: 0,
            equilibrated: false,
        };
        let result = run.execute();
        let id = run.real.id;
        run.sinks.finish(id);
        result?;

        Ok(RunOutcome {
            realization: id,
            samples: run.sample,
            steps: run.real.steps,
            time: run.real.time,
            lambda: run.real.schedule.lambda(),
        })
    }
}

/// Driver state of one `run_realization` call.
struct Run<'s, 'r, 'k, S: RandomStream> {
    sim: &'s Simulation,
    real: &'r mut Realization<S>,
    sinks: Sinks<'k>,
    interrupted: &'s AtomicBool,
    sample: usize,
    /// Snapshots start once the equilibration steps are done.
    equilibrated: bool,
}

impl<S: RandomStream> Run<'_, '_, '_, S> {
    fn execute(&mut self) -> Result<(), SimError> {
        let sim = self.sim;
        let config = &sim.config;
        self.real.reset(Vec3::from(config.external_field));
        if let Protocol::Hysteresis(h) = &config.protocol {
            let lambda = h.lambda.unwrap_or(3.0 * self.real.schedule.lambda_c());
            self.real.schedule.hold(lambda);
        }

        if config.snapshots.is_some() {
            let id = self.real.id;
            let positions = &sim.lattice.positions;
            self.sinks.with_snapshot_sink(id, |s| s.begin(id, positions));
        }
        self.sinks.progress.message(&format!(
            "realization {}: {} sites, lambda_c = {:.4}",
            self.real.id,
            sim.n_sites(),
            self.real.schedule.lambda_c()
        ));

        for _ in 0..config.dynamics.equilibration_steps {
            self.advance(false)?;
        }
        self.equilibrated = true;
        if config.snapshots.is_some() {
            self.snapshot();
        }
        self.export();

        match &config.protocol {
            Protocol::Anneal => {
                self.anneal()?;
                if let Some(pc) = &config.post_critical {
                    self.post_critical(pc)?;
                }
            }
            Protocol::Hysteresis(h) => self.hysteresis(h)?,
            Protocol::RotatingField(r) => self.rotating_field(r)?,
        }
        Ok(())
    }

    /// One step; with `sample` set the order parameter is accumulated.
    /// After equilibration, snapshots are taken at their cadence whether or
    /// not the step is sampled.
    fn advance(&mut self, sample: bool) -> Result<(), SimError> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Err(SimError::Interrupted);
        }
        let sim = self.sim;
        sim.step(self.real);
        let mean = mean_direction(&self.real.mu);
        if sample {
            self.real.binder.sample(mean.norm_squared() as f64);
        }
        if self.equilibrated {
            if let Some(snap) = &sim.config.snapshots {
                if self.real.steps % snap.interval == 0 {
                    self.snapshot();
                }
            }
        }
        self.sinks.progress.step(&StepStatus {
            realization: self.real.id,
            step: self.real.steps,
            time: self.real.time,
            lambda: self.real.schedule.lambda(),
            mean_direction: mean,
        });
        Ok(())
    }

    fn block(&mut self, sample: bool) -> Result<(), SimError> {
        for _ in 0..self.sim.config.dynamics.block_steps {
            self.advance(sample)?;
        }
        Ok(())
    }

    /// Export the block record and clear the accumulator.
    fn export(&mut self) {
        let mean = mean_direction(&self.real.mu);
        let energy = self.sim.energy(self.real);
        let record = BlockRecord {
            realization: self.real.id,
            sample: self.sample,
            sites: self.sim.n_sites(),
            lambda: self.real.schedule.lambda(),
            time: self.real.time,
            theta: self.real.field_angle,
            energy,
            magnetization: mean.norm() as f64,
            binder: self.real.binder.value(true),
            field: self.real.external_field.into(),
            m_planar: mean.xy().norm() as f64,
            m: mean.into(),
        };
        self.sample += 1;
        self.sinks.record(&record);
    }

    fn snapshot(&mut self) {
        if self.sinks.snapshots.is_none() {
            return;
        }
        let energy = self.sim.energy(self.real);
        let record = SnapshotRecord {
            realization: self.real.id,
            step: self.real.steps,
            lambda: self.real.schedule.lambda(),
            time: self.real.time,
            energy,
            directions: self.real.mu.iter().map(|m| (*m).into()).collect(),
        };
        self.sinks
            .with_snapshot_sink(record.realization, |s| s.snapshot(&record));
    }

    fn anneal(&mut self) -> Result<(), SimError> {
        while !self.real.schedule.is_finished() {
            self.block(true)?;
            self.export();
            self.real.schedule.advance();
        }
        Ok(())
    }

    /// Anneal until λ reaches `target`, then pin it there for one more block.
    fn anneal_to(&mut self, target: f64) -> Result<(), SimError> {
        while self.real.schedule.lambda() < target {
            self.block(true)?;
            self.export();
            self.real.schedule.advance();
        }
        self.real.schedule.hold(target);
        self.block(true)?;
        self.export();
        Ok(())
    }

    fn post_critical(&mut self, pc: &PostCriticalConfig) -> Result<(), SimError> {
        let lambda_max = self.real.schedule.lambda_max();
        self.real.schedule.hold(lambda_max);
        self.block(false)?;
        if let Some(field) = pc.field {
            self.real.external_field = Vec3::from(field);
        }
        self.real.binder.reset();

        let block_steps = self.sim.config.dynamics.block_steps;
        let mut in_block = 0;
        while self.real.time < pc.t_max {
            self.advance(true)?;
            in_block += 1;
            if in_block == block_steps {
                self.export();
                in_block = 0;
            }
        }
        Ok(())
    }

    /// `0 → B0 → −B0 → B0` at fixed λ, one block and one record per field
    /// increment.
    fn hysteresis(&mut self, h: &HysteresisConfig) -> Result<(), SimError> {
        let step = Vec3::from(h.field_step);
        let mut sign = 1.0f32;
        let mut branches = 0;

        while branches < 3 {
            self.block(true)?;
            self.export();
            self.real.external_field += step * sign;
            let outward = self.real.external_field.dot(&step) * sign > 0.0;
            if outward && self.real.external_field.norm() > h.amplitude {
                sign = -sign;
                branches += 1;
                self.sinks.progress.message(&format!(
                    "realization {}: hysteresis branch {branches} done",
                    self.real.id
                ));
            }
        }
        Ok(())
    }

    fn rotating_field(&mut self, r: &RotatingFieldConfig) -> Result<(), SimError> {
        let lambda_c = self.real.schedule.lambda_c();
        self.anneal_to(lambda_c)?;

        loop {
            self.real.external_field.x += r.field_step;
            if self.real.external_field.x > r.amplitude {
                break;
            }
            self.block(true)?;
            self.export();
        }

        let n_angles = (std::f64::consts::TAU / r.angle_step + 1e-9).floor() as usize;
        for k in 0..=n_angles {
            let theta = k as f64 * r.angle_step;
            self.real.field_angle = theta;
            self.real.external_field = Vec3::new(
                r.amplitude * theta.cos() as f32,
                r.amplitude * theta.sin() as f32,
                0.0,
            );
            self.block(true)?;
            self.export();
        }
        Ok(())
    }
}
