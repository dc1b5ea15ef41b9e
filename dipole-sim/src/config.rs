use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::geometry::{self, Basis, Vec3};
use crate::schedule::critical_lambda;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisKind {
    Triangular,
    Square,
    Custom { a: [f32; 3], b: [f32; 3] },
}

impl BasisKind {
    pub fn basis(&self) -> Basis {
        match self {
            Self::Triangular => geometry::triangular(),
            Self::Square => geometry::square(),
            Self::Custom { a, b } => Basis::new(Vec3::from(*a), Vec3::from(*b)),
        }
    }
}

impl TryFrom<&str> for BasisKind {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "triangular" => Ok(Self::Triangular),
            "square" => Ok(Self::Square),
            _ => Err(format!(
                "unknown basis '{s}', expected 'triangular' or 'square'"
            )),
        }
    }
}

fn validate_lattice_config(cfg: &LatticeConfig) -> Result<(), ValidationError> {
    if cfg.size < 1 {
        return Err(ValidationError::new("lattice size must be >= 1"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_lattice_config"))]
pub struct LatticeConfig {
    /// Supercell extent `L`; the supercell holds `L²` sites.
    pub size: usize,
    pub basis: BasisKind,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            size: 30,
            basis: BasisKind::Triangular,
        }
    }
}

fn validate_tensor_config(cfg: &TensorConfig) -> Result<(), ValidationError> {
    if let Some(c) = cfg.cutoff_sq {
        if !(c.is_finite() && c > 0.0) {
            return Err(ValidationError::new("cutoff_sq must be finite and > 0"));
        }
    }
    Ok(())
}

/// Truncation of the periodic lattice sums in the coupling tensors.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_tensor_config"))]
pub struct TensorConfig {
    /// Periodic images `(k, l)` are searched for `|k|, |l| <= replication_radius / L`.
    pub replication_radius: u32,
    /// Squared-norm cutoff of included displacements. Defaults to
    /// `replication_radius · sin(π/3)`.
    pub cutoff_sq: Option<f64>,
}

impl TensorConfig {
    pub fn cutoff(&self) -> f64 {
        self.cutoff_sq
            .unwrap_or_else(|| self.replication_radius as f64 * (std::f64::consts::PI / 3.0).sin())
    }
}

impl Default for TensorConfig {
    fn default() -> Self {
        Self {
            replication_radius: 500,
            cutoff_sq: None,
        }
    }
}

fn validate_dynamics_config(cfg: &DynamicsConfig) -> Result<(), ValidationError> {
    if !(cfg.dt.is_finite() && cfg.dt > 0.0) {
        return Err(ValidationError::new("dt must be finite and > 0"));
    }
    if cfg.block_steps < 1 {
        return Err(ValidationError::new("block_steps must be >= 1"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_dynamics_config"))]
pub struct DynamicsConfig {
    /// Fixed time step in units of the Debye relaxation time.
    pub dt: f64,
    /// Unsampled steps run after randomizing a realization.
    pub equilibration_steps: usize,
    /// Steps per equilibration block; λ advances and a record is exported
    /// once per block.
    pub block_steps: usize,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 256.0,
            equilibration_steps: 400,
            block_steps: 400,
        }
    }
}

fn validate_anneal_config(cfg: &AnnealConfig) -> Result<(), ValidationError> {
    if !(cfg.lambda_start.is_finite() && cfg.lambda_start >= 0.0) {
        return Err(ValidationError::new("lambda_start must be finite and >= 0"));
    }
    if !(cfg.lambda_max.is_finite() && cfg.lambda_max > cfg.lambda_start) {
        return Err(ValidationError::new("lambda_max must be finite and > lambda_start"));
    }
    if !(cfg.slope.is_finite() && cfg.slope >= 0.0) {
        return Err(ValidationError::new("slope must be finite and >= 0"));
    }
    if let Some(lc) = cfg.lambda_critical {
        if !(lc.is_finite() && lc > 0.0) {
            return Err(ValidationError::new("lambda_critical must be finite and > 0"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_anneal_config"))]
pub struct AnnealConfig {
    pub lambda_start: f64,
    pub lambda_max: f64,
    /// Slope `m` of the ramp `Δλ = c0(N) + m·|λ − λc|`.
    pub slope: f64,
    /// Defaults to `1 / (0.33 + 0.61 / log10 N)`.
    pub lambda_critical: Option<f64>,
}

impl AnnealConfig {
    pub fn lambda_c(&self, n_sites: usize) -> f64 {
        self.lambda_critical
            .unwrap_or_else(|| critical_lambda(n_sites))
    }
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            lambda_start: 0.1,
            lambda_max: 12.0,
            slope: 0.014,
            lambda_critical: None,
        }
    }
}

fn validate_post_critical_config(cfg: &PostCriticalConfig) -> Result<(), ValidationError> {
    if !cfg.t_max.is_finite() {
        return Err(ValidationError::new("post_critical t_max must be finite"));
    }
    Ok(())
}

/// Continuation at fixed `λ = λmax` after the annealed phase.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_post_critical_config"))]
pub struct PostCriticalConfig {
    /// Simulated time at which the run stops.
    pub t_max: f64,
    /// External field switched on at the start of the phase.
    pub field: Option<[f32; 3]>,
}

impl Default for PostCriticalConfig {
    fn default() -> Self {
        Self {
            t_max: 1.0e6,
            field: Some([1.0, 0.0, 0.0]),
        }
    }
}

fn validate_snapshot_config(cfg: &SnapshotConfig) -> Result<(), ValidationError> {
    if cfg.interval < 1 {
        return Err(ValidationError::new("snapshot interval must be >= 1"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_snapshot_config"))]
pub struct SnapshotConfig {
    /// Steps between full-state snapshots.
    pub interval: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { interval: 40 }
    }
}

/// Field sweep `0 → B0 → −B0 → B0` at fixed λ.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HysteresisConfig {
    /// Field increment applied after every block.
    pub field_step: [f32; 3],
    /// Turning-point amplitude `B0`.
    pub amplitude: f32,
    /// Fixed λ; defaults to `3·λc`.
    pub lambda: Option<f64>,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            field_step: [0.01, 0.0, 0.0],
            amplitude: 1.0,
            lambda: None,
        }
    }
}

/// Anneal to λc, ramp an in-plane field to `B0`, then rotate it once.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RotatingFieldConfig {
    pub amplitude: f32,
    /// Increment of `B.x` per block during the ramp.
    pub field_step: f32,
    /// Rotation increment per block, radians.
    pub angle_step: f64,
}

impl Default for RotatingFieldConfig {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            field_step: 0.01,
            angle_step: 0.01 * std::f64::consts::PI,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Anneal,
    Hysteresis(HysteresisConfig),
    RotatingField(RotatingFieldConfig),
}

fn validate_protocol(protocol: &Protocol) -> Result<(), ValidationError> {
    match protocol {
        Protocol::Anneal => {}
        Protocol::Hysteresis(h) => {
            if !(h.amplitude.is_finite() && h.amplitude > 0.0) {
                return Err(ValidationError::new("hysteresis amplitude must be > 0"));
            }
            let step = Vec3::from(h.field_step).norm();
            if !(step.is_finite() && step > 0.0) {
                return Err(ValidationError::new("hysteresis field_step must be non-zero"));
            }
            if let Some(l) = h.lambda {
                if !(l.is_finite() && l >= 0.0) {
                    return Err(ValidationError::new("hysteresis lambda must be >= 0"));
                }
            }
        }
        Protocol::RotatingField(r) => {
            if !(r.amplitude.is_finite() && r.amplitude > 0.0) {
                return Err(ValidationError::new("rotating-field amplitude must be > 0"));
            }
            if !(r.field_step.is_finite() && r.field_step > 0.0) {
                return Err(ValidationError::new("rotating-field field_step must be > 0"));
            }
            if !(r.angle_step.is_finite() && r.angle_step > 0.0) {
                return Err(ValidationError::new("rotating-field angle_step must be > 0"));
            }
        }
    }
    Ok(())
}

fn validate_sim_config(cfg: &SimConfig) -> Result<(), ValidationError> {
    validate_protocol(&cfg.protocol)?;
    if cfg.external_field.iter().any(|b| !b.is_finite()) {
        return Err(ValidationError::new("external_field must be finite"));
    }
    if cfg.n_realizations < 1 {
        return Err(ValidationError::new("n_realizations must be >= 1"));
    }
    if cfg.n_streams == Some(0) {
        return Err(ValidationError::new("n_streams must be >= 1"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_sim_config"))]
pub struct SimConfig {
    #[validate]
    pub lattice: LatticeConfig,
    #[validate]
    pub tensor: TensorConfig,
    #[validate]
    pub dynamics: DynamicsConfig,
    #[validate]
    pub anneal: AnnealConfig,
    /// Fixed-λ continuation after the annealed phase (anneal protocol only).
    #[validate]
    pub post_critical: Option<PostCriticalConfig>,
    /// Full-state snapshots; disabled when absent.
    #[validate]
    pub snapshots: Option<SnapshotConfig>,
    pub protocol: Protocol,
    /// External field at the start of every realization.
    pub external_field: [f32; 3],
    pub n_realizations: usize,
    /// Base seed; realization `r` seeds its streams from
    /// `seed + r · n_streams`.
    pub seed: u64,
    /// Random streams (and integrator chunks) per realization. Defaults to
    /// the size of the rayon pool.
    pub n_streams: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            lattice: LatticeConfig::default(),
            tensor: TensorConfig::default(),
            dynamics: DynamicsConfig::default(),
            anneal: AnnealConfig::default(),
            post_critical: None,
            snapshots: None,
            protocol: Protocol::Anneal,
            external_field: [0.0; 3],
            n_realizations: 500,
            seed: 42,
            n_streams: None,
        }
    }
}
