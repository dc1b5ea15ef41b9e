use super::{Basis, Vec3};
use crate::error::SimError;

/// Periodic `L × L` supercell of a two-vector Bravais lattice.
///
/// Sites are indexed in row-major order: site `i_idx·L + j_idx` sits at
/// `i_idx·a + j_idx·b`. The supercell repeats with period `L·a` and `L·b`.
pub struct Lattice {
    /// Linear extent `L` of the supercell.
    pub size: usize,
    /// Total number of sites, `L²`.
    pub n_sites: usize,
    pub basis: Basis,
    /// Site positions, length `n_sites`.
    pub positions: Vec<Vec3>,
}

impl Lattice {
    /// Build the supercell, rejecting an empty lattice or a degenerate basis.
    pub fn new(size: usize, basis: Basis) -> Result<Self, SimError> {
        if size < 1 {
            return Err(SimError::LatticeSize(size));
        }
        basis.check()?;

        let n_sites = size * size;
        let mut positions = Vec::with_capacity(n_sites);
        for i in 0..size {
            for j in 0..size {
                positions.push(basis.point(i as i64, j as i64));
            }
        }

        Ok(Self {
            size,
            n_sites,
            basis,
            positions,
        })
    }

    /// Flat index of site `(i_idx, j_idx)`.
    #[inline]
    pub fn index(&self, i_idx: usize, j_idx: usize) -> usize {
        i_idx * self.size + j_idx
    }

    /// Translation to the periodic image `(k, l)` of the supercell:
    /// `L·k·a + L·l·b`.
    #[inline]
    pub fn image(&self, k: i64, l: i64) -> Vec3 {
        let size = self.size as f32;
        self.basis.a * (size * k as f32) + self.basis.b * (size * l as f32)
    }
}
