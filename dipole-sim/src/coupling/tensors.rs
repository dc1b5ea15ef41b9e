use rayon::prelude::*;

use super::kernel::coupling;
use crate::config::TensorConfig;
use crate::geometry::{Lattice, Mat3, Mat3d};

/// Precomputed near-field couplings and mean-field remainders of a supercell.
///
/// `pair(i, j)` is the coupling of site `i` with site `j` and all of its
/// periodic images inside the truncation region. `remainder(i)` is
/// `J(∞) − Σⱼ pair(i, j)`, the coupling of site `i` with the rest of the
/// infinite lattice under a uniform mean-field assumption.
///
/// Both depend only on lattice geometry, so one instance is shared read-only
/// by every realization.
pub struct CouplingTensors {
    n_sites: usize,
    /// Flat pair table, element `i * n_sites + j`.
    jtilda: Vec<Mat3>,
    /// Per-site remainder, length `n_sites`.
    dj: Vec<Mat3>,
}

impl CouplingTensors {
    /// Sum the kernel over `r[j] − r[i] + L·k·a + L·l·b` for `|k|, |l| <= W`,
    /// `W = replication_radius / L`, keeping terms with `|d|² <= cutoff`.
    ///
    /// Rows are built in parallel; each row accumulates in `f64` and is
    /// narrowed to `f32` storage once complete.
    pub fn build(lattice: &Lattice, j_inf: &Mat3, config: &TensorConfig) -> Self {
        let n = lattice.n_sites;
        let window = (config.replication_radius as usize / lattice.size) as i64;
        let cutoff = config.cutoff();
        let j_inf = j_inf.cast::<f64>();

        let images: Vec<_> = (-window..=window)
            .flat_map(|k| (-window..=window).map(move |l| (k, l)))
            .map(|(k, l)| lattice.image(k, l))
            .collect();

        let mut jtilda = vec![Mat3::zeros(); n * n];
        let mut dj = vec![Mat3::zeros(); n];

        jtilda
            .par_chunks_mut(n)
            .zip(dj.par_iter_mut())
            .enumerate()
            .for_each(|(i, (row, remainder))| {
                let ri = lattice.positions[i];
                let mut row_total = Mat3d::zeros();
                for (j, slot) in row.iter_mut().enumerate() {
                    let base = lattice.positions[j] - ri;
                    let mut total = Mat3d::zeros();
                    for image in &images {
                        let d = base + image;
                        if d.norm_squared() as f64 <= cutoff {
                            total += coupling(&d).cast::<f64>();
                        }
                    }
                    row_total += total;
                    *slot = total.cast::<f32>();
                }
                *remainder = (j_inf - row_total).cast::<f32>();
            });

        Self { n_sites: n, jtilda, dj }
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    #[inline]
    pub fn pair(&self, i: usize, j: usize) -> &Mat3 {
        &self.jtilda[i * self.n_sites + j]
    }

    /// Couplings of site `i` with every site, length `n_sites`.
    #[inline]
    pub fn row(&self, i: usize) -> &[Mat3] {
        &self.jtilda[i * self.n_sites..(i + 1) * self.n_sites]
    }

    #[inline]
    pub fn remainder(&self, i: usize) -> &Mat3 {
        &self.dj[i]
    }
}
