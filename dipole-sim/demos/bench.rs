use std::time::Instant;

use dipole_sim::config::*;
use dipole_sim::Simulation;

const L: usize = 30;
const N_STEPS: usize = 400;
const N_REALIZATIONS: usize = 4;
/// Order of magnitude of J11(inf) for the triangular basis; the value does
/// not affect timing.
const J_INF: f64 = 5.5;

fn main() {
    let config = SimConfig {
        lattice: LatticeConfig {
            size: L,
            basis: BasisKind::Triangular,
        },
        ..Default::default()
    };

    let t0 = Instant::now();
    let sim = Simulation::new(config, J_INF).unwrap();
    let build = t0.elapsed().as_secs_f64();

    println!(
        "Lattice: {}x{}  |  Sites: {}  |  Streams: {}  |  Steps: {}  |  Realizations: {}",
        L,
        L,
        sim.n_sites(),
        sim.n_streams(),
        N_STEPS,
        N_REALIZATIONS
    );
    println!("Tensor build: {:.3} s", build);
    println!("{}", "-".repeat(70));

    let t0 = Instant::now();
    for r in 0..N_REALIZATIONS {
        let mut real = sim.new_realization(r);
        for _ in 0..N_STEPS {
            sim.step(&mut real);
        }
    }
    let elapsed = t0.elapsed().as_secs_f64();

    let per_step = elapsed / (N_STEPS * N_REALIZATIONS) as f64 * 1000.0;
    println!("Total: {:.3} s  |  {:.3} ms/step", elapsed, per_step);
}
