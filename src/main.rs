use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dipole_sim::config::BasisKind;
use dipole_sim::{
    resolve_j_infinity, BlockAggregate, ProgressSink, SimConfig, SimError, Simulation, Sinks,
};
use rbm::{write_summary, BarProgress, CsvArtifact, JsonLinesResults, JsonLinesSnapshots};

/// Rotational Brownian motion of dipole superclusters.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Scenario file (YAML).
    #[arg(short, long, default_value = "scenarios/anneal.yaml")]
    config: PathBuf,

    /// Cached asymptotic coupling J11(inf).
    #[arg(long, default_value = "J_inf.csv")]
    jinf: PathBuf,

    /// Re-estimate J11(inf) even if the cache exists.
    #[arg(long)]
    force_jinf: bool,

    /// Output directory for results.jsonl, snapshots.jsonl and summary.json.
    #[arg(short, long, default_value = "results")]
    out: PathBuf,

    /// Worker threads (defaults to all cores).
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(short = 'n', long)]
    realizations: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Override the scenario's lattice basis (`triangular` or `square`).
    #[arg(long, value_parser = parse_basis)]
    basis: Option<BasisKind>,

    /// Hide the progress bar; diagnostics go to stderr.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_basis(s: &str) -> Result<BasisKind, String> {
    BasisKind::try_from(s)
}

fn load_config(path: &Path) -> Result<SimConfig> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let config: SimConfig = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

fn apply_overrides(args: &Args, config: &mut SimConfig) {
    if let Some(n) = args.realizations {
        config.n_realizations = n;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(basis) = args.basis {
        config.lattice.basis = basis;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    apply_overrides(&args, &mut config);
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("building thread pool")?;
    }

    let progress = BarProgress::new(config.n_realizations as u64, args.quiet);
    let artifact = CsvArtifact::new(&args.jinf);
    let j_inf = resolve_j_infinity(
        &artifact,
        &config.lattice.basis.basis(),
        args.force_jinf,
        &progress,
    )?;

    let sim = Simulation::new(config, j_inf)?;
    progress.message(&format!(
        "{} sites, J11(inf) = {j_inf:.5}, lambda_c = {:.4}, {} streams",
        sim.n_sites(),
        sim.lambda_c(),
        sim.n_streams()
    ));

    fs::create_dir_all(&args.out).with_context(|| format!("creating {}", args.out.display()))?;
    let mut results = JsonLinesResults::create(args.out.join("results.jsonl"))?;
    let mut snapshots = match sim.config.snapshots {
        Some(_) => Some(JsonLinesSnapshots::create(args.out.join("snapshots.jsonl"))?),
        None => None,
    };
    let mut aggregate = BlockAggregate::new();
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .context("installing Ctrl-C handler")?;
    }

    for r in 0..sim.config.n_realizations {
        let mut real = sim.new_realization(r);
        let mut sinks = Sinks::new(&progress)
            .with_results(&mut results)
            .with_results(&mut aggregate);
        if let Some(s) = snapshots.as_mut() {
            sinks = sinks.with_snapshots(s);
        }
        match sim.run_realization(&mut real, sinks, &interrupted) {
            Ok(outcome) => progress.realization_done(&outcome),
            Err(SimError::Interrupted) => {
                progress.message(&format!(
                    "interrupted during realization {r}; summarizing completed blocks"
                ));
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    progress.finish();

    write_summary(args.out.join("summary.json"), &aggregate.summary())?;
    if interrupted.load(Ordering::Relaxed) {
        anyhow::bail!("interrupted");
    }
    Ok(())
}
