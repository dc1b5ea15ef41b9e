use dipole_sim::{ProgressSink, RunOutcome, StepStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Steps between status-line refreshes.
const STATUS_EVERY: usize = 400;

/// Terminal progress: one bar tick per realization, with the running
/// realization's λ and clock in the bar message.
pub struct BarProgress {
    bar: ProgressBar,
    quiet: bool,
}

impl BarProgress {
    pub fn new(n_realizations: u64, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(n_realizations)
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}]",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message("realizations");
        Self { bar, quiet }
    }

    pub fn realization_done(&self, outcome: &RunOutcome) {
        self.bar.inc(1);
        self.message(&format!(
            "realization {} done: {} records, {} steps, t = {:.2}, lambda = {:.4}",
            outcome.realization, outcome.samples, outcome.steps, outcome.time, outcome.lambda
        ));
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl ProgressSink for BarProgress {
    fn message(&self, msg: &str) {
        if self.quiet {
            eprintln!("{msg}");
        } else {
            self.bar.println(msg);
        }
    }

    fn step(&self, status: &StepStatus) {
        if self.quiet || status.step % STATUS_EVERY != 0 {
            return;
        }
        let m = status.mean_direction;
        self.bar.set_message(format!(
            "r{} t={:.1} lambda={:.3} |m|={:.3}",
            status.realization,
            status.time,
            status.lambda,
            m.norm()
        ));
    }
}
