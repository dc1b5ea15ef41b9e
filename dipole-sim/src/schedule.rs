use crate::config::AnnealConfig;

/// Size-dependent base rate `c0(N) = 1 / (1.2·N + 465.8)` of the λ ramp.
pub fn base_rate(n_sites: usize) -> f64 {
    1.0 / (1.2 * n_sites as f64 + 465.8)
}

/// Finite-size estimate of the critical coupling,
/// `λc(N) = 1 / (0.33 + 0.61 / log10 N)`.
pub fn critical_lambda(n_sites: usize) -> f64 {
    1.0 / (0.33 + 0.61 / (n_sites as f64).log10())
}

/// Control-parameter ramp that slows down near the critical point:
/// after each block `λ += c0(N) + m·|λ − λc|`.
#[derive(Debug, Clone)]
pub struct AnnealingSchedule {
    lambda: f64,
    lambda_start: f64,
    lambda_c: f64,
    lambda_max: f64,
    slope: f64,
    base: f64,
}

impl AnnealingSchedule {
    pub fn new(config: &AnnealConfig, n_sites: usize) -> Self {
        Self {
            lambda: config.lambda_start,
            lambda_start: config.lambda_start,
            lambda_c: config.lambda_c(n_sites),
            lambda_max: config.lambda_max,
            slope: config.slope,
            base: base_rate(n_sites),
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn lambda_c(&self) -> f64 {
        self.lambda_c
    }

    pub fn lambda_max(&self) -> f64 {
        self.lambda_max
    }

    /// Step applied by the next [`advance`](Self::advance).
    pub fn increment(&self) -> f64 {
        self.base + self.slope * (self.lambda - self.lambda_c).abs()
    }

    pub fn advance(&mut self) {
        self.lambda += self.increment();
    }

    pub fn is_finished(&self) -> bool {
        self.lambda >= self.lambda_max
    }

    /// Pin λ to a fixed value (post-critical and fixed-λ protocols).
    pub fn hold(&mut self, lambda: f64) {
        self.lambda = lambda;
    }

    pub fn reset(&mut self) {
        self.lambda = self.lambda_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(n_sites: usize) -> AnnealingSchedule {
        AnnealingSchedule::new(&AnnealConfig::default(), n_sites)
    }

    #[test]
    fn test_critical_lambda_values() {
        // N = 900: log10 N = 2.954…
        let lc = critical_lambda(900);
        assert!((lc - 1.0 / (0.33 + 0.61 / 900f64.log10())).abs() < 1e-12);
        assert!(lc > 1.8 && lc < 1.9);
        assert!((base_rate(900) - 1.0 / 1545.8).abs() < 1e-15);
    }

    #[test]
    fn test_increment_positive_and_minimal_at_critical_point() {
        let mut s = schedule(900);
        while !s.is_finished() {
            assert!(s.increment() > 0.0);
            s.advance();
        }
        s.hold(s.lambda_c());
        assert!((s.increment() - base_rate(900)).abs() < 1e-15);
    }

    #[test]
    fn test_lambda_non_decreasing_and_terminates() {
        let mut s = schedule(100);
        let mut last = s.lambda();
        let mut blocks = 0;
        while !s.is_finished() {
            s.advance();
            assert!(s.lambda() >= last);
            last = s.lambda();
            blocks += 1;
        }
        assert!(s.lambda() >= s.lambda_max());
        assert!(blocks > 100 && blocks < 100_000);
    }

    #[test]
    fn test_zero_slope_is_linear() {
        let cfg = AnnealConfig {
            slope: 0.0,
            ..Default::default()
        };
        let mut s = AnnealingSchedule::new(&cfg, 9);
        s.advance();
        s.advance();
        assert!((s.lambda() - (0.1 + 2.0 * base_rate(9))).abs() < 1e-12);
        s.reset();
        assert_eq!(s.lambda(), 0.1);
    }
}
