/// Online accumulator of the squared order parameter and its square.
///
/// Samples are `x = |⟨mu⟩|²`; the cumulant is
/// `U = 1 − 3·⟨x²⟩ / (5·⟨x⟩²)`, which is `0.4` for a perfectly ordered
/// (constant) series.
#[derive(Debug, Clone, Default)]
pub struct BinderCumulant {
    count: usize,
    sum: f64,
    sum2: f64,
}

impl BinderCumulant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.sum2 += x * x;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Current cumulant, `0` when nothing has been sampled or the second
    /// moment vanishes. Clears the accumulator afterwards if `reset` is set.
    pub fn value(&mut self, reset: bool) -> f64 {
        let u = if self.count == 0 || self.sum == 0.0 {
            0.0
        } else {
            let c = self.count as f64;
            let m2 = self.sum / c;
            let m4 = self.sum2 / c;
            1.0 - 3.0 * m4 / (5.0 * m2 * m2)
        };
        if reset {
            self.reset();
        }
        u
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_samples_give_two_fifths() {
        let mut b = BinderCumulant::new();
        for _ in 0..17 {
            b.sample(0.36);
        }
        assert!((b.value(false) - 0.4).abs() < 1e-12);
        assert_eq!(b.count(), 17);
    }

    #[test]
    fn test_empty_is_zero() {
        let mut b = BinderCumulant::new();
        assert_eq!(b.value(false), 0.0);
        b.sample(0.0);
        assert_eq!(b.value(false), 0.0);
    }

    #[test]
    fn test_reset_after_read() {
        let mut b = BinderCumulant::new();
        b.sample(0.2);
        b.sample(0.8);
        let u = b.value(true);
        // ⟨x⟩ = 0.5, ⟨x²⟩ = 0.34
        assert!((u - (1.0 - 3.0 * 0.34 / (5.0 * 0.25))).abs() < 1e-12);
        assert_eq!(b.count(), 0);
        assert_eq!(b.value(false), 0.0);
    }

    #[test]
    fn test_explicit_reset() {
        let mut b = BinderCumulant::new();
        b.sample(0.5);
        b.reset();
        assert_eq!(b.count(), 0);
        assert_eq!(b.value(true), 0.0);
    }
}
