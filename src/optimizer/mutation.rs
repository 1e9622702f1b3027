use crate::detector::Detector;
use crate::error::{IfResult, ImmuForgeError};
use crate::genome::Symbol;
use fastrand::Rng;

/// Per-symbol bit-flip mutation.
#[derive(Debug, Clone, Copy)]
pub struct Mutation {
    rate: f64,
}

impl Mutation {
    pub fn new(rate: f64) -> IfResult<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ImmuForgeError::Config(format!(
                "mutation_rate {} outside [0, 1]",
                rate
            )));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// New detector with every threshold, pattern and mask symbol flipped
    /// independently with probability `rate`.
    pub fn apply(&self, detector: &Detector, rng: &mut Rng) -> IfResult<Detector> {
        let mut threshold = *detector.threshold();
        for t in threshold.iter_mut() {
            *t = self.maybe_flip(*t, rng);
        }
        let pattern = detector
            .pattern()
            .iter()
            .map(|&s| self.maybe_flip(s, rng))
            .collect();
        let mask = detector
            .mask()
            .iter()
            .map(|&s| self.maybe_flip(s, rng))
            .collect();

        Detector::new(detector.label(), threshold, pattern, mask)
    }

    #[inline(always)]
    fn maybe_flip(&self, s: Symbol, rng: &mut Rng) -> Symbol {
        if rng.f64() < self.rate {
            !s
        } else {
            s
        }
    }
}
