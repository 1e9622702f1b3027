use crate::detector::Detector;
use crate::error::{IfResult, ImmuForgeError};
use crate::genome::{Symbol, THRESHOLD_BITS};
use fastrand::Rng;

/// Rate-gated uniform crossover.
#[derive(Debug, Clone, Copy)]
pub struct Crossover {
    rate: f64,
}

impl Crossover {
    pub fn new(rate: f64) -> IfResult<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ImmuForgeError::Config(format!(
                "crossover_rate {} outside [0, 1]",
                rate
            )));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// With probability `rate`, builds a child by picking every symbol of the
    /// threshold, pattern and mask from a coin-flipped parent. Otherwise
    /// returns a copy of one parent chosen uniformly.
    pub fn apply(&self, p1: &Detector, p2: &Detector, rng: &mut Rng) -> IfResult<Detector> {
        if p1.label() != p2.label() {
            return Err(ImmuForgeError::LabelMismatch(p1.label().0, p2.label().0));
        }

        if rng.f64() < self.rate {
            let mut threshold = [Symbol::Zero; THRESHOLD_BITS];
            for (i, t) in threshold.iter_mut().enumerate() {
                *t = if rng.bool() {
                    p1.threshold()[i]
                } else {
                    p2.threshold()[i]
                };
            }
            let pattern = crossover_uniform(p1.pattern(), p2.pattern(), rng);
            let mask = crossover_uniform(p1.mask(), p2.mask(), rng);

            Detector::new(p1.label(), threshold, pattern, mask)
        } else if rng.bool() {
            Ok(p1.offspring_copy())
        } else {
            Ok(p2.offspring_copy())
        }
    }
}

/// Position-wise coin-flip recombination of two equal-length strings.
pub fn crossover_uniform(a: &[Symbol], b: &[Symbol], rng: &mut Rng) -> Vec<Symbol> {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| if rng.bool() { x } else { y })
        .collect()
}
