use super::Detector;
use crate::error::{IfResult, ImmuForgeError};
use crate::genome::{decode_threshold, Symbol, THRESHOLD_BITS};
use crate::labels::{Label, LabelSet};
use fastrand::Rng;

/// Builds random detectors for a fixed feature length.
#[derive(Debug, Clone)]
pub struct DetectorFactory {
    length: usize,
    class_bias: Option<f64>,
    generality_bias: f64,
}

impl DetectorFactory {
    pub fn new(length: usize, class_bias: Option<f64>, generality_bias: f64) -> IfResult<Self> {
        if length == 0 {
            return Err(ImmuForgeError::Config(
                "Detector length must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&generality_bias) {
            return Err(ImmuForgeError::Config(format!(
                "generality_bias {} outside [0, 1]",
                generality_bias
            )));
        }
        if let Some(b) = class_bias {
            if !(0.0..=1.0).contains(&b) {
                return Err(ImmuForgeError::Config(format!(
                    "class_bias {} outside [0, 1]",
                    b
                )));
            }
        }
        Ok(Self {
            length,
            class_bias,
            generality_bias,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn class_bias(&self) -> Option<f64> {
        self.class_bias
    }

    /// Random detector with a label drawn from `labels`.
    ///
    /// Without a class bias the label is uniform. With `class_bias = p` the
    /// first label is drawn with probability `p` and the others share the
    /// remainder uniformly.
    pub fn make_detector(&self, labels: &LabelSet, rng: &mut Rng) -> Detector {
        let label = self.pick_label(labels, rng);
        self.make_detector_for(label, rng)
    }

    /// Random detector for a fixed label.
    pub fn make_detector_for(&self, label: Label, rng: &mut Rng) -> Detector {
        let mut threshold = [Symbol::Zero; THRESHOLD_BITS];
        for t in threshold.iter_mut() {
            *t = Symbol::random(rng);
        }

        let mut pattern = Vec::with_capacity(self.length);
        let mut mask = Vec::with_capacity(self.length);
        for _ in 0..self.length {
            pattern.push(Symbol::random(rng));
            mask.push(Symbol::biased(rng, self.generality_bias));
        }

        Detector {
            label,
            decoded_threshold: decode_threshold(&threshold),
            pattern,
            mask,
            threshold,
            fitness: None,
        }
    }

    fn pick_label(&self, labels: &LabelSet, rng: &mut Rng) -> Label {
        let n = labels.len();
        if n <= 1 {
            return labels.first();
        }
        match self.class_bias {
            None => Label(rng.usize(0..n) as u16),
            Some(p) => {
                if rng.f64() < p {
                    labels.first()
                } else {
                    Label(rng.usize(1..n) as u16)
                }
            }
        }
    }
}
