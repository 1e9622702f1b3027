pub mod factory;

use crate::error::{IfResult, ImmuForgeError};
use crate::genome::{decode_threshold, Symbol, THRESHOLD_BITS};
use crate::individual::Individual;
use crate::labels::Label;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub use self::factory::DetectorFactory;

/// An evolved pattern-matching candidate for one class.
///
/// Everything except `fitness` is fixed at construction. Operators build new
/// detectors rather than editing pattern, mask or threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DetectorRecord", into = "DetectorRecord")]
pub struct Detector {
    label: Label,
    pattern: Vec<Symbol>,
    /// `One` marks a "don't care" position.
    mask: Vec<Symbol>,
    threshold: [Symbol; THRESHOLD_BITS],
    decoded_threshold: f64,
    fitness: Option<f64>,
}

impl Detector {
    pub fn new(
        label: Label,
        threshold: [Symbol; THRESHOLD_BITS],
        pattern: Vec<Symbol>,
        mask: Vec<Symbol>,
    ) -> IfResult<Self> {
        if pattern.is_empty() {
            return Err(ImmuForgeError::Validation(
                "Detector pattern has zero length".to_string(),
            ));
        }
        if pattern.len() != mask.len() {
            return Err(ImmuForgeError::Validation(format!(
                "Pattern length {} differs from mask length {}",
                pattern.len(),
                mask.len()
            )));
        }

        Ok(Self {
            label,
            decoded_threshold: decode_threshold(&threshold),
            pattern,
            mask,
            threshold,
            fitness: None,
        })
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn pattern(&self) -> &[Symbol] {
        &self.pattern
    }

    pub fn mask(&self) -> &[Symbol] {
        &self.mask
    }

    pub fn threshold(&self) -> &[Symbol; THRESHOLD_BITS] {
        &self.threshold
    }

    pub fn decoded_threshold(&self) -> f64 {
        self.decoded_threshold
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Fitness for selection purposes; undefined counts as zero.
    #[inline(always)]
    pub fn fitness_or_zero(&self) -> f64 {
        self.fitness.unwrap_or(0.0)
    }

    pub fn is_all_wildcard(&self) -> bool {
        self.mask.iter().all(|m| m.is_one())
    }

    /// Same genes with undefined fitness.
    pub fn offspring_copy(&self) -> Self {
        Self {
            fitness: None,
            ..self.clone()
        }
    }

    /// Fraction of concrete (non-wildcard) positions where the pattern agrees
    /// with the individual.
    ///
    /// A detector whose mask is all wildcards makes no comparisons; its ratio
    /// is defined as `0.0`, so it can never fire.
    #[inline(always)]
    pub fn match_ratio(&self, individual: &Individual) -> f64 {
        debug_assert_eq!(self.pattern.len(), individual.len());

        let mut matches = 0u32;
        let mut comparisons = 0u32;
        for ((&p, &m), &x) in self
            .pattern
            .iter()
            .zip(self.mask.iter())
            .zip(individual.features().iter())
        {
            if !m.is_one() {
                comparisons += 1;
                if p == x {
                    matches += 1;
                }
            }
        }

        if comparisons == 0 {
            0.0
        } else {
            matches as f64 / comparisons as f64
        }
    }

    /// Strictly above the decoded threshold.
    #[inline(always)]
    pub fn fires(&self, individual: &Individual) -> bool {
        self.match_ratio(individual) > self.decoded_threshold
    }

    /// Descending-fitness comparator; undefined fitness sorts last.
    pub fn by_fitness_desc(a: &Detector, b: &Detector) -> Ordering {
        match (a.fitness, b.fitness) {
            (Some(fa), Some(fb)) => fb.total_cmp(&fa),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Pattern with wildcards rendered as `#`.
    pub fn schema(&self) -> String {
        self.pattern
            .iter()
            .zip(self.mask.iter())
            .map(|(p, m)| if m.is_one() { '#' } else if p.is_one() { '1' } else { '0' })
            .collect()
    }
}

/// Serialized form. The decoded threshold is not stored; it is re-derived
/// when the record is turned back into a detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorRecord {
    label: Label,
    threshold: [Symbol; THRESHOLD_BITS],
    pattern: Vec<Symbol>,
    mask: Vec<Symbol>,
    #[serde(default)]
    fitness: Option<f64>,
}

impl TryFrom<DetectorRecord> for Detector {
    type Error = ImmuForgeError;

    fn try_from(rec: DetectorRecord) -> IfResult<Self> {
        let mut d = Detector::new(rec.label, rec.threshold, rec.pattern, rec.mask)?;
        d.fitness = rec.fitness;
        Ok(d)
    }
}

impl From<Detector> for DetectorRecord {
    fn from(d: Detector) -> Self {
        Self {
            label: d.label,
            threshold: d.threshold,
            pattern: d.pattern,
            mask: d.mask,
            fitness: d.fitness,
        }
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Detector[label={}, threshold={:.3}, schema={}, fitness=",
            self.label,
            self.decoded_threshold,
            self.schema()
        )?;
        match self.fitness {
            Some(v) => write!(f, "{:.4}]", v),
            None => write!(f, "-]"),
        }
    }
}
