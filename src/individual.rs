use crate::error::{IfResult, ImmuForgeError};
use crate::genome::{format_symbols, parse_symbols, Symbol};
use crate::labels::{Label, LabelSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A labelled feature vector produced by the data preparation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Individual {
    label: Label,
    features: Vec<Symbol>,
}

impl Individual {
    pub fn new(label: Label, features: Vec<Symbol>) -> Self {
        Self { label, features }
    }

    /// Builds an individual from a `0`/`1` string.
    pub fn parse(label: Label, bits: &str) -> IfResult<Self> {
        Ok(Self::new(label, parse_symbols(bits)?))
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn features(&self) -> &[Symbol] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.label, format_symbols(&self.features))
    }
}

/// Individuals validated against a label set: non-empty, every vector of
/// the same non-zero length, every label registered.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    labels: LabelSet,
    individuals: Vec<Individual>,
    feature_len: usize,
}

impl TrainingSet {
    pub fn new(labels: LabelSet, individuals: Vec<Individual>) -> IfResult<Self> {
        let first = individuals
            .first()
            .ok_or_else(|| ImmuForgeError::Validation("Training set is empty".to_string()))?;

        let feature_len = first.len();
        if feature_len == 0 {
            return Err(ImmuForgeError::Validation(
                "Feature vectors have zero length".to_string(),
            ));
        }

        for (i, ind) in individuals.iter().enumerate() {
            if ind.len() != feature_len {
                return Err(ImmuForgeError::Validation(format!(
                    "Individual {} has {} features, expected {}",
                    i,
                    ind.len(),
                    feature_len
                )));
            }
            if !labels.contains(ind.label()) {
                return Err(ImmuForgeError::Validation(format!(
                    "Individual {} carries unregistered label {}",
                    i,
                    ind.label()
                )));
            }
        }

        Ok(Self {
            labels,
            individuals,
            feature_len,
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }
}
