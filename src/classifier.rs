use crate::detector::Detector;
use crate::error::{IfResult, ImmuForgeError};
use crate::individual::Individual;
use crate::labels::{Label, LabelSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Picks the label whose detector produces the highest match ratio that also
/// exceeds that detector's own threshold.
///
/// Detectors must be supplied in label order; on equal ratios the earlier one
/// wins. `None` means no detector fired.
pub fn infer_label<'a, I>(detectors: I, individual: &Individual) -> Option<Label>
where
    I: IntoIterator<Item = &'a Detector>,
{
    let mut best: Option<(Label, f64)> = None;
    for d in detectors {
        let ratio = d.match_ratio(individual);
        if ratio <= d.decoded_threshold() {
            continue;
        }
        match best {
            Some((_, best_ratio)) if ratio <= best_ratio => {}
            _ => best = Some((d.label(), ratio)),
        }
    }
    best.map(|(label, _)| label)
}

/// One frozen detector per label; the artifact produced by training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClassifierRecord")]
pub struct Classifier {
    labels: LabelSet,
    detectors: BTreeMap<Label, Detector>,
}

/// Unchecked persisted form; turned into a [`Classifier`] through
/// [`Classifier::new`].
#[derive(Debug, Deserialize)]
pub struct ClassifierRecord {
    pub labels: LabelSet,
    pub detectors: BTreeMap<Label, Detector>,
}

impl TryFrom<ClassifierRecord> for Classifier {
    type Error = ImmuForgeError;

    fn try_from(record: ClassifierRecord) -> IfResult<Self> {
        Classifier::new(record.labels, record.detectors)
    }
}

impl Classifier {
    pub fn new(labels: LabelSet, detectors: BTreeMap<Label, Detector>) -> IfResult<Self> {
        for label in labels.iter() {
            match detectors.get(&label) {
                Some(d) if d.label() == label => {}
                Some(d) => {
                    return Err(ImmuForgeError::Validation(format!(
                        "Detector stored under {} carries label {}",
                        label,
                        d.label()
                    )))
                }
                None => {
                    return Err(ImmuForgeError::Validation(format!(
                        "No detector for label '{}'",
                        labels.name(label).unwrap_or("?")
                    )))
                }
            }
        }
        if detectors.len() != labels.len() {
            return Err(ImmuForgeError::Validation(format!(
                "Expected {} detectors, found {}",
                labels.len(),
                detectors.len()
            )));
        }

        let feature_len = detectors.values().next().map(|d| d.len()).unwrap_or(0);
        if detectors.values().any(|d| d.len() != feature_len) {
            return Err(ImmuForgeError::Validation(
                "Detectors have inconsistent lengths".to_string(),
            ));
        }

        Ok(Self { labels, detectors })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn detector(&self, label: Label) -> Option<&Detector> {
        self.detectors.get(&label)
    }

    pub fn detectors(&self) -> impl Iterator<Item = &Detector> {
        self.detectors.values()
    }

    pub fn feature_len(&self) -> usize {
        self.detectors.values().next().map(|d| d.len()).unwrap_or(0)
    }

    /// Predicted label, or `None` when the individual is unclassified.
    pub fn classify(&self, individual: &Individual) -> IfResult<Option<Label>> {
        let expected = self.feature_len();
        if individual.len() != expected {
            return Err(ImmuForgeError::FeatureLength {
                expected,
                found: individual.len(),
            });
        }
        Ok(infer_label(self.detectors.values(), individual))
    }

    /// Same as [`classify`](Self::classify) but resolves the label name.
    pub fn classify_name(&self, individual: &Individual) -> IfResult<Option<&str>> {
        Ok(self
            .classify(individual)?
            .and_then(|label| self.labels.name(label)))
    }

    pub fn to_json(&self) -> IfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> IfResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> IfResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> IfResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, d) in &self.detectors {
            writeln!(f, "{:<12} {}", self.labels.name(*label).unwrap_or("?"), d)?;
        }
        Ok(())
    }
}
