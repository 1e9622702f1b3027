use crate::classifier::Classifier;
use crate::error::{IfResult, ImmuForgeError};
use crate::individual::Individual;
use crate::labels::{Label, LabelSet};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Disjoint training and test partitions of one data set.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub train: Vec<Individual>,
    pub test: Vec<Individual>,
}

impl Experiment {
    /// Shuffles and moves `floor(test_fraction * n)` individuals to the test
    /// partition. The training partition must not end up empty.
    pub fn split(
        mut individuals: Vec<Individual>,
        test_fraction: f64,
        rng: &mut Rng,
    ) -> IfResult<Self> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(ImmuForgeError::Config(format!(
                "test_fraction = {} is outside [0, 1)",
                test_fraction
            )));
        }

        let n_test = (test_fraction * individuals.len() as f64).floor() as usize;
        if individuals.len() <= n_test {
            return Err(ImmuForgeError::Validation(
                "Training partition would be empty".to_string(),
            ));
        }

        rng.shuffle(&mut individuals);
        let train = individuals.split_off(n_test);
        Ok(Self {
            train,
            test: individuals,
        })
    }

    /// Caps the data set at `max` random individuals. With `balanced` every
    /// label present gets the same quota `max / labels`, and labels short of
    /// their quota are not topped up from others.
    ///
    /// `max == 0` or `max >= n` keeps everything.
    pub fn subsample(
        mut individuals: Vec<Individual>,
        max: usize,
        balanced: bool,
        rng: &mut Rng,
    ) -> Vec<Individual> {
        if max == 0 || max >= individuals.len() {
            return individuals;
        }
        rng.shuffle(&mut individuals);

        if !balanced {
            individuals.truncate(max);
            return individuals;
        }

        let present: BTreeSet<Label> = individuals.iter().map(|i| i.label()).collect();
        let quota = max / present.len();
        let mut remaining: BTreeMap<Label, usize> = present.into_iter().map(|l| (l, quota)).collect();

        individuals
            .into_iter()
            .filter(|ind| match remaining.get_mut(&ind.label()) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            })
            .collect()
    }
}

/// Rows are true labels; columns are inferred labels followed by one
/// *unclassified* column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfusionMatrixRecord")]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

#[derive(Debug, Deserialize)]
pub struct ConfusionMatrixRecord {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

/// Needs one row per label, each with one column per label plus the
/// unclassified one.
impl TryFrom<ConfusionMatrixRecord> for ConfusionMatrix {
    type Error = ImmuForgeError;

    fn try_from(record: ConfusionMatrixRecord) -> IfResult<Self> {
        let n = record.labels.len();
        if record.counts.len() != n {
            return Err(ImmuForgeError::Validation(format!(
                "Confusion matrix has {} rows for {} labels",
                record.counts.len(),
                n
            )));
        }
        if let Some(row) = record.counts.iter().find(|row| row.len() != n + 1) {
            return Err(ImmuForgeError::Validation(format!(
                "Confusion matrix row has {} columns, expected {}",
                row.len(),
                n + 1
            )));
        }
        Ok(Self {
            labels: record.labels,
            counts: record.counts,
        })
    }
}

impl ConfusionMatrix {
    pub fn new(labels: &LabelSet) -> Self {
        let n = labels.len();
        Self {
            labels: labels
                .iter()
                .map(|l| labels.name(l).unwrap_or("?").to_string())
                .collect(),
            counts: vec![vec![0; n + 1]; n],
        }
    }

    pub fn compute(classifier: &Classifier, individuals: &[Individual]) -> IfResult<Self> {
        let mut matrix = Self::new(classifier.labels());
        for ind in individuals {
            let inferred = classifier.classify(ind)?;
            matrix.record(ind.label(), inferred)?;
        }
        Ok(matrix)
    }

    pub fn record(&mut self, truth: Label, inferred: Option<Label>) -> IfResult<()> {
        let n = self.labels.len();
        let col = inferred.map(|l| l.index()).unwrap_or(n);
        let row = self
            .counts
            .get_mut(truth.index())
            .ok_or_else(|| ImmuForgeError::Validation(format!("Unknown label {}", truth)))?;
        let cell = row
            .get_mut(col)
            .ok_or_else(|| ImmuForgeError::Validation(format!("Unknown label {:?}", inferred)))?;
        *cell += 1;
        Ok(())
    }

    pub fn label_names(&self) -> &[String] {
        &self.labels
    }

    pub fn count(&self, truth: Label, inferred: Option<Label>) -> usize {
        let col = inferred.map(|l| l.index()).unwrap_or(self.labels.len());
        self.counts
            .get(truth.index())
            .and_then(|row| row.get(col))
            .copied()
            .unwrap_or(0)
    }

    pub fn unclassified(&self, truth: Label) -> usize {
        self.count(truth, None)
    }

    pub fn row(&self, truth: Label) -> Option<&[usize]> {
        self.counts.get(truth.index()).map(|r| r.as_slice())
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn hits(&self) -> usize {
        self.counts
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(i))
            .sum()
    }

    /// Diagonal over total; `0.0` for an empty matrix.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Fraction of each true label classified correctly; `0.0` for labels
    /// with no individuals.
    pub fn per_label_recall(&self) -> Vec<(Label, f64)> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let total: usize = row.iter().sum();
                let recall = if total == 0 {
                    0.0
                } else {
                    row.get(i).copied().unwrap_or(0) as f64 / total as f64
                };
                (Label(i as u16), recall)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Detector;
    use crate::genome::{gray_encode, parse_symbols};

    fn ind(label: u16, bits: &str) -> Individual {
        Individual::parse(Label(label), bits).unwrap()
    }

    fn labelled(counts: &[(u16, usize)]) -> Vec<Individual> {
        counts
            .iter()
            .flat_map(|&(label, n)| (0..n).map(move |_| ind(label, "01")))
            .collect()
    }

    fn classifier() -> Classifier {
        let labels = LabelSet::new(["neg", "pos"]).unwrap();
        let mut detectors = BTreeMap::new();
        detectors.insert(
            Label(0),
            Detector::new(
                Label(0),
                gray_encode(128),
                parse_symbols("000").unwrap(),
                parse_symbols("000").unwrap(),
            )
            .unwrap(),
        );
        detectors.insert(
            Label(1),
            Detector::new(
                Label(1),
                gray_encode(128),
                parse_symbols("111").unwrap(),
                parse_symbols("000").unwrap(),
            )
            .unwrap(),
        );
        Classifier::new(labels, detectors).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let mut rng = Rng::with_seed(1);
        let exp = Experiment::split(labelled(&[(0, 7), (1, 3)]), 0.25, &mut rng).unwrap();
        assert_eq!(exp.test.len(), 2);
        assert_eq!(exp.train.len(), 8);
    }

    #[test]
    fn test_split_zero_fraction_keeps_everything_for_training() {
        let mut rng = Rng::with_seed(1);
        let exp = Experiment::split(labelled(&[(0, 4)]), 0.0, &mut rng).unwrap();
        assert!(exp.test.is_empty());
        assert_eq!(exp.train.len(), 4);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let mut rng = Rng::with_seed(1);
        assert!(Experiment::split(labelled(&[(0, 4)]), 1.0, &mut rng).is_err());
        assert!(Experiment::split(labelled(&[(0, 4)]), -0.1, &mut rng).is_err());
        assert!(Experiment::split(Vec::new(), 0.5, &mut rng).is_err());
    }

    #[test]
    fn test_subsample_unbalanced() {
        let mut rng = Rng::with_seed(2);
        let out = Experiment::subsample(labelled(&[(0, 10), (1, 10)]), 5, false, &mut rng);
        assert_eq!(out.len(), 5);
        let all = Experiment::subsample(labelled(&[(0, 3)]), 0, false, &mut rng);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_subsample_balanced_quota() {
        let mut rng = Rng::with_seed(3);
        let out = Experiment::subsample(labelled(&[(0, 20), (1, 4)]), 10, true, &mut rng);
        let zeros = out.iter().filter(|i| i.label() == Label(0)).count();
        let ones = out.iter().filter(|i| i.label() == Label(1)).count();
        assert_eq!(zeros, 5);
        assert_eq!(ones, 4);
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let c = classifier();
        let data = vec![
            ind(0, "000"),
            ind(0, "001"),
            ind(0, "111"),
            ind(1, "111"),
            ind(1, "010"),
        ];
        let m = ConfusionMatrix::compute(&c, &data).unwrap();
        assert_eq!(m.count(Label(0), Some(Label(0))), 2);
        assert_eq!(m.count(Label(0), Some(Label(1))), 1);
        assert_eq!(m.count(Label(1), Some(Label(1))), 1);
        // "010" matches 2/3 of "000" only: wrongly classified as neg.
        assert_eq!(m.count(Label(1), Some(Label(0))), 1);
        assert_eq!(m.total(), 5);
        assert!((m.hit_rate() - 0.6).abs() < 1e-12);

        let recall = m.per_label_recall();
        assert!((recall[0].1 - 2.0 / 3.0).abs() < 1e-12);
        assert!((recall[1].1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unclassified_column() {
        let labels = LabelSet::new(["neg", "pos"]).unwrap();
        let mut m = ConfusionMatrix::new(&labels);
        m.record(Label(1), None).unwrap();
        assert_eq!(m.unclassified(Label(1)), 1);
        assert_eq!(m.row(Label(1)).unwrap(), &[0, 0, 1]);
        assert_eq!(m.hit_rate(), 0.0);
        assert!(m.record(Label(5), None).is_err());
    }

    #[test]
    fn test_empty_matrix_hit_rate_is_zero() {
        let m = ConfusionMatrix::compute(&classifier(), &[]).unwrap();
        assert_eq!(m.hit_rate(), 0.0);
        assert!(m.per_label_recall().iter().all(|(_, r)| *r == 0.0));
    }

    #[test]
    fn test_wrong_length_is_an_error() {
        assert!(ConfusionMatrix::compute(&classifier(), &[ind(0, "00")]).is_err());
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let labels = LabelSet::new(["neg", "pos"]).unwrap();
        let mut m = ConfusionMatrix::new(&labels);
        m.record(Label(0), Some(Label(0))).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(serde_json::from_str::<ConfusionMatrix>(&json).unwrap(), m);

        let short_row = r#"{"labels":["neg","pos"],"counts":[[1],[0,0,0]]}"#;
        assert!(serde_json::from_str::<ConfusionMatrix>(short_row).is_err());
        let missing_row = r#"{"labels":["neg","pos"],"counts":[[1,0,0]]}"#;
        assert!(serde_json::from_str::<ConfusionMatrix>(missing_row).is_err());
    }
}
