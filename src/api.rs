use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::IfResult;
use crate::experiment::{ConfusionMatrix, Experiment};
use crate::individual::{Individual, TrainingSet};
use crate::labels::LabelSet;
use crate::optimizer::{NoProgress, ProgressCallback, StopReason, Trainer, TrainingOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Everything one train-and-evaluate run produces.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentReport {
    pub classifier: Classifier,
    pub train_size: usize,
    pub test_size: usize,
    pub train_matrix: ConfusionMatrix,
    pub test_matrix: ConfusionMatrix,
    pub train_hit_rate: f64,
    pub test_hit_rate: f64,
    pub generations: u64,
    pub passes: u64,
    pub stop_reason: StopReason,
    pub elapsed_secs: f64,
}

/// Service: split the data, train on the training partition and score the
/// frozen classifier on both partitions.
pub fn train_and_evaluate(
    labels: LabelSet,
    individuals: Vec<Individual>,
    config: &Config,
    test_fraction: f64,
) -> IfResult<ExperimentReport> {
    train_and_evaluate_with_progress(labels, individuals, config, test_fraction, NoProgress)
}

pub fn train_and_evaluate_with_progress<CB: ProgressCallback>(
    labels: LabelSet,
    individuals: Vec<Individual>,
    config: &Config,
    test_fraction: f64,
    callback: CB,
) -> IfResult<ExperimentReport> {
    config.validate()?;

    let mut rng = match config.run.seed {
        Some(s) => fastrand::Rng::with_seed(s),
        None => fastrand::Rng::new(),
    };
    let Experiment { train, test } = Experiment::split(individuals, test_fraction, &mut rng)?;
    info!(train = train.len(), test = test.len(), "data split");

    let training_set = TrainingSet::new(labels, train)?;
    let options = TrainingOptions::from_config(config, training_set.feature_len());
    let training_set = Arc::new(training_set);

    let trainer = Trainer::new(Arc::clone(&training_set), options);
    let result = trainer.run(config.run.seed, callback)?;

    let train_matrix = ConfusionMatrix::compute(&result.classifier, training_set.individuals())?;
    let test_matrix = ConfusionMatrix::compute(&result.classifier, &test)?;
    info!(
        train = train_matrix.hit_rate(),
        test = test_matrix.hit_rate(),
        "hit rates"
    );

    Ok(ExperimentReport {
        train_size: training_set.len(),
        test_size: test.len(),
        train_hit_rate: train_matrix.hit_rate(),
        test_hit_rate: test_matrix.hit_rate(),
        train_matrix,
        test_matrix,
        generations: result.generations,
        passes: result.passes,
        stop_reason: result.stop_reason,
        elapsed_secs: result.elapsed.as_secs_f64(),
        classifier: result.classifier,
    })
}

impl ExperimentReport {
    pub fn to_json(&self) -> IfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
