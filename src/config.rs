use crate::error::{IfResult, ImmuForgeError};
use crate::genome::THRESHOLD_BITS;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::EnumIter;
use strum_macros::{Display, EnumString};

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub evolution: EvolutionParams,
    #[command(flatten)]
    pub detectors: DetectorParams,
    #[command(flatten)]
    pub run: RunParams,
}

/// Training loop flavour.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Every class evolves on its own standalone fitness.
    #[default]
    Evolutionary,
    /// Classes cooperate through fitness shared with the other classes' bests.
    CoEvolutionary,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionParams {
    #[arg(long, default_value_t = 20)]
    pub population_size_per_class: usize,
    #[arg(long, default_value_t = 0.7)]
    pub crossover_rate: f64,
    #[arg(long, default_value_t = 0.05)]
    pub mutation_rate: f64,
    /// Divide the mutation rate by the genome length (8 + 2 * features).
    #[arg(long, default_value_t = false)]
    pub scale_mutation_by_genome: bool,
    /// Zero or negative means no generation limit.
    #[arg(long, default_value_t = 50, allow_hyphen_values = true)]
    pub max_generations: i64,
    #[arg(long, default_value_t = Variant::Evolutionary)]
    pub variant: Variant,
    /// Best detectors per class copied unchanged into the next generation.
    #[arg(long, default_value_t = 0)]
    pub elitism: usize,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Bias of the initial label draw: the first label gets this share of
    /// the initial population, the others split the rest. Unset gives every
    /// label exactly `population_size_per_class` detectors.
    #[arg(long)]
    pub class_bias: Option<f64>,
    /// Probability that a detector position is a wildcard.
    #[arg(long, default_value_t = 0.1)]
    pub generality_bias: f64,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub threads: Option<usize>,
    /// Cap on fitness evaluation passes, the finalizing pass included.
    #[arg(long)]
    pub pass_limit: Option<u64>,
    #[arg(long)]
    pub max_seconds: Option<u64>,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            population_size_per_class: 20,
            crossover_rate: 0.7,
            mutation_rate: 0.05,
            scale_mutation_by_genome: false,
            max_generations: 50,
            variant: Variant::Evolutionary,
            elitism: 0,
        }
    }
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            class_bias: None,
            generality_bias: 0.1,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> IfResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> IfResult<Self> {
        let cfg: Config = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects anything the training loop cannot run with. Nothing is clamped.
    pub fn validate(&self) -> IfResult<()> {
        let evo = &self.evolution;
        check_unit("crossover_rate", evo.crossover_rate)?;
        check_unit("mutation_rate", evo.mutation_rate)?;
        check_unit("generality_bias", self.detectors.generality_bias)?;
        if let Some(bias) = self.detectors.class_bias {
            check_unit("class_bias", bias)?;
        }

        if evo.population_size_per_class == 0 {
            return Err(ImmuForgeError::Config(
                "population_size_per_class must be positive".to_string(),
            ));
        }
        if evo.elitism > evo.population_size_per_class {
            return Err(ImmuForgeError::Config(format!(
                "elitism {} exceeds population_size_per_class {}",
                evo.elitism, evo.population_size_per_class
            )));
        }
        if self.run.pass_limit == Some(0) {
            return Err(ImmuForgeError::Config(
                "pass_limit must allow at least one evaluation pass".to_string(),
            ));
        }
        if self.run.threads == Some(0) {
            return Err(ImmuForgeError::Config("threads must be positive".to_string()));
        }
        Ok(())
    }

    /// Mutation rate actually applied per symbol for a given feature length.
    pub fn effective_mutation_rate(&self, feature_len: usize) -> f64 {
        if self.evolution.scale_mutation_by_genome {
            self.evolution.mutation_rate / genome_length(feature_len) as f64
        } else {
            self.evolution.mutation_rate
        }
    }
}

/// Symbols carried by one detector: threshold, pattern and mask.
pub fn genome_length(feature_len: usize) -> usize {
    THRESHOLD_BITS + 2 * feature_len
}

fn check_unit(name: &str, value: f64) -> IfResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ImmuForgeError::Config(format!(
            "{} = {} is outside [0, 1]",
            name, value
        )))
    }
}
