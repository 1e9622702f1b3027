use crate::classifier::Classifier;
use crate::config::{Config, Variant};
use crate::detector::DetectorFactory;
use crate::error::IfResult;
use crate::individual::TrainingSet;
use crate::labels::Label;
use crate::optimizer::crossover::Crossover;
use crate::optimizer::mutation::Mutation;
use crate::optimizer::population::Population;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{debug, info, warn};

pub struct TrainingOptions {
    pub num_threads: Option<usize>,
    pub population_size_per_class: usize,
    pub class_bias: Option<f64>,
    pub generality_bias: f64,
    pub crossover_rate: f64,
    /// Per-symbol rate, already scaled if the config asks for it.
    pub mutation_rate: f64,
    pub max_generations: i64,
    pub variant: Variant,
    pub elitism: usize,
    pub pass_limit: Option<u64>,
    pub max_time: Option<Duration>,
}

impl TrainingOptions {
    pub fn from_config(cfg: &Config, feature_len: usize) -> Self {
        Self {
            num_threads: cfg.run.threads,
            population_size_per_class: cfg.evolution.population_size_per_class,
            class_bias: cfg.detectors.class_bias,
            generality_bias: cfg.detectors.generality_bias,
            crossover_rate: cfg.evolution.crossover_rate,
            mutation_rate: cfg.effective_mutation_rate(feature_len),
            max_generations: cfg.evolution.max_generations,
            variant: cfg.evolution.variant,
            elitism: cfg.evolution.elitism,
            pass_limit: cfg.run.pass_limit,
            max_time: cfg.run.max_seconds.map(Duration::from_secs),
        }
    }

    /// True when neither generations, passes nor time bound the run.
    pub fn is_unbounded(&self) -> bool {
        self.max_generations <= 0 && self.pass_limit.is_none() && self.max_time.is_none()
    }

    fn generation_limit_reached(&self, generation: u64) -> bool {
        self.max_generations > 0 && generation > self.max_generations as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    Initializing,
    Evaluating,
    Breeding,
    Finalizing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    GenerationLimit,
    PassLimit,
    TimeLimit,
    Cancelled,
}

/// Snapshot handed to the progress callback after each evaluation pass.
#[derive(Debug, Clone)]
pub struct GenerationStats {
    pub generation: u64,
    pub passes: u64,
    pub best_fitness: Vec<(Label, f64)>,
    pub species_sizes: Vec<(Label, usize)>,
    pub mean_fitness: f64,
    pub elapsed: Duration,
}

pub struct TrainingResult {
    pub classifier: Classifier,
    /// Generations bred before finalizing.
    pub generations: u64,
    /// Fitness evaluation passes run, the finalizing one included.
    pub passes: u64,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

/// A trait for receiving updates during training.
/// Boolean return value indicates if training should continue (true) or stop (false).
pub trait ProgressCallback: Send + Sync {
    fn on_generation(&self, stats: &GenerationStats) -> bool;
}

impl<F> ProgressCallback for F
where
    F: Fn(&GenerationStats) -> bool + Send + Sync,
{
    fn on_generation(&self, stats: &GenerationStats) -> bool {
        self(stats)
    }
}

pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_generation(&self, _stats: &GenerationStats) -> bool {
        true
    }
}

pub struct Trainer {
    training_set: Arc<TrainingSet>,
    options: TrainingOptions,
}

impl Trainer {
    pub fn new(training_set: Arc<TrainingSet>, options: TrainingOptions) -> Self {
        Self {
            training_set,
            options,
        }
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    /// Runs the generational loop and freezes the best detector of each class.
    ///
    /// With `max_generations <= 0` the loop only ends through the pass limit,
    /// the time limit or the callback returning `false`. Without any of those
    /// it never terminates.
    pub fn run<CB: ProgressCallback>(
        &self,
        seed: Option<u64>,
        callback: CB,
    ) -> IfResult<TrainingResult> {
        match self.options.num_threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
                pool.install(|| self.run_inner(seed, &callback))
            }
            None => self.run_inner(seed, &callback),
        }
    }

    fn run_inner<CB: ProgressCallback>(
        &self,
        seed: Option<u64>,
        callback: &CB,
    ) -> IfResult<TrainingResult> {
        let opts = &self.options;
        let set = &self.training_set;

        // 1. Operators
        let factory = DetectorFactory::new(set.feature_len(), opts.class_bias, opts.generality_bias)?;
        let crossover = Crossover::new(opts.crossover_rate)?;
        let mutation = Mutation::new(opts.mutation_rate)?;

        let mut rng = match seed {
            Some(s) => fastrand::Rng::with_seed(s),
            None => fastrand::Rng::new(),
        };

        if opts.is_unbounded() {
            warn!("no generation, pass or time limit set; training stops only when the callback says so");
        }

        info!(
            variant = %opts.variant,
            labels = set.labels().len(),
            individuals = set.len(),
            features = set.feature_len(),
            population = opts.population_size_per_class,
            "starting training"
        );

        // 2. Initial population
        debug!(phase = %Phase::Initializing);
        let mut population = Population::random(
            set.labels(),
            &factory,
            opts.population_size_per_class,
            &mut rng,
        )?;

        let start = Instant::now();
        let mut generation: u64 = 0;
        let mut passes: u64 = 0;
        let mut last_pct: Option<u64> = None;

        // 3. Main loop
        let stop_reason = loop {
            if opts.generation_limit_reached(generation) {
                break StopReason::GenerationLimit;
            }
            // Keep one pass in reserve for finalizing.
            if let Some(limit) = opts.pass_limit {
                if passes + 1 >= limit {
                    break StopReason::PassLimit;
                }
            }
            if let Some(limit) = opts.max_time {
                if start.elapsed() >= limit {
                    break StopReason::TimeLimit;
                }
            }

            debug!(phase = %Phase::Evaluating, generation);
            self.evaluate(&mut population);
            passes += 1;

            let stats = collect_stats(&population, generation, passes, start.elapsed());
            debug!(
                generation,
                mean = stats.mean_fitness,
                best = ?stats.best_fitness,
                "generation evaluated"
            );
            if opts.max_generations > 0 {
                let pct = generation * 100 / opts.max_generations as u64;
                if pct % 10 == 0 && last_pct != Some(pct) {
                    info!("{}% completed", pct);
                    last_pct = Some(pct);
                }
            }

            if !callback.on_generation(&stats) {
                break StopReason::Cancelled;
            }

            debug!(phase = %Phase::Breeding, generation);
            population.breed(&crossover, &mutation, opts.elitism, &mut rng)?;
            generation += 1;
        };

        // 4. Finalize
        // Both variants freeze the best detectors by standalone fitness.
        debug!(phase = %Phase::Finalizing, reason = %stop_reason);
        population.evaluate_standalone(set.individuals());
        population.sort();
        passes += 1;

        let classifier = Classifier::new(set.labels().clone(), population.best_snapshot())?;
        for d in classifier.detectors() {
            info!(
                label = set.labels().name(d.label()).unwrap_or("?"),
                "{}", d
            );
        }

        let elapsed = start.elapsed();
        info!(
            phase = %Phase::Done,
            generations = generation,
            passes,
            reason = %stop_reason,
            "training finished in {:.2?}",
            elapsed
        );

        Ok(TrainingResult {
            classifier,
            generations: generation,
            passes,
            stop_reason,
            elapsed,
        })
    }

    /// One full fitness pass for the configured variant, leaving every
    /// species sorted best-first.
    fn evaluate(&self, population: &mut Population) {
        let individuals = self.training_set.individuals();
        population.evaluate_standalone(individuals);
        population.sort();
        if self.options.variant == Variant::CoEvolutionary {
            population.evaluate_cooperative(individuals);
            population.sort();
        }
    }
}

fn collect_stats(
    population: &Population,
    generation: u64,
    passes: u64,
    elapsed: Duration,
) -> GenerationStats {
    let mut total = 0.0;
    let mut count = 0usize;
    let mut best_fitness = Vec::new();
    let mut species_sizes = Vec::new();
    for (label, members) in population.iter() {
        species_sizes.push((*label, members.len()));
        if let Some(best) = members.first() {
            best_fitness.push((*label, best.fitness_or_zero()));
        }
        for d in members {
            total += d.fitness_or_zero();
            count += 1;
        }
    }
    GenerationStats {
        generation,
        passes,
        best_fitness,
        species_sizes,
        mean_fitness: if count > 0 { total / count as f64 } else { 0.0 },
        elapsed,
    }
}
