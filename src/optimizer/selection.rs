use crate::detector::Detector;
use crate::error::{IfResult, ImmuForgeError};
use fastrand::Rng;
use tracing::trace;

/// Fitness-proportionate (roulette wheel) selection over a scored species.
///
/// Fitness must be non-negative; undefined fitness counts as zero. When the
/// total is zero the wheel degenerates and selection falls back to a uniform
/// choice.
pub struct RouletteSelector<'a> {
    population: &'a [Detector],
    total_fitness: f64,
}

impl<'a> RouletteSelector<'a> {
    pub fn new(population: &'a [Detector]) -> IfResult<Self> {
        if population.is_empty() {
            return Err(ImmuForgeError::SelectionImpossible(
                "Cannot select from an empty population".to_string(),
            ));
        }

        let mut total_fitness = 0.0;
        for d in population {
            let f = d.fitness_or_zero();
            if !(f >= 0.0) {
                return Err(ImmuForgeError::SelectionImpossible(format!(
                    "Roulette requires non-negative fitness, found {}",
                    f
                )));
            }
            total_fitness += f;
        }

        Ok(Self {
            population,
            total_fitness,
        })
    }

    pub fn total_fitness(&self) -> f64 {
        self.total_fitness
    }

    pub fn select(&self, rng: &mut Rng) -> &'a Detector {
        if self.total_fitness <= 0.0 {
            trace!("zero total fitness, selecting uniformly");
            return &self.population[rng.usize(0..self.population.len())];
        }

        let u = rng.f64() * self.total_fitness;
        let mut cumulative = 0.0;
        let mut last_positive = 0;
        for (i, d) in self.population.iter().enumerate() {
            let f = d.fitness_or_zero();
            if f > 0.0 {
                last_positive = i;
            }
            cumulative += f;
            if f > 0.0 && cumulative >= u {
                return d;
            }
        }

        // Rounding can leave `cumulative` a hair below `u`.
        &self.population[last_positive]
    }
}
