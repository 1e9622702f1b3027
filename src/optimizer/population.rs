use super::crossover::Crossover;
use super::fitness::{cooperative_fitness, standalone_fitness};
use super::mutation::Mutation;
use super::selection::RouletteSelector;
use crate::detector::{Detector, DetectorFactory};
use crate::error::{IfResult, ImmuForgeError};
use crate::individual::Individual;
use crate::labels::{Label, LabelSet};
use fastrand::Rng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Detectors partitioned by class. Reproduction only combines members of the
/// same species, so detectors never change class.
#[derive(Debug, Clone)]
pub struct Population {
    species: BTreeMap<Label, Vec<Detector>>,
}

impl Population {
    /// Random initial population.
    ///
    /// Without a class bias every label gets exactly `size_per_class`
    /// detectors. With one, `size_per_class * labels` detectors are drawn
    /// with biased labels and grouped, so species sizes follow the bias. A
    /// label the draw missed entirely gets a single detector to keep its
    /// species alive.
    pub fn random(
        labels: &LabelSet,
        factory: &DetectorFactory,
        size_per_class: usize,
        rng: &mut Rng,
    ) -> IfResult<Self> {
        let drawn: Vec<Detector> = match factory.class_bias() {
            None => labels
                .iter()
                .flat_map(|label| (0..size_per_class).map(move |_| label))
                .map(|label| factory.make_detector_for(label, rng))
                .collect(),
            Some(bias) => {
                let mut drawn: Vec<Detector> = (0..size_per_class * labels.len())
                    .map(|_| factory.make_detector(labels, rng))
                    .collect();
                for label in labels.iter() {
                    if !drawn.iter().any(|d| d.label() == label) {
                        debug!(%label, bias, "biased draw left species empty, seeding one detector");
                        drawn.push(factory.make_detector_for(label, rng));
                    }
                }
                drawn
            }
        };
        Self::from_detectors(labels, drawn)
    }

    /// Groups arbitrary detectors by their label. Labels without detectors
    /// are rejected since every class needs a representative.
    pub fn from_detectors(labels: &LabelSet, detectors: Vec<Detector>) -> IfResult<Self> {
        let mut species: BTreeMap<Label, Vec<Detector>> =
            labels.iter().map(|l| (l, Vec::new())).collect();
        for d in detectors {
            species
                .get_mut(&d.label())
                .ok_or_else(|| {
                    ImmuForgeError::Validation(format!("Detector has unknown label {}", d.label()))
                })?
                .push(d);
        }
        if let Some((label, _)) = species.iter().find(|(_, v)| v.is_empty()) {
            return Err(ImmuForgeError::Validation(format!(
                "No detectors for label '{}'",
                labels.name(*label).unwrap_or("?")
            )));
        }
        Ok(Self { species })
    }

    pub fn species(&self, label: Label) -> Option<&[Detector]> {
        self.species.get(&label).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, &Vec<Detector>)> {
        self.species.iter()
    }

    pub fn len(&self) -> usize {
        self.species.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Standalone fitness for every detector, evaluated in parallel. Each
    /// worker writes only the detector it owns.
    pub fn evaluate_standalone(&mut self, individuals: &[Individual]) {
        for members in self.species.values_mut() {
            members.par_iter_mut().for_each(|d| {
                let f = standalone_fitness(d, individuals);
                d.set_fitness(f);
            });
        }
    }

    /// Cooperative fitness against a snapshot of the current bests, taken
    /// before any species is rescored.
    pub fn evaluate_cooperative(&mut self, individuals: &[Individual]) {
        let partners = self.best_snapshot();
        for members in self.species.values_mut() {
            members.par_iter_mut().for_each(|d| {
                let f = cooperative_fitness(d, &partners, individuals);
                d.set_fitness(f);
            });
        }
    }

    /// Stable sort of every species by descending fitness.
    pub fn sort(&mut self) {
        for members in self.species.values_mut() {
            members.sort_by(Detector::by_fitness_desc);
        }
    }

    pub fn best(&self, label: Label) -> Option<&Detector> {
        self.species.get(&label).and_then(|v| v.first())
    }

    /// Index-0 detector of every non-empty species.
    pub fn best_snapshot(&self) -> BTreeMap<Label, Detector> {
        self.species
            .iter()
            .filter_map(|(label, v)| v.first().map(|d| (*label, d.clone())))
            .collect()
    }

    /// Replaces every species wholesale with offspring bred from the current,
    /// sorted generation. The first `elitism` members of each species are
    /// carried over unchanged.
    pub fn breed(
        &mut self,
        crossover: &Crossover,
        mutation: &Mutation,
        elitism: usize,
        rng: &mut Rng,
    ) -> IfResult<()> {
        for members in self.species.values_mut() {
            let target = members.len();
            let mut next: Vec<Detector> = Vec::with_capacity(target);
            next.extend(members.iter().take(elitism.min(target)).cloned());

            let selector = RouletteSelector::new(members)?;
            while next.len() < target {
                let p1 = selector.select(rng);
                let p2 = selector.select(rng);
                let child = crossover.apply(p1, p2, rng)?;
                next.push(mutation.apply(&child, rng)?);
            }

            *members = next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{gray_encode, parse_symbols};

    fn labels() -> LabelSet {
        LabelSet::new(["A", "B", "C"]).unwrap()
    }

    fn data() -> Vec<Individual> {
        vec![
            Individual::parse(Label(0), "0000").unwrap(),
            Individual::parse(Label(1), "1100").unwrap(),
            Individual::parse(Label(2), "1111").unwrap(),
        ]
    }

    #[test]
    fn test_random_population_is_balanced() {
        let mut rng = Rng::with_seed(1);
        let factory = DetectorFactory::new(4, None, 0.2).unwrap();
        let pop = Population::random(&labels(), &factory, 7, &mut rng).unwrap();
        assert_eq!(pop.len(), 21);
        for label in labels().iter() {
            let s = pop.species(label).unwrap();
            assert_eq!(s.len(), 7);
            assert!(s.iter().all(|d| d.label() == label));
        }
    }

    #[test]
    fn test_evaluate_and_sort() {
        let mut rng = Rng::with_seed(2);
        let factory = DetectorFactory::new(4, None, 0.2).unwrap();
        let mut pop = Population::random(&labels(), &factory, 10, &mut rng).unwrap();
        pop.evaluate_standalone(&data());
        pop.sort();
        for (_, members) in pop.iter() {
            for pair in members.windows(2) {
                assert!(pair[0].fitness().unwrap() >= pair[1].fitness().unwrap());
            }
        }
    }

    #[test]
    fn test_breeding_keeps_species_closed_and_sized() {
        let mut rng = Rng::with_seed(3);
        let factory = DetectorFactory::new(4, None, 0.2).unwrap();
        let mut pop = Population::random(&labels(), &factory, 9, &mut rng).unwrap();
        pop.evaluate_standalone(&data());
        pop.sort();
        pop.breed(
            &Crossover::new(0.7).unwrap(),
            &Mutation::new(0.1).unwrap(),
            0,
            &mut rng,
        )
        .unwrap();
        for label in labels().iter() {
            let s = pop.species(label).unwrap();
            assert_eq!(s.len(), 9);
            assert!(s.iter().all(|d| d.label() == label));
            assert!(s.iter().all(|d| d.fitness().is_none()));
        }
    }

    #[test]
    fn test_elites_survive_unchanged() {
        let mut rng = Rng::with_seed(4);
        let factory = DetectorFactory::new(4, None, 0.2).unwrap();
        let mut pop = Population::random(&labels(), &factory, 6, &mut rng).unwrap();
        pop.evaluate_standalone(&data());
        pop.sort();
        let elites = pop.best_snapshot();
        pop.breed(
            &Crossover::new(1.0).unwrap(),
            &Mutation::new(1.0).unwrap(),
            1,
            &mut rng,
        )
        .unwrap();
        for (label, elite) in elites {
            assert_eq!(pop.best(label).unwrap(), &elite);
        }
    }

    #[test]
    fn test_from_detectors_requires_every_label() {
        let d = Detector::new(
            Label(0),
            gray_encode(1),
            parse_symbols("0101").unwrap(),
            parse_symbols("0000").unwrap(),
        )
        .unwrap();
        assert!(Population::from_detectors(&labels(), vec![d.clone()]).is_err());

        let single = LabelSet::new(["A"]).unwrap();
        let pop = Population::from_detectors(&single, vec![d]).unwrap();
        assert_eq!(pop.len(), 1);
    }

    #[test]
    fn test_class_bias_shapes_species() {
        let mut rng = Rng::with_seed(5);
        let factory = DetectorFactory::new(4, Some(1.0), 0.2).unwrap();
        let pop = Population::random(&labels(), &factory, 5, &mut rng).unwrap();
        // Every draw goes to the first label; the others are seeded once.
        assert_eq!(pop.species(Label(0)).unwrap().len(), 15);
        assert_eq!(pop.species(Label(1)).unwrap().len(), 1);
        assert_eq!(pop.species(Label(2)).unwrap().len(), 1);
        assert_eq!(pop.len(), 17);
    }

    #[test]
    fn test_biased_species_survive_breeding() {
        let mut rng = Rng::with_seed(6);
        let factory = DetectorFactory::new(4, Some(0.0), 0.2).unwrap();
        let mut pop = Population::random(&labels(), &factory, 4, &mut rng).unwrap();
        assert_eq!(pop.species(Label(0)).unwrap().len(), 1);
        pop.evaluate_standalone(&data());
        pop.sort();
        pop.breed(
            &Crossover::new(0.7).unwrap(),
            &Mutation::new(0.1).unwrap(),
            0,
            &mut rng,
        )
        .unwrap();
        assert_eq!(pop.species(Label(0)).unwrap().len(), 1);
        assert_eq!(pop.len(), 13);
    }
}
