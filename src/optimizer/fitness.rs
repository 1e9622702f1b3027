use crate::classifier::infer_label;
use crate::detector::Detector;
use crate::individual::Individual;
use crate::labels::Label;
use std::collections::BTreeMap;

/// Maps a raw score in `[-n, n]` onto `[0, 1]`.
#[inline(always)]
pub fn normalize(raw: i64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    (raw as f64 + n) / (2.0 * n)
}

/// Scores a detector on its own: firing on its own class and staying silent
/// on foreign classes each earn a point, the opposite outcomes lose one.
pub fn standalone_fitness(detector: &Detector, individuals: &[Individual]) -> f64 {
    let raw: i64 = individuals
        .iter()
        .map(|ind| {
            let own = detector.label() == ind.label();
            if detector.fires(ind) == own {
                1
            } else {
                -1
            }
        })
        .sum();
    normalize(raw, individuals.len())
}

/// Scores a detector by how well it classifies when teamed with the current
/// best detector of every other class. Unclassified counts as a miss.
///
/// `partners` is a snapshot taken before the pass; the candidate replaces
/// the partner stored under its own label.
pub fn cooperative_fitness(
    detector: &Detector,
    partners: &BTreeMap<Label, Detector>,
    individuals: &[Individual],
) -> f64 {
    let team: Vec<&Detector> = team_with(detector, partners);

    let raw: i64 = individuals
        .iter()
        .map(|ind| {
            if infer_label(team.iter().copied(), ind) == Some(ind.label()) {
                1
            } else {
                -1
            }
        })
        .sum();
    normalize(raw, individuals.len())
}

/// Detectors in label order with `candidate` standing in for its own class.
fn team_with<'a>(candidate: &'a Detector, partners: &'a BTreeMap<Label, Detector>) -> Vec<&'a Detector> {
    let mut team: Vec<&Detector> = Vec::with_capacity(partners.len() + 1);
    let mut placed = false;
    for (label, d) in partners {
        if !placed && candidate.label() < *label {
            team.push(candidate);
            placed = true;
        }
        if *label == candidate.label() {
            team.push(candidate);
            placed = true;
        } else {
            team.push(d);
        }
    }
    if !placed {
        team.push(candidate);
    }
    team
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{gray_encode, parse_symbols};
    use proptest::prelude::*;

    fn det(label: u16, threshold: u8, pattern: &str, mask: &str) -> Detector {
        Detector::new(
            Label(label),
            gray_encode(threshold),
            parse_symbols(pattern).unwrap(),
            parse_symbols(mask).unwrap(),
        )
        .unwrap()
    }

    fn ind(label: u16, bits: &str) -> Individual {
        Individual::parse(Label(label), bits).unwrap()
    }

    fn data() -> Vec<Individual> {
        vec![
            ind(0, "000"),
            ind(0, "001"),
            ind(1, "111"),
            ind(1, "110"),
        ]
    }

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(-4, 4), 0.0);
        assert_eq!(normalize(4, 4), 1.0);
        assert_eq!(normalize(0, 4), 0.5);
    }

    #[test]
    fn test_perfect_standalone_detector() {
        // Matches "00#" strictly above 0.5 only for class 0.
        let d = det(0, 128, "000", "001");
        assert_eq!(standalone_fitness(&d, &data()), 1.0);
    }

    #[test]
    fn test_silent_detector_scores_half() {
        // Never fires: loses on own class, wins on foreign class.
        let d = det(0, 255, "000", "000");
        assert_eq!(standalone_fitness(&d, &data()), 0.5);
    }

    #[test]
    fn test_wildcard_detector_is_silent() {
        let d = det(1, 0, "000", "111");
        assert_eq!(standalone_fitness(&d, &data()), 0.5);
    }

    #[test]
    fn test_cooperative_uses_partners() {
        let mut partners = BTreeMap::new();
        partners.insert(Label(0), det(0, 0, "000", "000"));
        partners.insert(Label(1), det(1, 255, "111", "000"));

        // A good class 1 candidate completes the team.
        let good = det(1, 0, "111", "000");
        assert_eq!(cooperative_fitness(&good, &partners, &data()), 1.0);

        // A silent candidate leaves class 1 to the class 0 partner: all wrong there.
        let silent = det(1, 255, "111", "000");
        assert_eq!(cooperative_fitness(&silent, &partners, &data()), 0.5);
    }

    #[test]
    fn test_team_order_with_missing_own_label() {
        let mut partners = BTreeMap::new();
        partners.insert(Label(0), det(0, 0, "000", "000"));
        partners.insert(Label(2), det(2, 0, "000", "000"));
        let candidate = det(1, 0, "111", "000");
        let team = team_with(&candidate, &partners);
        let order: Vec<u16> = team.iter().map(|d| d.label().0).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    proptest! {
        #[test]
        fn prop_fitness_in_unit_range(
            threshold in any::<u8>(),
            pattern in proptest::collection::vec(any::<bool>(), 3),
            mask in proptest::collection::vec(any::<bool>(), 3),
        ) {
            let d = Detector::new(
                Label(0),
                gray_encode(threshold),
                crate::genome::symbols_from_bools(&pattern),
                crate::genome::symbols_from_bools(&mask),
            ).unwrap();
            let f = standalone_fitness(&d, &data());
            prop_assert!((0.0..=1.0).contains(&f));

            let mut partners = BTreeMap::new();
            partners.insert(Label(1), det(1, 0, "111", "000"));
            let c = cooperative_fitness(&d, &partners, &data());
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
