use rand::prelude::*;
use rand_distr::Binomial;

use crate::errors::{AsesimError, Result};

/// Draw once from a multinomial distribution.
///
/// The draw is decomposed into conditional binomial draws. The last category
/// with positive mass takes whatever is left, so the result always sums to
/// `trials` and categories with zero probability never receive counts.
/// `probabilities` does not need to be normalized.
pub fn multinomial<R: Rng + ?Sized>(
    rng: &mut R,
    trials: u64,
    probabilities: &[f64],
) -> Result<Vec<u64>> {
    if let Some(p) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.) {
        return Err(AsesimError::InvalidProbabilities(format!(
            "Invalid category probability {p}"
        )));
    }
    let last = match probabilities.iter().rposition(|&p| p > 0.) {
        Some(last) => last,
        None => {
            return Err(AsesimError::InvalidProbabilities(format!(
                "No probability mass in {} categories",
                probabilities.len()
            )));
        }
    };

    let mut counts = vec![0; probabilities.len()];
    let mut remaining_trials = trials;
    let mut remaining_mass: f64 = probabilities[..=last].iter().sum();

    for (category, &p) in probabilities[..last].iter().enumerate() {
        if remaining_trials == 0 {
            break;
        }
        if p == 0. {
            continue;
        }
        let conditional = (p / remaining_mass).clamp(0., 1.);
        let draw = Binomial::new(remaining_trials, conditional)
            .map_err(|err| AsesimError::InvalidProbabilities(format!("{err}")))?
            .sample(rng);
        counts[category] = draw;
        remaining_trials -= draw;
        remaining_mass -= p;
    }
    counts[last] = remaining_trials;

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn conserves_trials() {
        let mut rng = StdRng::seed_from_u64(42);
        for trials in [0, 1, 7, 1000, 123_456] {
            let counts = multinomial(&mut rng, trials, &[0.1, 0.2, 0.3, 0.4]).unwrap();
            assert_eq!(counts.iter().sum::<u64>(), trials);
        }
    }

    #[test]
    fn zero_probability_categories_stay_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let counts = multinomial(&mut rng, 10_000, &[0., 2., 0., 1., 0.]).unwrap();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);
        assert_eq!(counts[4], 0);
        assert_eq!(counts[1] + counts[3], 10_000);
    }

    #[test]
    fn single_category() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(multinomial(&mut rng, 17, &[0.3]).unwrap(), vec![17]);
    }

    #[test]
    fn approximate_proportions() {
        let mut rng = StdRng::seed_from_u64(3);
        let counts = multinomial(&mut rng, 100_000, &[0.75, 0.25]).unwrap();
        let fraction = counts[0] as f64 / 100_000.;
        assert!((fraction - 0.75).abs() < 0.01);
    }

    #[test]
    fn reproducible_with_seed() {
        let a = multinomial(&mut StdRng::seed_from_u64(11), 500, &[1., 1., 1.]).unwrap();
        let b = multinomial(&mut StdRng::seed_from_u64(11), 500, &[1., 1., 1.]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_probabilities() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(multinomial(&mut rng, 10, &[]).is_err());
        assert!(multinomial(&mut rng, 10, &[0., 0.]).is_err());
        assert!(multinomial(&mut rng, 10, &[0.5, -0.1]).is_err());
        assert!(multinomial(&mut rng, 10, &[f64::NAN, 1.]).is_err());
    }
}
