//! Substitution errors in simulated reads.

use rand::prelude::*;
use rand_distr::Poisson;
use std::fmt;

use crate::encoding::substitutes;
use crate::errors::{AsesimError, Result};

/// A single base substitution at a 0-based position of a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Substitution {
    pub position: usize,
    pub original: u8,
    pub replacement: u8,
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}]{}->{}",
            self.position, self.original as char, self.replacement as char
        )
    }
}

#[derive(Clone, Debug)]
pub struct MutationEngine {
    error_rate: f64,
    mutation_sampler: Option<Poisson<f64>>,
}

impl MutationEngine {
    /// Create an engine introducing on average `error_rate` substitutions per read.
    pub fn new(error_rate: f64) -> Result<Self> {
        if !error_rate.is_finite() || error_rate < 0. {
            return Err(AsesimError::InvalidParameter(format!(
                "Error rate must be a non-negative number, got {error_rate}"
            )));
        }
        let mutation_sampler = if error_rate > 0. {
            Some(
                Poisson::new(error_rate)
                    .map_err(|err| AsesimError::InvalidParameter(format!("{err}")))?,
            )
        } else {
            None
        };
        Ok(Self {
            error_rate,
            mutation_sampler,
        })
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Mutate a copy of `sequence` and report the applied substitutions.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        sequence: &[u8],
        rng: &mut R,
    ) -> (Vec<u8>, Vec<Substitution>) {
        let mut mutated = sequence.to_vec();
        let n_mutations = match &self.mutation_sampler {
            Some(sampler) => (sampler.sample(rng) as usize).min(sequence.len()),
            None => 0,
        };
        if n_mutations == 0 {
            return (mutated, Vec::new());
        }

        let mut positions = rand::seq::index::sample(rng, sequence.len(), n_mutations).into_vec();
        positions.sort_unstable();
        let substitutions = apply_substitutions(&mut mutated, &positions, rng);
        (mutated, substitutions)
    }
}

/// Substitute the bases at `positions` in ascending order.
///
/// Each base is replaced uniformly by one of its three alternatives. Positions
/// holding a non-canonical base are left as they are and are not reported.
pub fn apply_substitutions<R: Rng + ?Sized>(
    sequence: &mut [u8],
    positions: &[usize],
    rng: &mut R,
) -> Vec<Substitution> {
    let mut positions = positions.to_vec();
    positions.sort_unstable();
    positions.dedup();

    positions
        .into_iter()
        .filter_map(|position| {
            let original = sequence[position];
            let replacement = *substitutes(original)?.choose(rng)?;
            sequence[position] = replacement;
            Some(Substitution {
                position,
                original,
                replacement,
            })
        })
        .collect()
}
