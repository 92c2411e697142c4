//! Seeded random selection of entities (hosts, metrics, ...) out of the simulated population.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("number of {entity} cannot be < 1; got {count}")]
    CountTooSmall { entity: String, count: usize },

    #[error("number of {entity} ({count}) larger than total {entity}. See --scale ({total})")]
    CountTooLarge {
        entity: String,
        count: usize,
        total: usize,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Pick `count` distinct indices out of `0..total`, without replacement.
///
/// `entity` names what is being sampled in error messages, e.g. `"hosts"`.
pub fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    entity: &str,
    count: usize,
    total: usize,
) -> Result<Vec<usize>> {
    if count < 1 {
        return Err(Error::CountTooSmall {
            entity: entity.to_string(),
            count,
        });
    }
    if count > total {
        return Err(Error::CountTooLarge {
            entity: entity.to_string(),
            count,
            total,
        });
    }

    Ok(index::sample(rng, total, count).into_vec())
}

/// Sample `count` entities and name them `<prefix>_<index>`.
pub fn entity_names<R: Rng + ?Sized>(
    rng: &mut R,
    entity: &str,
    count: usize,
    total: usize,
    prefix: &str,
) -> Result<Vec<String>> {
    Ok(sample_indices(rng, entity, count, total)?
        .into_iter()
        .map(|i| format!("{prefix}_{i}"))
        .collect())
}

/// The sampling state shared by every query generator of a run: the entity population size and
/// the seeded random number generator all draws come from.
#[derive(Debug, Clone)]
pub struct SamplingCore {
    scale: usize,
    seed: u64,
    rng: StdRng,
}

impl SamplingCore {
    pub fn new(scale: usize, seed: u64) -> Self {
        Self {
            scale,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// `count` distinct host names out of the `scale` simulated hosts
    pub fn random_hosts(&mut self, count: usize) -> Result<Vec<String>> {
        entity_names(&mut self.rng, "hosts", count, self.scale, "host")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn zero_hosts() {
        let mut core = SamplingCore::new(10, 1);
        let err = core.random_hosts(0).unwrap_err();
        assert_eq!(err.to_string(), "number of hosts cannot be < 1; got 0");
    }

    #[test]
    fn more_hosts_than_scale() {
        let mut core = SamplingCore::new(10, 1);
        let err = core.random_hosts(20).unwrap_err();
        assert_eq!(
            err.to_string(),
            "number of hosts (20) larger than total hosts. See --scale (10)"
        );
    }

    #[test]
    fn reseeding_reproduces_the_sample() {
        let first = SamplingCore::new(10, 123).random_hosts(1).unwrap();
        let second = SamplingCore::new(10, 123).random_hosts(1).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn call_sequence_is_reproducible() {
        let mut a = SamplingCore::new(100, 99);
        let mut b = SamplingCore::new(100, 99);
        for count in [1, 5, 8, 100] {
            assert_eq!(
                a.random_hosts(count).unwrap(),
                b.random_hosts(count).unwrap()
            );
        }
    }

    #[test]
    fn host_names_use_prefix() {
        let mut core = SamplingCore::new(1, 5);
        assert_eq!(core.random_hosts(1).unwrap(), vec!["host_0".to_string()]);
    }

    proptest! {
        #[test]
        fn samples_are_distinct_and_in_range(total in 1usize..500, count_share in 0.0f64..=1.0, seed: u64) {
            let count = ((total as f64 * count_share) as usize).max(1);
            let mut rng = StdRng::seed_from_u64(seed);

            let sample = sample_indices(&mut rng, "hosts", count, total).unwrap();
            prop_assert_eq!(sample.len(), count);
            prop_assert!(sample.iter().all(|i| *i < total));
            let distinct: HashSet<_> = sample.iter().collect();
            prop_assert_eq!(distinct.len(), count);
        }

        #[test]
        fn sampling_everything_is_a_permutation(total in 1usize..500, seed: u64) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut sample = sample_indices(&mut rng, "hosts", total, total).unwrap();
            sample.sort_unstable();
            prop_assert_eq!(sample, (0..total).collect::<Vec<_>>());
        }

        #[test]
        fn out_of_bounds_counts_fail(total in 0usize..100, over in 1usize..100, seed: u64) {
            let mut rng = StdRng::seed_from_u64(seed);
            let too_many = sample_indices(&mut rng, "metrics", total + over, total).unwrap_err();
            let is_too_large = matches!(too_many, Error::CountTooLarge { .. });
            prop_assert!(is_too_large);

            let none = sample_indices(&mut rng, "metrics", 0, total).unwrap_err();
            prop_assert_eq!(none.to_string(), "number of metrics cannot be < 1; got 0");
        }
    }
}
