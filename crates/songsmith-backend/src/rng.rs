//! Deterministic RNG using PCG32.
//!
//! All randomness in the engine flows through an explicit [`Pcg32`] passed
//! into each sampling call. Independent streams (album tracks, sampler
//! retries, tempo and key selection) are seeded through the BLAKE3
//! derivations in [`songsmith_spec::hash`].

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Creates a PCG32 RNG from a 64-bit seed.
pub fn create_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Creates an RNG for a named component of a song.
pub fn create_component_rng(seed: u64, key: &str) -> Pcg32 {
    create_rng(songsmith_spec::derive_component_seed(seed, key))
}

/// Picks an index with probability proportional to its weight.
///
/// Callers pass candidates in a stable order; equal weights are then resolved
/// by that order alone. Returns `None` if no weight is positive.
pub fn weighted_choice<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let dist = WeightedIndex::new(weights).ok()?;
    Some(dist.sample(rng))
}

/// Returns true with probability `p`.
///
/// Always draws one value, so the stream position does not depend on `p`.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    let roll: f64 = rng.gen();
    roll < p
}

/// Draws from the standard normal distribution (Box-Muller).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - u keeps the argument of ln inside (0, 1].
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = create_rng(42);
        let mut rng2 = create_rng(42);

        let values1: Vec<u32> = (0..100).map(|_| rng1.gen()).collect();
        let values2: Vec<u32> = (0..100).map(|_| rng2.gen()).collect();

        assert_eq!(values1, values2);
    }

    #[test]
    fn test_different_seeds_produce_different_sequences() {
        let mut rng1 = create_rng(42);
        let mut rng2 = create_rng(43);

        let values1: Vec<f32> = (0..10).map(|_| rng1.gen()).collect();
        let values2: Vec<f32> = (0..10).map(|_| rng2.gen()).collect();

        assert_ne!(values1, values2);
    }

    #[test]
    fn test_component_streams_are_independent() {
        let mut tempo = create_component_rng(42, "tempo");
        let mut key = create_component_rng(42, "key");
        let a: u64 = tempo.gen();
        let b: u64 = key.gen();
        assert_ne!(a, b);
    }

    #[test]
    fn test_weighted_choice() {
        let mut rng = create_rng(7);
        for _ in 0..50 {
            let pick = weighted_choice(&mut rng, &[0.0, 1.0, 0.0]);
            assert_eq!(pick, Some(1));
        }
        assert_eq!(weighted_choice(&mut rng, &[0.0, 0.0]), None);
        assert_eq!(weighted_choice(&mut rng, &[]), None);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = create_rng(1);
        assert!((0..100).all(|_| chance(&mut rng, 1.0)));
        assert!((0..100).all(|_| !chance(&mut rng, 0.0)));
    }

    #[test]
    fn test_standard_normal_is_finite_and_centered() {
        let mut rng = create_rng(99);
        let samples: Vec<f64> = (0..2000).map(|_| standard_normal(&mut rng)).collect();
        assert!(samples.iter().all(|x| x.is_finite()));
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.1, "mean {}", mean);
    }
}
