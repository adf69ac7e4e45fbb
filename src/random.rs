//! Random number generation and shuffling.
//!
//! # Reproducibility
//!
//! Every randomized procedure runs on a [`SmallRng`] built by
//! [`create_rng`]. A fixed seed replays the same draws on the same
//! platform; [`entropy_seed`] supplies a fresh seed when the caller does
//! not pin one, and the engine logs it so the run can be replayed.

use rand::rngs::SmallRng;
use rand::Rng;

/// Creates a fast, seeded random number generator (Xoshiro256++).
///
/// # Examples
/// ```
/// use u_abtest::random::create_rng;
/// use rand::Rng;
/// let mut rng = create_rng(42);
/// let x: f64 = rng.random();
/// assert!(x >= 0.0 && x < 1.0);
/// ```
pub fn create_rng(seed: u64) -> SmallRng {
    use rand::SeedableRng;
    SmallRng::seed_from_u64(seed)
}

/// Draws a seed from the thread-local entropy source.
pub fn entropy_seed() -> u64 {
    rand::random()
}

/// Moves a uniformly random `k`-subset of `slice` into `slice[..k]`.
///
/// Runs the first `k` steps of a forward Fisher–Yates pass, so every
/// `k`-subset is equally likely and the tail `slice[k..]` holds the
/// complement. `k` is clamped to `slice.len()`.
///
/// # Complexity
/// Time: O(k), Space: O(1)
///
/// # Examples
/// ```
/// use u_abtest::random::{create_rng, partial_shuffle};
/// let mut v = vec![10, 20, 30, 40, 50];
/// partial_shuffle(&mut v, 2, &mut create_rng(3));
/// let mut all = v.clone();
/// all.sort();
/// assert_eq!(all, vec![10, 20, 30, 40, 50]);
/// ```
pub fn partial_shuffle<T, R: Rng>(slice: &mut [T], k: usize, rng: &mut R) {
    let n = slice.len();
    let k = k.min(n);
    for i in 0..k.min(n.saturating_sub(1)) {
        let j = rng.random_range(i..n);
        slice.swap(i, j);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rng_deterministic() {
        let mut rng1 = create_rng(42);
        let mut rng2 = create_rng(42);
        let vals1: Vec<f64> = (0..10).map(|_| rng1.random()).collect();
        let vals2: Vec<f64> = (0..10).map(|_| rng2.random()).collect();
        assert_eq!(vals1, vals2);
    }

    #[test]
    fn test_entropy_seed_varies() {
        // Two equal 64-bit draws would be a 2⁻⁶⁴ event.
        let seeds: Vec<u64> = (0..4).map(|_| entropy_seed()).collect();
        assert!(seeds.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_partial_shuffle_empty_and_single() {
        let mut empty: Vec<i32> = vec![];
        partial_shuffle(&mut empty, 1, &mut create_rng(0));
        let mut single = vec![42];
        partial_shuffle(&mut single, 1, &mut create_rng(0));
        assert_eq!(single, vec![42]);
    }

    #[test]
    fn test_full_partial_shuffle_reorders() {
        let original: Vec<i32> = (1..=10).collect();
        let mut v = original.clone();
        let n = v.len();
        partial_shuffle(&mut v, n, &mut create_rng(42));
        assert_ne!(v, original, "shuffle should change order (probabilistic)");
    }

    #[test]
    fn test_partial_shuffle_k_bounds() {
        let mut v = vec![1, 2, 3];
        partial_shuffle(&mut v, 0, &mut create_rng(1));
        assert_eq!(v, vec![1, 2, 3]);
        partial_shuffle(&mut v, 10, &mut create_rng(1));
        v.sort();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_partial_shuffle_subset_uniform() {
        // Each of the C(4,2) = 6 prefixes should appear ~1/6 of the time.
        let mut rng = create_rng(2024);
        let mut counts = std::collections::HashMap::new();
        let n = 12_000;
        for _ in 0..n {
            let mut v = [0, 1, 2, 3];
            partial_shuffle(&mut v, 2, &mut rng);
            let mut prefix = [v[0], v[1]];
            prefix.sort();
            *counts.entry(prefix).or_insert(0_u32) += 1;
        }
        assert_eq!(counts.len(), 6);
        for (&prefix, &c) in &counts {
            let frac = f64::from(c) / f64::from(n);
            assert!((frac - 1.0 / 6.0).abs() < 0.02, "{prefix:?}: {frac}");
        }
    }
}
