use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Linear congruential generator for deterministic, reproducible draws.
///
/// Sampling and synthetic fallbacks must return identical results for
/// identical inputs, so seeds are derived from the inputs themselves via
/// [`seed_from`] and the generator is advanced deterministically.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self.state.wrapping_mul(6_364_136_223_846_793_005);
        self.state = self.state.wrapping_add(1_442_695_040_888_963_407);
        self.state
    }

    /// Uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform draw in [min, max).
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    pub fn next_usize(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() as usize) % max
    }
}

/// Derive a seed from any hashable tuple of inputs.
///
/// `DefaultHasher::new()` uses fixed keys, so the same inputs produce the
/// same seed across calls and across process restarts.
pub fn seed_from<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..10 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_f64_in_unit_interval() {
        let mut rng = SeededRng::new(7);
        for _ in 0..100 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_range_bounds() {
        let mut rng = SeededRng::new(99);
        for _ in 0..100 {
            let x = rng.range_f64(-3.0, 3.0);
            assert!((-3.0..3.0).contains(&x));
        }
    }

    #[test]
    fn test_seed_from_is_stable() {
        let a = seed_from(&("Retail", 5u8, 500f64.to_bits()));
        let b = seed_from(&("Retail", 5u8, 500f64.to_bits()));
        assert_eq!(a, b);

        let c = seed_from(&("Office", 5u8, 500f64.to_bits()));
        assert_ne!(a, c);
    }
}
