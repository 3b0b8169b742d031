//! Probabilistic level generation shared by both skip list variants

use rand::Rng;

/// Samples node heights with a geometric distribution capped at `max_level`.
///
/// Each call uses the calling thread's own RNG (`rand::thread_rng`), so
/// concurrent inserters never contend on shared RNG state.
#[derive(Debug, Clone)]
pub struct LevelGenerator {
    max_level: usize,
    probability: f64,
}

impl LevelGenerator {
    pub fn new(max_level: usize, probability: f64) -> Self {
        Self {
            max_level,
            probability,
        }
    }

    /// Draws a level in `0..=max_level`. Each level above 0 is granted with
    /// probability `probability`, independently of the levels below it.
    pub fn random_level(&self) -> usize {
        let mut rng = rand::thread_rng();
        let mut level = 0;
        while level < self.max_level && rng.gen_bool(self.probability) {
            level += 1;
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_max_level() {
        let gen = LevelGenerator::new(4, 0.9);
        for _ in 0..10_000 {
            assert!(gen.random_level() <= 4);
        }
    }

    #[test]
    fn zero_probability_always_yields_level_zero() {
        let gen = LevelGenerator::new(16, 0.000_000_1);
        for _ in 0..100 {
            assert_eq!(gen.random_level(), 0);
        }
    }
}
