use crate::skiplist::error::{Error, Result};
use rand::distributions::{IndependentSample, Range};
use rand::{SeedableRng, XorShiftRng};

/// `XorShiftRng` cannot be seeded with all zeros, so this seed stands in for one.
const FALLBACK_SEED: [u32; 4] = [0x193a_6754, 0xa8a7_d469, 0x9783_0e05, 0x113b_a7bb];

/// Checks that `probability` is in `(0, 1)` and that `max_height` is at least 1.
pub fn validate(probability: f64, max_height: usize) -> Result<()> {
    if !(probability > 0.0 && probability < 1.0) {
        return Err(Error::InvalidProbability(probability));
    }
    if max_height == 0 {
        return Err(Error::InvalidMaxHeight(max_height));
    }
    Ok(())
}

/// Draws the height of a newly inserted node.
///
/// Heights follow a geometric distribution with ratio `probability`, truncated at `max_height`
/// and at one more than the current height of the list, so that a single insertion never adds
/// more than one level.
pub struct LevelGenerator {
    probability: f64,
    max_height: usize,
    unit_range: Range<f64>,
    rng: XorShiftRng,
}

impl LevelGenerator {
    /// Constructs a generator seeded from the operating system's entropy source.
    pub fn new(probability: f64, max_height: usize) -> Self {
        Self::with_rng(probability, max_height, rand::weak_rng())
    }

    /// Constructs a generator with a fixed seed.
    pub fn with_seed(probability: f64, max_height: usize, seed: [u32; 4]) -> Self {
        let seed = if seed == [0; 4] { FALLBACK_SEED } else { seed };
        Self::with_rng(probability, max_height, XorShiftRng::from_seed(seed))
    }

    fn with_rng(probability: f64, max_height: usize, rng: XorShiftRng) -> Self {
        LevelGenerator {
            probability,
            max_height,
            unit_range: Range::new(0.0, 1.0),
            rng,
        }
    }

    /// Returns a generator with the same parameters and a fresh entropy seed.
    pub fn reseeded(&self) -> Self {
        Self::new(self.probability, self.max_height)
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn max_height(&self) -> usize {
        self.max_height
    }

    /// Returns a height in `[1, min(max_height, current_height + 1)]`.
    pub fn random_level(&mut self, current_height: usize) -> usize {
        let mut level = 1;
        while self.unit_range.ind_sample(&mut self.rng) < self.probability
            && level < self.max_height
            && level < current_height + 1
        {
            level += 1;
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, LevelGenerator};
    use crate::skiplist::Error;

    #[test]
    fn test_validate() {
        assert!(validate(0.5, 1).is_ok());
        assert!(validate(0.999, 64).is_ok());

        match validate(0.0, 4) {
            Err(Error::InvalidProbability(p)) => assert_eq!(p, 0.0),
            _ => panic!("expected an invalid probability"),
        }
        assert!(validate(1.0, 4).is_err());
        assert!(validate(-0.5, 4).is_err());
        assert!(validate(std::f64::NAN, 4).is_err());

        match validate(0.5, 0) {
            Err(Error::InvalidMaxHeight(height)) => assert_eq!(height, 0),
            _ => panic!("expected an invalid max height"),
        }
    }

    #[test]
    fn test_level_bounds() {
        let mut levels = LevelGenerator::with_seed(0.9, 8, [1, 1, 1, 1]);
        for current_height in 1..12 {
            for _ in 0..1000 {
                let level = levels.random_level(current_height);
                assert!(level >= 1);
                assert!(level <= 8);
                assert!(level <= current_height + 1);
            }
        }
    }

    #[test]
    fn test_max_height_one() {
        let mut levels = LevelGenerator::with_seed(0.99, 1, [1, 2, 3, 4]);
        for _ in 0..1000 {
            assert_eq!(levels.random_level(1), 1);
        }
    }

    #[test]
    fn test_distribution() {
        let mut levels = LevelGenerator::with_seed(0.5, 32, [1, 1, 1, 1]);
        let draws = 100_000;
        let promoted = (0..draws).filter(|_| levels.random_level(32) > 1).count();
        let ratio = promoted as f64 / draws as f64;
        assert!(ratio > 0.45 && ratio < 0.55, "promotion ratio was {}", ratio);
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut first = LevelGenerator::with_seed(0.5, 16, [7, 7, 7, 7]);
        let mut second = LevelGenerator::with_seed(0.5, 16, [7, 7, 7, 7]);
        for _ in 0..1000 {
            assert_eq!(first.random_level(16), second.random_level(16));
        }
    }

    #[test]
    fn test_zero_seed() {
        let mut levels = LevelGenerator::with_seed(0.5, 16, [0, 0, 0, 0]);
        assert!(levels.random_level(16) >= 1);
    }

    #[test]
    fn test_reseeded_keeps_parameters() {
        let levels = LevelGenerator::with_seed(0.25, 12, [1, 1, 1, 1]);
        let reseeded = levels.reseeded();
        assert_eq!(reseeded.probability(), 0.25);
        assert_eq!(reseeded.max_height(), 12);
    }
}
