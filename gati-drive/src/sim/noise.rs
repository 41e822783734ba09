//! Seeded noise source for the simulator

use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;

/// Gaussian noise with deterministic seeding
#[derive(Clone)]
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    /// Seed 0 draws from entropy; anything else is reproducible
    pub fn new(seed: u64) -> Self {
        let rng = match seed {
            0 => SmallRng::from_entropy(),
            s => SmallRng::seed_from_u64(s),
        };
        Self { rng }
    }

    /// Zero-mean sample with the given standard deviation
    #[inline]
    pub fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev <= 0.0 {
            0.0
        } else {
            stddev * self.rng.sample::<f32, _>(StandardNormal)
        }
    }

    /// Multiplicative factor `1 + bias + N(0, stddev)`
    #[inline]
    pub fn scale_factor(&mut self, bias: f32, stddev: f32) -> f32 {
        1.0 + bias + self.gaussian(stddev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_seed() {
        let mut a = NoiseGenerator::new(7);
        let mut b = NoiseGenerator::new(7);
        for _ in 0..100 {
            assert_eq!(a.gaussian(1.0), b.gaussian(1.0));
        }
    }

    #[test]
    fn test_zero_stddev_is_exact() {
        let mut noise = NoiseGenerator::new(7);
        for _ in 0..10 {
            assert_eq!(noise.gaussian(0.0), 0.0);
            assert_eq!(noise.scale_factor(0.0, 0.0), 1.0);
        }
    }

    #[test]
    fn test_sample_spread() {
        let mut noise = NoiseGenerator::new(7);
        let n = 10_000;
        let samples: Vec<f32> = (0..n).map(|_| noise.gaussian(2.0)).collect();
        let mean = samples.iter().sum::<f32>() / n as f32;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n as f32;
        assert!(mean.abs() < 0.1);
        assert!((var.sqrt() - 2.0).abs() < 0.1);
    }
}
