//! Quadrature encoder simulation with slip noise
//!
//! Counters behave like the hardware ones: signed, accumulate until read, and
//! are cleared by a destructive read.

use super::config::SimNoiseConfig;
use super::noise::NoiseGenerator;
use crate::core::types::{CounterOverflow, EncoderDelta};

pub struct EncoderSimulator {
    noise_config: SimNoiseConfig,
    ticks_per_cm: f32,
    /// Accumulated fractional ticks (left, right)
    fraction: (f32, f32),
    /// Counts since the last read (left, right)
    counts: (i32, i32),
    /// Reads that found an out-of-range counter
    overflow_resets: u64,
}

impl EncoderSimulator {
    pub fn new(noise_config: &SimNoiseConfig, ticks_per_cm: f32) -> Self {
        Self {
            noise_config: noise_config.clone(),
            ticks_per_cm,
            fraction: (0.0, 0.0),
            counts: (0, 0),
            overflow_resets: 0,
        }
    }

    /// Convert wheel travel into ticks
    pub fn update(&mut self, left_cm: f32, right_cm: f32, noise: &mut NoiseGenerator) {
        let n = &self.noise_config;
        let left_slip = noise.scale_factor(n.slip_bias, n.slip_stddev);
        let right_slip = noise.scale_factor(n.slip_bias, n.slip_stddev);

        let (left_jitter, right_jitter) = if n.quantization_noise {
            (noise.gaussian(0.5), noise.gaussian(0.5))
        } else {
            (0.0, 0.0)
        };

        self.fraction.0 += left_cm * self.ticks_per_cm * left_slip + left_jitter;
        self.fraction.1 += right_cm * self.ticks_per_cm * right_slip + right_jitter;

        let left_whole = self.fraction.0.trunc();
        let right_whole = self.fraction.1.trunc();
        self.fraction.0 -= left_whole;
        self.fraction.1 -= right_whole;

        self.counts.0 = self.counts.0.saturating_add(left_whole as i32);
        self.counts.1 = self.counts.1.saturating_add(right_whole as i32);
    }

    /// Add raw ticks without motion (test hook)
    pub fn inject(&mut self, left: i32, right: i32) {
        self.counts.0 = self.counts.0.saturating_add(left);
        self.counts.1 = self.counts.1.saturating_add(right);
    }

    /// Current counts without clearing them
    pub fn counts(&self) -> (i32, i32) {
        self.counts
    }

    /// Destructive read
    pub fn read_and_reset(&mut self) -> EncoderDelta {
        let (delta, overflow): (EncoderDelta, CounterOverflow) =
            EncoderDelta::from_counts(self.counts.0, self.counts.1);
        if overflow.any() {
            self.overflow_resets += 1;
        }
        self.counts = (0, 0);
        delta
    }

    pub fn overflow_resets(&self) -> u64 {
        self.overflow_resets
    }
}
