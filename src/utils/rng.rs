//! Simple random number generator for reproducibility.
//!
//! This module provides a lightweight xorshift-based PRNG so that weight
//! initialisation, shuffling and gradient checks are reproducible from a seed.

use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

const FALLBACK_SEED: u64 = 0x9e3779b97f4a7c15;

/// Simple RNG for reproducibility without external crates.
///
/// Uses the xorshift algorithm for fast, deterministic random number generation.
/// Every source of randomness in the crate takes a `&mut SimpleRng`, so a test
/// that fixes the seed fixes the whole run.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }

    /// Create an RNG seeded from the current time.
    pub fn from_time() -> Self {
        let mut rng = Self::new(FALLBACK_SEED);
        rng.reseed_from_time();
        rng
    }

    /// Reseed based on the current time.
    pub fn reseed_from_time(&mut self) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.state = if nanos == 0 { FALLBACK_SEED } else { nanos };
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Two xorshift draws combined into a u64.
    pub fn next_u64(&mut self) -> u64 {
        let high = self.next_u32() as u64;
        let low = self.next_u32() as u64;
        (high << 32) | low
    }

    /// Convert to [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Integer sample in [0, upper), free of modulo bias.
    ///
    /// Draws that fall into the incomplete last bucket of the u64 range are
    /// rejected, so every value in the range is equally likely.
    pub fn gen_usize(&mut self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        let upper = upper as u64;
        // 2^64 mod upper
        let threshold = upper.wrapping_neg() % upper;
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return (x % upper) as usize;
            }
        }
    }

    /// Standard normal sample using the Box–Muller transform on two uniform draws.
    pub fn next_normal(&mut self) -> f64 {
        // u1 in (0, 1] keeps the logarithm finite.
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}
