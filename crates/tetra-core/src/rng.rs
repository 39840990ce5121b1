//! Seeded pseudo-random stream (mulberry32)
//!
//! Every generator in the crate draws from this stream so that one integer
//! seed reproduces one pattern, bit for bit. Independent generation tasks
//! sharing a seed use derived seeds (`seed + 1`, `seed + 2`, ...).

/// Deterministic 32-bit PRNG producing floats in `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed offset by `offset`, used to decorrelate sibling generators.
    pub fn derived(seed: u32, offset: u32) -> Self {
        Self::new(seed.wrapping_add(offset))
    }

    /// Next float in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        (t ^ (t >> 14)) as f64 / 4_294_967_296.0
    }

    /// Uniform integer in `[low, high]` (inclusive). Bounds may come in either order.
    pub fn range_inclusive(&mut self, low: i64, high: i64) -> i64 {
        let (low, high) = (low.min(high), low.max(high));
        let span = (high - low + 1) as f64;
        low + (self.next_f64() * span).floor() as i64
    }

    /// Uniform index in `[0, len)`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        ((self.next_f64() * len as f64).floor() as usize).min(len.saturating_sub(1))
    }

    /// Uniform float in `[low, high)`
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + self.next_f64() * (high - low)
    }

    /// Bernoulli trial
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}
