//! Random-bit sources.
//!
//! Every run takes its randomness from a handle passed in by the caller, never
//! from a process-wide generator, so concurrent runs do not interfere and
//! seeded runs replay exactly.

use rand::seq::index;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::bb84_states::{BasisString, MeasurementBasis};
use crate::bits::BitString;
use crate::error::{QkdError, Result};

/// Source of independent unbiased bits.
///
/// Implemented for every [`RngCore`], so a seeded [`ChaCha8Rng`] and
/// `rand::thread_rng()` both work. Whether the bits are physically quantum or
/// pseudorandom makes no difference to the post-processing.
pub trait RandomSource {
    fn next_bit(&mut self) -> bool;

    /// Uniform sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform 64-bit word, used to draw per-run hash seeds.
    fn next_word(&mut self) -> u64;

    /// `amount` distinct indices below `len`, sorted ascending.
    fn sample_indices(&mut self, len: usize, amount: usize) -> Result<Vec<usize>>;

    fn generate_binary_array(&mut self, length: usize) -> BitString {
        (0..length).map(|_| self.next_bit()).collect()
    }

    fn generate_bases(&mut self, length: usize) -> BasisString {
        (0..length)
            .map(|_| MeasurementBasis::from_bit(self.next_bit()))
            .collect()
    }
}

impl<R: RngCore> RandomSource for R {
    fn next_bit(&mut self) -> bool {
        self.gen()
    }

    fn next_unit(&mut self) -> f64 {
        self.gen()
    }

    fn next_word(&mut self) -> u64 {
        self.gen()
    }

    fn sample_indices(&mut self, len: usize, amount: usize) -> Result<Vec<usize>> {
        if amount > len {
            return Err(QkdError::InsufficientData {
                context: "index sample",
                needed: amount,
                available: len,
            });
        }
        let mut picked = index::sample(self, len, amount).into_vec();
        picked.sort_unstable();
        Ok(picked)
    }
}

/// Portable, reproducible source for a single run.
pub type RunRng = ChaCha8Rng;

pub fn seeded_source(seed: u64) -> RunRng {
    ChaCha8Rng::seed_from_u64(seed)
}
