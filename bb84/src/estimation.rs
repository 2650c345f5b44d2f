//! Parameter estimation: sacrifice a random sample of the sifted key to
//! estimate the channel error rate and decide whether to carry on.
//!
//! The sample is a fixed-size draw without replacement, so the test always
//! terminates and always inspects exactly `floor(len * test_fraction)` bits.
//! Both parties inspect the same positions: the sender draws them and
//! announces them over the authenticated channel.

use serde::{Deserialize, Serialize};

use crate::bits::BitString;
use crate::error::{QkdError, Result};
use crate::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Continue,
    Abort,
}

/// Outcome of one estimation round.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub decision: Decision,
    /// Disclosed positions, ascending.
    pub tested: Vec<usize>,
    /// Positions that were not disclosed and remain usable as key, ascending.
    pub remaining: Vec<usize>,
    pub mismatches: usize,
}

impl Estimate {
    /// Observed mismatch rate over the tested bits.
    pub fn error_rate(&self) -> f64 {
        if self.tested.is_empty() {
            0.0
        } else {
            self.mismatches as f64 / self.tested.len() as f64
        }
    }

    /// Project a party's sifted key onto the untested positions.
    pub fn surviving_key(&self, sifted: &BitString) -> Result<BitString> {
        sifted.select(&self.remaining)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterEstimator {
    test_fraction: f64,
    abort_threshold: usize,
}

impl ParameterEstimator {
    pub fn new(test_fraction: f64, abort_threshold: usize) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction <= 1.0) {
            return Err(QkdError::InvalidConfig(format!(
                "test_fraction must lie in (0, 1], got {}",
                test_fraction
            )));
        }
        Ok(Self {
            test_fraction,
            abort_threshold,
        })
    }

    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    pub fn abort_threshold(&self) -> usize {
        self.abort_threshold
    }

    /// Number of bits tested out of a `len`-bit sifted key.
    ///
    /// Fails rather than testing nothing when the key is too short.
    pub fn sample_size(&self, len: usize) -> Result<usize> {
        let size = (len as f64 * self.test_fraction).floor() as usize;
        if size == 0 {
            let needed = (1.0 / self.test_fraction).ceil() as usize;
            return Err(QkdError::InsufficientData {
                context: "parameter estimation",
                needed,
                available: len,
            });
        }
        Ok(size)
    }

    /// Draw the positions to disclose.
    pub fn select_indices<R: RandomSource + ?Sized>(
        &self,
        len: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        let size = self.sample_size(len)?;
        rng.sample_indices(len, size)
    }

    /// Draw a sample and compare `reference` against `sample` on it.
    pub fn estimate<R: RandomSource + ?Sized>(
        &self,
        reference: &BitString,
        sample: &BitString,
        rng: &mut R,
    ) -> Result<Estimate> {
        if reference.len() != sample.len() {
            return Err(QkdError::length_mismatch(
                "parameter estimation",
                reference.len(),
                sample.len(),
            ));
        }
        let tested = self.select_indices(reference.len(), rng)?;
        self.estimate_at(reference, sample, tested)
    }

    /// Compare on positions already agreed between the parties.
    pub fn estimate_at(
        &self,
        reference: &BitString,
        sample: &BitString,
        mut tested: Vec<usize>,
    ) -> Result<Estimate> {
        let len = reference.len();
        if sample.len() != len {
            return Err(QkdError::length_mismatch("parameter estimation", len, sample.len()));
        }
        tested.sort_unstable();
        tested.dedup();
        if let Some(&bad) = tested.iter().find(|&&i| i >= len) {
            return Err(QkdError::InvalidArgument(format!(
                "test index {} out of range for {} bits",
                bad, len
            )));
        }
        if tested.is_empty() {
            return Err(QkdError::InsufficientData {
                context: "parameter estimation",
                needed: 1,
                available: 0,
            });
        }

        let mismatches = tested.iter().filter(|&&i| reference[i] != sample[i]).count();
        let mut is_tested = vec![false; len];
        for &i in &tested {
            is_tested[i] = true;
        }
        let remaining = (0..len).filter(|&i| !is_tested[i]).collect();
        let decision = if mismatches > self.abort_threshold {
            Decision::Abort
        } else {
            Decision::Continue
        };

        Ok(Estimate {
            decision,
            tested,
            remaining,
            mismatches,
        })
    }
}

/// Shannon entropy of a Bernoulli(p) variable, in bits.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        0.0
    } else {
        -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
    }
}

/// Asymptotic secret fraction per sifted bit for BB84 with one-way
/// post-processing: `1 - 2 h(qber)`, clamped at zero.
pub fn secret_key_fraction(qber: f64) -> f64 {
    (1.0 - 2.0 * binary_entropy(qber.clamp(0.0, 0.5))).max(0.0)
}
