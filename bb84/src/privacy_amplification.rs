//! Privacy amplification by two-universal hashing over GF(2).
//!
//! The hasher holds `output_len` random binary matrices `M_j` of shape
//! `input_len × m`, with `m = round(output_len * load_factor)`. Output bit `j`
//! is the parity of the vector `x · M_j (mod 2)`. The matrices are drawn from a
//! ChaCha8 stream seeded with the shared [`HashSeed`], so both parties derive
//! the same function without exchanging anything but the seed.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::bits::{BitString, SharedSecret};
use crate::error::{QkdError, Result};
use crate::random::RandomSource;

/// Seed shared over the authenticated channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashSeed(pub u64);

impl HashSeed {
    /// Seed from the thread-local generator. Only suitable for tests and demos.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen())
    }

    /// Fresh seed for one protocol run, taken from the run's own randomness.
    pub fn draw<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self(rng.next_word())
    }
}

impl fmt::Display for HashSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

fn default_load_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasherConfig {
    pub input_len: usize,
    pub output_len: usize,
    #[serde(default = "default_load_factor")]
    pub load_factor: f64,
    #[serde(default)]
    pub seed: Option<HashSeed>,
}

impl HasherConfig {
    pub fn new(
        input_len: usize,
        output_len: usize,
        load_factor: f64,
        seed: Option<HashSeed>,
    ) -> Self {
        Self {
            input_len,
            output_len,
            load_factor,
            seed,
        }
    }

    /// Columns per matrix.
    pub fn columns(&self) -> usize {
        (self.output_len as f64 * self.load_factor).round() as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_len == 0 {
            return Err(QkdError::InvalidConfig("input_len must be positive".into()));
        }
        if self.output_len == 0 || self.output_len > self.input_len {
            return Err(QkdError::InvalidConfig(format!(
                "output_len must lie in 1..={}, got {}",
                self.input_len, self.output_len
            )));
        }
        if !(self.load_factor.is_finite() && self.load_factor > 0.0) {
            return Err(QkdError::InvalidConfig(format!(
                "load_factor must be positive, got {}",
                self.load_factor
            )));
        }
        if self.columns() == 0 {
            return Err(QkdError::InvalidConfig(format!(
                "output_len {} with load_factor {} gives zero columns",
                self.output_len, self.load_factor
            )));
        }
        Ok(())
    }
}

/// One member of the linear two-universal family, fixed by its seed.
#[derive(Debug, Clone)]
pub struct TwoUniversalHasher {
    config: HasherConfig,
    seed: HashSeed,
    /// `matrices[j][i]` is row `i` of `M_j`.
    matrices: Vec<Vec<BitString>>,
}

impl TwoUniversalHasher {
    pub fn new(config: HasherConfig) -> Result<Self> {
        config.validate()?;
        let seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed = HashSeed::random();
                log::warn!(
                    "no hash seed configured, drew {}; share it over the authenticated channel",
                    seed
                );
                seed
            }
        };
        let matrices = generate_matrices(&config, seed);
        Ok(Self {
            config: HasherConfig {
                seed: Some(seed),
                ..config
            },
            seed,
            matrices,
        })
    }

    pub fn with_seed(
        input_len: usize,
        output_len: usize,
        load_factor: f64,
        seed: u64,
    ) -> Result<Self> {
        Self::new(HasherConfig::new(
            input_len,
            output_len,
            load_factor,
            Some(HashSeed(seed)),
        ))
    }

    pub fn seed(&self) -> HashSeed {
        self.seed
    }

    /// Configuration with the resolved seed filled in.
    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    pub fn input_len(&self) -> usize {
        self.config.input_len
    }

    pub fn output_len(&self) -> usize {
        self.config.output_len
    }

    pub fn hash(&self, input: &BitString) -> Result<SharedSecret> {
        if input.len() != self.config.input_len {
            return Err(QkdError::length_mismatch(
                "hash input",
                self.config.input_len,
                input.len(),
            ));
        }
        let m = self.config.columns();
        Ok(self
            .matrices
            .iter()
            .map(|rows| {
                // x · M_j, accumulated over the rows selected by set input bits.
                let mut product = vec![false; m];
                for (row, bit) in rows.iter().zip(input.iter()) {
                    if bit {
                        for (acc, entry) in product.iter_mut().zip(row.iter()) {
                            *acc ^= entry;
                        }
                    }
                }
                product.iter().filter(|&&b| b).count() % 2 == 1
            })
            .collect())
    }
}

fn generate_matrices(config: &HasherConfig, seed: HashSeed) -> Vec<Vec<BitString>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.0);
    let m = config.columns();
    (0..config.output_len)
        .map(|_| {
            (0..config.input_len)
                .map(|_| (0..m).map(|_| rng.gen::<bool>()).collect())
                .collect()
        })
        .collect()
}
