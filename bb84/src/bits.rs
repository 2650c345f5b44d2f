//! Bit strings: raw key material, bases, syndromes and hash outputs.
//!
//! A [`BitString`] is produced once by a stage and only read afterwards.
//! Every operation here returns a new string instead of mutating in place.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QkdError, Result};

/// Fixed-length ordered sequence of bits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString(Vec<bool>);

/// Output of a parity-check matrix applied to a bit string.
pub type Syndrome = BitString;

/// Final privacy-amplified key.
pub type SharedSecret = BitString;

impl BitString {
    pub fn new(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    pub fn zeros(len: usize) -> Self {
        Self(vec![false; len])
    }

    /// Build from `0`/`1` byte values. Anything else is rejected.
    pub fn from_binary(values: &[u8]) -> Result<Self> {
        values
            .iter()
            .map(|&v| match v {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(QkdError::InvalidArgument(format!(
                    "bit value must be 0 or 1, got {}",
                    other
                ))),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Bits as `0`/`1` bytes.
    pub fn to_binary(&self) -> Vec<u8> {
        self.0.iter().map(|&b| b as u8).collect()
    }

    /// Number of set bits.
    pub fn weight(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Sum of all bits modulo 2.
    pub fn parity(&self) -> bool {
        self.weight() % 2 == 1
    }

    /// Bitwise XOR. Both strings must have the same length.
    pub fn xor(&self, other: &BitString) -> Result<BitString> {
        if self.len() != other.len() {
            return Err(QkdError::length_mismatch("xor", self.len(), other.len()));
        }
        Ok(self.0.iter().zip(other.0.iter()).map(|(a, b)| a ^ b).collect())
    }

    /// Number of positions where the two strings differ.
    pub fn hamming_distance(&self, other: &BitString) -> Result<usize> {
        Ok(self.xor(other)?.weight())
    }

    /// Projection onto `indices`, in the order given.
    pub fn select(&self, indices: &[usize]) -> Result<BitString> {
        indices
            .iter()
            .map(|&i| {
                self.get(i).ok_or_else(|| {
                    QkdError::InvalidArgument(format!(
                        "index {} out of range for {} bits",
                        i,
                        self.len()
                    ))
                })
            })
            .collect()
    }

    /// The first `len` bits (or all of them if the string is shorter).
    pub fn truncated(&self, len: usize) -> BitString {
        Self(self.0[..len.min(self.len())].to_vec())
    }

    /// Copy with bit `index` inverted.
    pub fn flipped(&self, index: usize) -> Result<BitString> {
        if index >= self.len() {
            return Err(QkdError::InvalidArgument(format!(
                "cannot flip bit {} of a {}-bit string",
                index,
                self.len()
            )));
        }
        let mut bits = self.0.clone();
        bits[index] = !bits[index];
        Ok(Self(bits))
    }

    /// Consecutive non-overlapping blocks of `size` bits. A trailing partial block is dropped.
    pub fn blocks(&self, size: usize) -> impl Iterator<Item = BitString> + '_ {
        self.0
            .chunks_exact(size.max(1))
            .map(|chunk| BitString(chunk.to_vec()))
    }

    /// Concatenate a sequence of strings.
    pub fn concat<'a, I: IntoIterator<Item = &'a BitString>>(parts: I) -> BitString {
        Self(parts.into_iter().flat_map(|p| p.0.iter().copied()).collect())
    }

    /// Pack into bytes, most significant bit first, zero-padded at the end.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.len().div_ceil(8)];
        for (index, bit) in self.0.iter().enumerate() {
            if *bit {
                bytes[index / 8] |= 1 << (7 - index % 8);
            }
        }
        bytes
    }

    /// Interpret as an unsigned integer, first bit most significant.
    ///
    /// Only meaningful for short strings such as syndromes.
    pub(crate) fn to_index(&self) -> usize {
        self.0.iter().fold(0usize, |acc, &b| (acc << 1) | b as usize)
    }

    pub(crate) fn from_index(value: usize, len: usize) -> BitString {
        (0..len).map(|i| (value >> (len - 1 - i)) & 1 == 1).collect()
    }
}

impl From<Vec<bool>> for BitString {
    fn from(bits: Vec<bool>) -> Self {
        Self(bits)
    }
}

impl FromIterator<bool> for BitString {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Index<usize> for BitString {
    type Output = bool;

    fn index(&self, index: usize) -> &bool {
        &self.0[index]
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.0 {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for BitString {
    type Err = QkdError;

    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(QkdError::InvalidArgument(format!(
                    "unexpected character {:?} in bit string",
                    other
                ))),
            })
            .collect()
    }
}
