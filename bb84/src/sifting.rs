//! Basis sifting: keep only positions where sender and receiver chose the same basis.

use crate::bb84_states::BasisString;
use crate::bits::BitString;
use crate::error::{QkdError, Result};

/// Indices where the two basis strings agree, ascending.
pub fn matching_indices(basis_a: &BasisString, basis_b: &BasisString) -> Result<Vec<usize>> {
    if basis_a.len() != basis_b.len() {
        return Err(QkdError::length_mismatch(
            "sifting bases",
            basis_a.len(),
            basis_b.len(),
        ));
    }
    Ok(basis_a
        .iter()
        .zip(basis_b.iter())
        .enumerate()
        .filter(|(_, (a, b))| a == b)
        .map(|(i, _)| i)
        .collect())
}

/// Project `data` onto the positions where the bases agree, preserving order.
///
/// An all-disagreeing pair of bases gives an empty string, not an error;
/// the next stage reports the shortage.
pub fn sift(basis_a: &BasisString, basis_b: &BasisString, data: &BitString) -> Result<BitString> {
    if data.len() != basis_a.len() {
        return Err(QkdError::length_mismatch(
            "sifting data",
            basis_a.len(),
            data.len(),
        ));
    }
    let keep = matching_indices(basis_a, basis_b)?;
    data.select(&keep)
}
