//! The four BB84 states and the two measurement bases.
//!
//! Encoding: the rectilinear basis sends 0 as |0> and 1 as |1>, the diagonal
//! basis sends 0 as |+> and 1 as |->. Measuring in the preparation basis
//! returns the encoded bit; measuring in the other basis returns a fair coin.

use serde::{Deserialize, Serialize};

use crate::bits::BitString;
use crate::error::{QkdError, Result};
use crate::random::RandomSource;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementBasis {
    /// Z basis, bit 0.
    Rectilinear,
    /// X basis, bit 1.
    Diagonal,
}

impl MeasurementBasis {
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            MeasurementBasis::Diagonal
        } else {
            MeasurementBasis::Rectilinear
        }
    }

    pub fn as_bit(self) -> bool {
        matches!(self, MeasurementBasis::Diagonal)
    }

    pub fn random<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self::from_bit(rng.next_bit())
    }
}

/// A bit string tagged as basis choices, one per qubit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisString(Vec<MeasurementBasis>);

impl BasisString {
    pub fn new(bases: Vec<MeasurementBasis>) -> Self {
        Self(bases)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<MeasurementBasis> {
        self.0.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = MeasurementBasis> + '_ {
        self.0.iter().copied()
    }

    pub fn to_bits(&self) -> BitString {
        self.0.iter().map(|b| b.as_bit()).collect()
    }
}

impl From<&BitString> for BasisString {
    fn from(bits: &BitString) -> Self {
        bits.iter().map(MeasurementBasis::from_bit).collect()
    }
}

impl FromIterator<MeasurementBasis> for BasisString {
    fn from_iter<I: IntoIterator<Item = MeasurementBasis>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BB84State {
    QubitZero,
    QubitOne,
    /// |+>
    QubitPlus,
    /// |->
    QubitMinus,
}

impl BB84State {
    pub fn prepare(bit: bool, basis: MeasurementBasis) -> Self {
        match (basis, bit) {
            (MeasurementBasis::Rectilinear, false) => BB84State::QubitZero,
            (MeasurementBasis::Rectilinear, true) => BB84State::QubitOne,
            (MeasurementBasis::Diagonal, false) => BB84State::QubitPlus,
            (MeasurementBasis::Diagonal, true) => BB84State::QubitMinus,
        }
    }

    pub fn basis(self) -> MeasurementBasis {
        match self {
            BB84State::QubitZero | BB84State::QubitOne => MeasurementBasis::Rectilinear,
            BB84State::QubitPlus | BB84State::QubitMinus => MeasurementBasis::Diagonal,
        }
    }

    /// The bit this state encodes in its own basis.
    pub fn bit(self) -> bool {
        matches!(self, BB84State::QubitOne | BB84State::QubitMinus)
    }

    /// Bit-flip within the same basis, as caused by channel noise.
    pub fn flipped(self) -> Self {
        match self {
            BB84State::QubitZero => BB84State::QubitOne,
            BB84State::QubitOne => BB84State::QubitZero,
            BB84State::QubitPlus => BB84State::QubitMinus,
            BB84State::QubitMinus => BB84State::QubitPlus,
        }
    }

    /// Projective measurement. A basis mismatch yields a uniformly random outcome.
    pub fn measure<R: RandomSource + ?Sized>(self, basis: MeasurementBasis, rng: &mut R) -> bool {
        if self.basis() == basis {
            self.bit()
        } else {
            rng.next_bit()
        }
    }
}

/// Prepare one state per `(bit, basis)` pair.
pub fn encode(bits: &BitString, bases: &BasisString) -> Result<Vec<BB84State>> {
    if bits.len() != bases.len() {
        return Err(QkdError::length_mismatch("encode", bits.len(), bases.len()));
    }
    Ok(bits
        .iter()
        .zip(bases.iter())
        .map(|(bit, basis)| BB84State::prepare(bit, basis))
        .collect())
}
