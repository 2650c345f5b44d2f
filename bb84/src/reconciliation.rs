//! Information reconciliation by syndrome decoding.
//!
//! Alice discloses `H · x_A` for each block, Bob computes `H · x_B`, and the XOR
//! of the two syndromes equals `H · e` for the error pattern `e = x_A ⊕ x_B`.
//! Bob looks up the minimum-weight pattern with that syndrome and flips it away.
//!
//! The syndrome table is built once per [`Reconciler`] by a breadth-first search
//! over syndrome space: starting from the zero syndrome, each step adds one
//! column of `H`. The first time a syndrome is reached its path is a
//! minimum-weight error pattern (a coset leader). The search touches each of the
//! `2^r` syndromes once, so `r` is capped at [`MAX_SYNDROME_BITS`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::bits::{BitString, Syndrome};
use crate::error::{QkdError, Result};

/// Upper bound on parity-check rows; the lookup table has `2^rows` entries.
pub const MAX_SYNDROME_BITS: usize = 20;

/// Binary parity-check matrix of shape `syndrome_len × codeword_len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct ParityCheckMatrix {
    rows: Vec<BitString>,
    codeword_len: usize,
}

impl ParityCheckMatrix {
    pub fn new(rows: Vec<BitString>) -> Result<Self> {
        let codeword_len = match rows.first() {
            Some(row) => row.len(),
            None => {
                return Err(QkdError::InvalidConfig(
                    "parity-check matrix needs at least one row".into(),
                ))
            }
        };
        if codeword_len == 0 {
            return Err(QkdError::InvalidConfig(
                "parity-check matrix needs at least one column".into(),
            ));
        }
        if rows.len() > MAX_SYNDROME_BITS {
            return Err(QkdError::InvalidConfig(format!(
                "parity-check matrix has {} rows, at most {} supported",
                rows.len(),
                MAX_SYNDROME_BITS
            )));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != codeword_len) {
            return Err(QkdError::length_mismatch(
                "parity-check row",
                codeword_len,
                row.len(),
            ));
        }
        Ok(Self { rows, codeword_len })
    }

    /// Build from rows of `0`/`1` values.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|r| BitString::from_binary(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(rows)
    }

    /// `[[1,1,0],[0,1,1]]`: the 3-bit repetition code, correcting any single flip.
    pub fn repetition3() -> Self {
        Self {
            rows: vec![
                BitString::new(vec![true, true, false]),
                BitString::new(vec![false, true, true]),
            ],
            codeword_len: 3,
        }
    }

    pub fn syndrome_len(&self) -> usize {
        self.rows.len()
    }

    pub fn codeword_len(&self) -> usize {
        self.codeword_len
    }

    /// `H · word (mod 2)`.
    pub fn syndrome(&self, word: &BitString) -> Result<Syndrome> {
        if word.len() != self.codeword_len {
            return Err(QkdError::length_mismatch(
                "syndrome input",
                self.codeword_len,
                word.len(),
            ));
        }
        Ok(self
            .rows
            .iter()
            .map(|row| row.iter().zip(word.iter()).filter(|&(h, x)| h && x).count() % 2 == 1)
            .collect())
    }

    /// Column `j` packed as a syndrome index (first row is the high bit).
    fn column_index(&self, j: usize) -> usize {
        self.rows
            .iter()
            .fold(0usize, |acc, row| (acc << 1) | row[j] as usize)
    }
}

impl TryFrom<Vec<Vec<u8>>> for ParityCheckMatrix {
    type Error = QkdError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self> {
        Self::from_rows(&rows)
    }
}

impl From<ParityCheckMatrix> for Vec<Vec<u8>> {
    fn from(matrix: ParityCheckMatrix) -> Self {
        matrix.rows.iter().map(BitString::to_binary).collect()
    }
}

/// Syndrome → minimum-weight error pattern, stored as flipped positions.
#[derive(Debug, Clone)]
pub struct SyndromeTable {
    syndrome_len: usize,
    leaders: Vec<Option<Vec<usize>>>,
}

impl SyndromeTable {
    pub fn build(matrix: &ParityCheckMatrix) -> Self {
        let syndrome_len = matrix.syndrome_len();
        let columns: Vec<usize> = (0..matrix.codeword_len())
            .map(|j| matrix.column_index(j))
            .collect();

        let mut leaders: Vec<Option<Vec<usize>>> = vec![None; 1 << syndrome_len];
        leaders[0] = Some(Vec::new());
        let mut queue = VecDeque::from([0usize]);

        while let Some(current) = queue.pop_front() {
            let pattern = match &leaders[current] {
                Some(p) => p.clone(),
                None => continue,
            };
            for (j, &column) in columns.iter().enumerate() {
                let next = current ^ column;
                if leaders[next].is_none() {
                    let mut extended = pattern.clone();
                    extended.push(j);
                    leaders[next] = Some(extended);
                    queue.push_back(next);
                }
            }
        }

        Self {
            syndrome_len,
            leaders,
        }
    }

    /// Error positions for `syndrome`, or `None` when no pattern produces it.
    pub fn lookup(&self, syndrome: &Syndrome) -> Option<&[usize]> {
        if syndrome.len() != self.syndrome_len {
            return None;
        }
        self.leaders[syndrome.to_index()].as_deref()
    }

    /// Number of syndromes with a known correction.
    pub fn decodable(&self) -> usize {
        self.leaders.iter().filter(|l| l.is_some()).count()
    }
}

/// Result of reconciling one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub corrected: BitString,
    /// `local_syndrome ⊕ remote_syndrome` before correction.
    pub residual: Syndrome,
    /// Positions flipped to reach `corrected`.
    pub flipped: Vec<usize>,
}

/// Result of reconciling a whole key block by block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReconciliation {
    pub corrected: BitString,
    pub blocks: usize,
    pub corrected_bits: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    matrix: ParityCheckMatrix,
    table: SyndromeTable,
}

impl Reconciler {
    pub fn new(matrix: ParityCheckMatrix) -> Self {
        let table = SyndromeTable::build(&matrix);
        log::debug!(
            "syndrome table for {}x{} code decodes {} of {} syndromes",
            matrix.syndrome_len(),
            matrix.codeword_len(),
            table.decodable(),
            1usize << matrix.syndrome_len()
        );
        Self { matrix, table }
    }

    pub fn parity_check(&self) -> &ParityCheckMatrix {
        &self.matrix
    }

    pub fn block_len(&self) -> usize {
        self.matrix.codeword_len()
    }

    pub fn syndrome(&self, block: &BitString) -> Result<Syndrome> {
        self.matrix.syndrome(block)
    }

    /// Correct `local` towards the string whose syndrome is `remote_syndrome`.
    pub fn reconcile(
        &self,
        local: &BitString,
        remote_syndrome: &Syndrome,
    ) -> Result<Reconciliation> {
        if remote_syndrome.len() != self.matrix.syndrome_len() {
            return Err(QkdError::length_mismatch(
                "remote syndrome",
                self.matrix.syndrome_len(),
                remote_syndrome.len(),
            ));
        }
        let residual = self.matrix.syndrome(local)?.xor(remote_syndrome)?;
        let flipped = self
            .table
            .lookup(&residual)
            .ok_or_else(|| QkdError::ReconciliationFailure {
                reason: format!("syndrome {} has no correctable error pattern", residual),
            })?
            .to_vec();

        let mut error = vec![false; local.len()];
        for &i in &flipped {
            error[i] = true;
        }
        let corrected = local.xor(&BitString::new(error))?;

        Ok(Reconciliation {
            corrected,
            residual,
            flipped,
        })
    }

    /// Syndromes of every complete block of `key`. A trailing partial block is ignored.
    pub fn block_syndromes(&self, key: &BitString) -> Result<Vec<Syndrome>> {
        key.blocks(self.block_len())
            .map(|block| self.matrix.syndrome(&block))
            .collect()
    }

    /// Reconcile `key` block by block against the other party's syndromes.
    pub fn reconcile_blocks(
        &self,
        key: &BitString,
        remote_syndromes: &[Syndrome],
    ) -> Result<BlockReconciliation> {
        let blocks = key.len() / self.block_len();
        if blocks != remote_syndromes.len() {
            return Err(QkdError::length_mismatch(
                "syndrome count",
                blocks,
                remote_syndromes.len(),
            ));
        }
        let mut corrected = Vec::with_capacity(blocks);
        let mut corrected_bits = 0;
        for (block, remote) in key.blocks(self.block_len()).zip(remote_syndromes) {
            let outcome = self.reconcile(&block, remote)?;
            corrected_bits += outcome.flipped.len();
            corrected.push(outcome.corrected);
        }
        Ok(BlockReconciliation {
            corrected: BitString::concat(&corrected),
            blocks,
            corrected_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{seeded_source, RandomSource};

    fn bits(s: &str) -> BitString {
        s.parse().unwrap()
    }

    #[test]
    fn test_example_syndrome() {
        let h = ParityCheckMatrix::repetition3();
        assert_eq!(h.syndrome(&bits("001")).unwrap(), bits("01"));
        assert_eq!(h.syndrome(&bits("000")).unwrap(), bits("00"));
        assert_eq!(h.syndrome(&bits("111")).unwrap(), bits("00"));
    }

    #[test]
    fn test_no_noise_reconciles_unchanged() {
        let reconciler = Reconciler::new(ParityCheckMatrix::repetition3());
        let alice = bits("001");
        let alice_syndrome = reconciler.syndrome(&alice).unwrap();
        let outcome = reconciler.reconcile(&bits("001"), &alice_syndrome).unwrap();
        assert_eq!(outcome.corrected, alice);
        assert_eq!(outcome.residual, bits("00"));
        assert!(outcome.flipped.is_empty());
    }

    #[test]
    fn test_table_matches_hand_written_decoder() {
        let table = SyndromeTable::build(&ParityCheckMatrix::repetition3());
        assert_eq!(table.lookup(&bits("00")), Some(&[][..]));
        assert_eq!(table.lookup(&bits("01")), Some(&[2][..]));
        assert_eq!(table.lookup(&bits("10")), Some(&[0][..]));
        assert_eq!(table.lookup(&bits("11")), Some(&[1][..]));
        assert_eq!(table.decodable(), 4);
    }

    #[test]
    fn test_single_bit_flip_recovery() {
        let reconciler = Reconciler::new(ParityCheckMatrix::repetition3());
        for word in ["000", "001", "010", "011", "100", "101", "110", "111"] {
            let alice = bits(word);
            let syndrome = reconciler.syndrome(&alice).unwrap();
            for i in 0..3 {
                let bob = alice.flipped(i).unwrap();
                let outcome = reconciler.reconcile(&bob, &syndrome).unwrap();
                assert_eq!(outcome.corrected, alice, "word {} flip {}", word, i);
                assert_eq!(outcome.flipped, vec![i]);
            }
        }
    }

    #[test]
    fn test_unreachable_syndrome_fails_to_decode() {
        // Rank-1 matrix: syndromes 01 and 10 can never occur.
        let h = ParityCheckMatrix::from_rows(&[[1u8, 1, 1], [1, 1, 1]]).unwrap();
        let reconciler = Reconciler::new(h);
        let outcome = reconciler.reconcile(&bits("000"), &bits("01"));
        assert!(matches!(outcome, Err(QkdError::ReconciliationFailure { .. })));
        assert!(outcome.unwrap_err().requires_restart());
    }

    #[test]
    fn test_hamming_7_4_corrects_every_single_flip() {
        let h = ParityCheckMatrix::from_rows(&[
            [0u8, 0, 0, 1, 1, 1, 1],
            [0, 1, 1, 0, 0, 1, 1],
            [1, 0, 1, 0, 1, 0, 1],
        ])
        .unwrap();
        let reconciler = Reconciler::new(h);
        let mut rng = seeded_source(31);
        for _ in 0..20 {
            let alice = rng.generate_binary_array(7);
            let syndrome = reconciler.syndrome(&alice).unwrap();
            for i in 0..7 {
                let outcome = reconciler.reconcile(&alice.flipped(i).unwrap(), &syndrome).unwrap();
                assert_eq!(outcome.corrected, alice);
            }
        }
    }

    #[test]
    fn test_leaders_are_minimum_weight() {
        let h = ParityCheckMatrix::from_rows(&[[1u8, 0, 0, 1, 1], [0, 1, 0, 1, 0], [0, 0, 1, 0, 1]])
            .unwrap();
        let table = SyndromeTable::build(&h);
        for s in 0..8usize {
            let syndrome = BitString::from_index(s, 3);
            let leader = table.lookup(&syndrome).unwrap();
            let mut e = vec![false; 5];
            for &i in leader {
                e[i] = true;
            }
            assert_eq!(h.syndrome(&BitString::new(e)).unwrap(), syndrome);
            // No lighter pattern reaches the same syndrome.
            for mask in 0..32usize {
                let candidate = BitString::from_index(mask, 5);
                if h.syndrome(&candidate).unwrap() == syndrome {
                    assert!(candidate.weight() >= leader.len());
                }
            }
        }
    }

    #[test]
    fn test_block_reconciliation() {
        let reconciler = Reconciler::new(ParityCheckMatrix::repetition3());
        let alice = bits("101 110 000 011 1");
        let bob = bits("111 110 100 011 0");
        let syndromes = reconciler.block_syndromes(&alice).unwrap();
        assert_eq!(syndromes.len(), 4);
        let outcome = reconciler.reconcile_blocks(&bob, &syndromes).unwrap();
        assert_eq!(outcome.blocks, 4);
        assert_eq!(outcome.corrected_bits, 2);
        assert_eq!(outcome.corrected, alice.truncated(12));

        assert!(matches!(
            reconciler.reconcile_blocks(&bob, &syndromes[..3]),
            Err(QkdError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_matrix_validation() {
        assert!(ParityCheckMatrix::new(Vec::new()).is_err());
        assert!(ParityCheckMatrix::from_rows(&[vec![1u8, 0], vec![1]]).is_err());
        assert!(ParityCheckMatrix::from_rows(&[[1u8, 2]]).is_err());
        let h = ParityCheckMatrix::repetition3();
        assert!(matches!(
            h.syndrome(&bits("0011")),
            Err(QkdError::LengthMismatch { expected: 3, actual: 4, .. })
        ));
    }

    #[test]
    fn test_matrix_serde_as_nested_arrays() {
        let h: ParityCheckMatrix = serde_json::from_str("[[1,1,0],[0,1,1]]").unwrap();
        assert_eq!(h, ParityCheckMatrix::repetition3());
        assert_eq!(serde_json::to_string(&h).unwrap(), "[[1,1,0],[0,1,1]]");
        assert!(serde_json::from_str::<ParityCheckMatrix>("[[1,3]]").is_err());
    }
}
