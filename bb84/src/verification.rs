//! Key confirmation after reconciliation.
//!
//! Syndrome decoding can silently miscorrect a block holding two or more
//! errors. Before amplification each party publishes a short tag of its
//! reconciled key; differing tags mean the keys differ and the run must restart.

use sha2::{Digest, Sha256};

use crate::bits::BitString;

/// Bits disclosed by one confirmation tag.
pub const CONFIRMATION_TAG_BITS: usize = 64;

const DOMAIN: &[u8] = b"bb84/key-confirmation/v1";

/// Truncated SHA-256 over a domain prefix, the key length and the packed key.
pub fn confirmation_tag(key: &BitString) -> [u8; CONFIRMATION_TAG_BITS / 8] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    hasher.update((key.len() as u64).to_be_bytes());
    hasher.update(key.to_bytes());
    let digest = hasher.finalize();

    let mut tag = [0u8; CONFIRMATION_TAG_BITS / 8];
    tag.copy_from_slice(&digest[..CONFIRMATION_TAG_BITS / 8]);
    tag
}

pub fn keys_confirmed(alice: &BitString, bob: &BitString) -> bool {
    confirmation_tag(alice) == confirmation_tag(bob)
}
