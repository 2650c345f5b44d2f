//! # bb84
//!
//! Classical post-processing for the BB84 quantum key distribution protocol.
//!
//! Alice prepares random bits in random bases and sends them over a
//! [`QuantumChannel`](channel::QuantumChannel); Bob measures each one in a random
//! basis. Everything after that happens over an authenticated public channel:
//!
//! - **Sifting**: keep the positions where both bases agree
//! - **Parameter estimation**: disclose a random sample, abort when too many bits disagree
//! - **Reconciliation**: correct Bob's key block by block from Alice's syndromes
//! - **Privacy amplification**: compress both keys with a shared two-universal hash
//!
//! [`Bb84Protocol`](bb84_protocol::Bb84Protocol) drives one run through these
//! stages as an explicit state machine. [`simulation`] repeats runs in bulk to
//! measure abort and success rates under noise and eavesdropping.
//!
//! ```no_run
//! use bb84::prelude::*;
//!
//! let protocol = Bb84Protocol::new(ProtocolConfig::default())?;
//! let run = protocol.run(&NoisyChannel::noiseless(), &mut seeded_source(7));
//! let keys = run.into_result()?;
//! assert!(keys.is_consistent());
//! # Ok::<(), bb84::QkdError>(())
//! ```

pub mod bb84_protocol;
pub mod bb84_states;
pub mod bits;
pub mod channel;
pub mod config;
pub mod error;
pub mod estimation;
pub mod privacy_amplification;
pub mod random;
pub mod reconciliation;
pub mod sifting;
pub mod simulation;
pub mod verification;

#[cfg(test)]
mod tests;

pub use error::{QkdError, Result};

pub mod prelude {
    pub use crate::bb84_protocol::*;
    pub use crate::bb84_states::*;
    pub use crate::bits::*;
    pub use crate::channel::*;
    pub use crate::config::*;
    pub use crate::error::QkdError;
    pub use crate::estimation::*;
    pub use crate::privacy_amplification::*;
    pub use crate::random::*;
    pub use crate::reconciliation::*;
    pub use crate::sifting::*;
    pub use crate::simulation::*;
    pub use crate::verification::*;
}
