//! End-to-end BB84 post-processing.
//!
//! One call to [`Bb84Protocol::run`] is one protocol run:
//!
//! ```text
//! Init → Sifting → ParameterEstimation → Reconciling → Amplifying → Done
//!                        │                    │
//!                        └→ Aborted           └→ ReconcileFailed
//! ```
//!
//! A shortage of key material at any stage also ends in `Aborted`. Failed runs
//! are final: every intermediate string is dropped with the run and the caller
//! starts over with fresh randomness.

use serde::{Deserialize, Serialize};

use crate::bb84_states::encode;
use crate::bits::SharedSecret;
use crate::channel::QuantumChannel;
use crate::config::ProtocolConfig;
use crate::error::{QkdError, Result};
use crate::estimation::{Decision, ParameterEstimator};
use crate::privacy_amplification::{HashSeed, HasherConfig, TwoUniversalHasher};
use crate::random::RandomSource;
use crate::reconciliation::Reconciler;
use crate::sifting::sift;
use crate::verification::{keys_confirmed, CONFIRMATION_TAG_BITS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolState {
    Init,
    Sifting,
    ParameterEstimation,
    Aborted,
    Reconciling,
    ReconcileFailed,
    Amplifying,
    Done,
}

impl ProtocolState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProtocolState::Aborted | ProtocolState::ReconcileFailed | ProtocolState::Done
        )
    }

    fn can_advance_to(self, next: ProtocolState) -> bool {
        use ProtocolState::*;
        match (self, next) {
            (Init, Sifting)
            | (Sifting, ParameterEstimation)
            | (ParameterEstimation, Reconciling)
            | (Reconciling, Amplifying)
            | (Reconciling, ReconcileFailed)
            | (Amplifying, Done) => true,
            (from, Aborted) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Tracks the current state of one run and every state it passed through.
#[derive(Debug, Clone)]
pub struct ProtocolStateMachine {
    trace: Vec<ProtocolState>,
}

impl Default for ProtocolStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolStateMachine {
    pub fn new() -> Self {
        Self {
            trace: vec![ProtocolState::Init],
        }
    }

    pub fn current_state(&self) -> ProtocolState {
        self.trace.last().copied().unwrap_or(ProtocolState::Init)
    }

    pub fn advance(&mut self, next: ProtocolState) -> Result<()> {
        let from = self.current_state();
        if !from.can_advance_to(next) {
            return Err(QkdError::InvalidTransition { from, to: next });
        }
        log::debug!("protocol {:?} -> {:?}", from, next);
        self.trace.push(next);
        Ok(())
    }

    /// Move to the terminal state matching `error`. No-op once terminal.
    pub fn fail(&mut self, error: &QkdError) {
        let from = self.current_state();
        if from.is_terminal() {
            return;
        }
        let next = match error {
            QkdError::ReconciliationFailure { .. } if from == ProtocolState::Reconciling => {
                ProtocolState::ReconcileFailed
            }
            _ => ProtocolState::Aborted,
        };
        log::debug!("protocol {:?} -> {:?}: {}", from, next, error);
        self.trace.push(next);
    }

    pub fn trace(&self) -> &[ProtocolState] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<ProtocolState> {
        self.trace
    }
}

/// Counters collected during a run, filled in as far as the run got.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub qubits: usize,
    pub sifted_len: usize,
    pub tested: usize,
    pub mismatches: usize,
    pub reconciled_len: usize,
    pub blocks: usize,
    pub corrected_bits: usize,
    /// Syndrome and confirmation-tag bits published during reconciliation.
    pub disclosed_bits: usize,
    /// Seed of the hash function chosen for this run, once amplification starts.
    pub hash_seed: Option<HashSeed>,
    pub secret_len: usize,
}

impl RunStats {
    /// Observed mismatch rate among the tested bits.
    pub fn qber(&self) -> f64 {
        if self.tested == 0 {
            0.0
        } else {
            self.mismatches as f64 / self.tested as f64
        }
    }
}

/// The two parties' final secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAgreement {
    pub alice: SharedSecret,
    pub bob: SharedSecret,
}

impl KeyAgreement {
    pub fn is_consistent(&self) -> bool {
        self.alice == self.bob
    }
}

#[derive(Debug)]
#[must_use = "a protocol run may have aborted and must be checked"]
pub struct ProtocolRun {
    pub trace: Vec<ProtocolState>,
    pub stats: RunStats,
    pub outcome: Result<KeyAgreement>,
}

impl ProtocolRun {
    pub fn state(&self) -> ProtocolState {
        self.trace.last().copied().unwrap_or(ProtocolState::Init)
    }

    pub fn into_result(self) -> Result<KeyAgreement> {
        self.outcome
    }
}

/// Configured protocol: everything fixed for the lifetime of many runs.
///
/// The hash function is not fixed here. Every run draws its own seed at the
/// start of privacy amplification.
#[derive(Debug, Clone)]
pub struct Bb84Protocol {
    config: ProtocolConfig,
    estimator: ParameterEstimator,
    reconciler: Reconciler,
}

impl Bb84Protocol {
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        config.validate()?;
        let estimator = ParameterEstimator::new(config.test_fraction, config.abort_threshold)?;
        let reconciler = Reconciler::new(config.parity_check.clone());

        let protocol = Self {
            config,
            estimator,
            reconciler,
        };
        protocol.check_privacy_budget();
        Ok(protocol)
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn estimator(&self) -> &ParameterEstimator {
        &self.estimator
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Bits published about the `input_len` hashed bits: their syndromes
    /// plus the confirmation tag when keys are confirmed.
    pub fn disclosed_bits(&self) -> usize {
        let matrix = self.reconciler.parity_check();
        let blocks = self.config.hasher.input_len.div_ceil(matrix.codeword_len());
        let tag = if self.config.confirm_keys {
            CONFIRMATION_TAG_BITS
        } else {
            0
        };
        blocks * matrix.syndrome_len() + tag
    }

    fn check_privacy_budget(&self) {
        let disclosed = self.disclosed_bits();
        let hasher = &self.config.hasher;
        if hasher.output_len + disclosed > hasher.input_len {
            log::warn!(
                "output_len {} exceeds the {} input bits left after {} disclosed bits",
                hasher.output_len,
                hasher.input_len.saturating_sub(disclosed),
                disclosed
            );
        }
    }

    /// Execute one run over `channel`, drawing all randomness from `rng`.
    pub fn run<C: QuantumChannel, R: RandomSource + ?Sized>(
        &self,
        channel: &C,
        rng: &mut R,
    ) -> ProtocolRun {
        let mut machine = ProtocolStateMachine::new();
        let mut stats = RunStats {
            qubits: self.config.qubits,
            ..RunStats::default()
        };

        let outcome = self.execute(channel, rng, &mut machine, &mut stats);
        match &outcome {
            Ok(_) => log::info!(
                "run done: {} sifted, qber {:.3}, {} secret bits",
                stats.sifted_len,
                stats.qber(),
                stats.secret_len
            ),
            Err(err) => {
                machine.fail(err);
                log::info!("run ended in {:?}: {}", machine.current_state(), err);
            }
        }

        ProtocolRun {
            trace: machine.into_trace(),
            stats,
            outcome,
        }
    }

    fn execute<C: QuantumChannel, R: RandomSource + ?Sized>(
        &self,
        channel: &C,
        rng: &mut R,
        machine: &mut ProtocolStateMachine,
        stats: &mut RunStats,
    ) -> Result<KeyAgreement> {
        let n = self.config.qubits;
        let alice_bits = rng.generate_binary_array(n);
        let alice_bases = rng.generate_bases(n);
        let bob_bases = rng.generate_bases(n);
        let states = encode(&alice_bits, &alice_bases)?;
        let bob_raw = channel.transmit(&states, &bob_bases, rng)?;

        machine.advance(ProtocolState::Sifting)?;
        let alice_sifted = sift(&alice_bases, &bob_bases, &alice_bits)?;
        let bob_sifted = sift(&alice_bases, &bob_bases, &bob_raw)?;
        stats.sifted_len = alice_sifted.len();
        log::debug!("sifted {} of {} positions", alice_sifted.len(), n);
        if alice_sifted.is_empty() {
            return Err(QkdError::InsufficientData {
                context: "sifting",
                needed: 1,
                available: 0,
            });
        }

        machine.advance(ProtocolState::ParameterEstimation)?;
        let estimate = self.estimator.estimate(&alice_sifted, &bob_sifted, rng)?;
        stats.tested = estimate.tested.len();
        stats.mismatches = estimate.mismatches;
        log::debug!(
            "tested {} bits, {} mismatches (threshold {})",
            stats.tested,
            stats.mismatches,
            self.estimator.abort_threshold()
        );
        if estimate.decision == Decision::Abort {
            return Err(QkdError::AbortedBySecurityCheck {
                mismatches: estimate.mismatches,
                tested: estimate.tested.len(),
                threshold: self.estimator.abort_threshold(),
            });
        }

        machine.advance(ProtocolState::Reconciling)?;
        let alice_key = estimate.surviving_key(&alice_sifted)?;
        let bob_key = estimate.surviving_key(&bob_sifted)?;
        let block_len = self.reconciler.block_len();
        let blocks = alice_key.len() / block_len;
        if blocks == 0 {
            return Err(QkdError::InsufficientData {
                context: "reconciliation",
                needed: block_len,
                available: alice_key.len(),
            });
        }
        let alice_key = alice_key.truncated(blocks * block_len);
        let syndromes = self.reconciler.block_syndromes(&alice_key)?;
        stats.blocks = blocks;
        stats.disclosed_bits = blocks * self.reconciler.parity_check().syndrome_len();
        let reconciled = self.reconciler.reconcile_blocks(&bob_key, &syndromes)?;
        stats.corrected_bits = reconciled.corrected_bits;
        stats.reconciled_len = reconciled.corrected.len();
        let bob_key = reconciled.corrected;

        if self.config.confirm_keys {
            stats.disclosed_bits += CONFIRMATION_TAG_BITS;
            if !keys_confirmed(&alice_key, &bob_key) {
                return Err(QkdError::ReconciliationFailure {
                    reason: format!(
                        "confirmation tags differ after correcting {} bits in {} blocks",
                        reconciled.corrected_bits, blocks
                    ),
                });
            }
        }

        machine.advance(ProtocolState::Amplifying)?;
        let input_len = self.config.hasher.input_len;
        if alice_key.len() < input_len {
            return Err(QkdError::InsufficientData {
                context: "privacy amplification",
                needed: input_len,
                available: alice_key.len(),
            });
        }
        // Alice picks the function and announces its seed; Bob builds his own copy.
        let seed = HashSeed::draw(rng);
        stats.hash_seed = Some(seed);
        log::debug!("hashing {} bits with seed {}", input_len, seed);
        let alice_hasher = TwoUniversalHasher::new(HasherConfig {
            seed: Some(seed),
            ..self.config.hasher.clone()
        })?;
        let bob_hasher = TwoUniversalHasher::new(alice_hasher.config().clone())?;
        let alice = alice_hasher.hash(&alice_key.truncated(input_len))?;
        let bob = bob_hasher.hash(&bob_key.truncated(input_len))?;
        stats.secret_len = alice.len();

        machine.advance(ProtocolState::Done)?;
        Ok(KeyAgreement { alice, bob })
    }
}
