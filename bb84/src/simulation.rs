//! Monte Carlo evaluation over many independent protocol runs.
//!
//! The channel model: each qubit is intercepted by an intercept-resend
//! eavesdropper with probability `intercept_fraction`, then suffers a bit flip
//! with probability `flip_probability`.
//!
//! Trial `i` draws from its own ChaCha8 stream (`seed`, stream `i`), so results
//! do not depend on how trials are scheduled across threads. The hash seed of
//! each run comes from the same stream, so `seed` alone fixes every outcome.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bb84_protocol::{Bb84Protocol, ProtocolRun, ProtocolState};
use crate::channel::{InterceptResend, NoisyChannel, QuantumChannel};
use crate::config::ProtocolConfig;
use crate::error::{QkdError, Result};
use crate::estimation::secret_key_fraction;

/// Configuration for a batch experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub protocol: ProtocolConfig,
    /// Bit-flip probability per qubit in transit.
    pub flip_probability: f64,
    /// Share of qubits measured and resent by the eavesdropper.
    pub intercept_fraction: f64,
    pub trials: usize,
    pub seed: u64,
}

/// Aggregated outcome of a batch experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimResult {
    pub trials: usize,
    pub completed: usize,
    pub aborted: usize,
    pub reconcile_failed: usize,
    /// Completed runs whose two secrets differ. Should stay at zero.
    pub disagreements: usize,
    /// Runs that stopped for lack of key material.
    pub insufficient: usize,
    /// Mismatches over tested bits, pooled across all runs that reached estimation.
    pub pooled_error_rate: f64,
    pub mean_secret_len: f64,
}

impl SimResult {
    pub fn abort_rate(&self) -> f64 {
        ratio(self.aborted, self.trials)
    }

    pub fn success_rate(&self) -> f64 {
        ratio(self.completed, self.trials)
    }

    /// Asymptotic secret fraction at the observed error rate.
    pub fn asymptotic_key_fraction(&self) -> f64 {
        secret_key_fraction(self.pooled_error_rate)
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Independent source for trial `trial` of an experiment seeded with `seed`.
pub fn trial_rng(seed: u64, trial: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(trial as u64);
    rng
}

/// Run trial `trial` of an experiment.
pub fn run_trial<C: QuantumChannel>(
    protocol: &Bb84Protocol,
    channel: &C,
    seed: u64,
    trial: usize,
) -> ProtocolRun {
    protocol.run(channel, &mut trial_rng(seed, trial))
}

fn summarize(runs: &[ProtocolRun]) -> SimResult {
    let mut result = SimResult {
        trials: runs.len(),
        ..SimResult::default()
    };
    let mut tested = 0;
    let mut mismatches = 0;
    let mut secret_bits = 0;

    for run in runs {
        tested += run.stats.tested;
        mismatches += run.stats.mismatches;
        match run.state() {
            ProtocolState::Done => {
                result.completed += 1;
                secret_bits += run.stats.secret_len;
                if let Ok(keys) = &run.outcome {
                    if !keys.is_consistent() {
                        result.disagreements += 1;
                    }
                }
            }
            ProtocolState::ReconcileFailed => result.reconcile_failed += 1,
            _ => result.aborted += 1,
        }
        if matches!(run.outcome, Err(QkdError::InsufficientData { .. })) {
            result.insufficient += 1;
        }
    }

    result.pooled_error_rate = ratio(mismatches, tested);
    result.mean_secret_len = if result.completed == 0 {
        0.0
    } else {
        secret_bits as f64 / result.completed as f64
    };
    result
}

/// Run every trial of `config` and aggregate the outcomes.
pub fn run_experiment(config: &SimConfig) -> Result<SimResult> {
    let protocol = Bb84Protocol::new(config.protocol.clone())?;
    let channel = InterceptResend::new(
        NoisyChannel::new(config.flip_probability)?,
        config.intercept_fraction,
    )?;

    #[cfg(feature = "parallel")]
    let runs: Vec<ProtocolRun> = (0..config.trials)
        .into_par_iter()
        .map(|trial| run_trial(&protocol, &channel, config.seed, trial))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let runs: Vec<ProtocolRun> = (0..config.trials)
        .map(|trial| run_trial(&protocol, &channel, config.seed, trial))
        .collect();

    let result = summarize(&runs);
    log::info!(
        "{} trials: {} done, {} aborted, {} reconcile failures, pooled error rate {:.4}",
        result.trials,
        result.completed,
        result.aborted,
        result.reconcile_failed,
        result.pooled_error_rate
    );
    Ok(result)
}

/// Repeat an experiment for each abort threshold, same seeds throughout.
pub fn threshold_sweep(
    config: &SimConfig,
    thresholds: &[usize],
) -> Result<Vec<(usize, SimResult)>> {
    thresholds
        .iter()
        .map(|&threshold| {
            let mut swept = config.clone();
            swept.protocol.abort_threshold = threshold;
            run_experiment(&swept).map(|result| (threshold, result))
        })
        .collect()
}
