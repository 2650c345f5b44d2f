use crate::bb84_protocol::{Bb84Protocol, ProtocolState};
use crate::bb84_states::encode;
use crate::channel::{InterceptResend, NoisyChannel, QuantumChannel};
use crate::config::ProtocolConfig;
use crate::estimation::{Decision, ParameterEstimator};
use crate::privacy_amplification::TwoUniversalHasher;
use crate::random::{seeded_source, RandomSource};
use crate::reconciliation::{ParityCheckMatrix, Reconciler};
use crate::sifting::sift;
use crate::simulation::{run_experiment, run_trial, threshold_sweep, SimConfig};

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol_config() -> ProtocolConfig {
        ProtocolConfig::default()
    }

    fn sim(
        protocol: ProtocolConfig,
        flip_probability: f64,
        intercept_fraction: f64,
        trials: usize,
    ) -> SimConfig {
        SimConfig {
            protocol,
            flip_probability,
            intercept_fraction,
            trials,
            seed: 99,
        }
    }

    #[test]
    fn test_stage_by_stage_pipeline() {
        let mut rng = seeded_source(42);
        let n = 512;

        // Quantum phase.
        let alice_bits = rng.generate_binary_array(n);
        let alice_bases = rng.generate_bases(n);
        let bob_bases = rng.generate_bases(n);
        let states = encode(&alice_bits, &alice_bases).unwrap();
        let bob_bits = NoisyChannel::noiseless()
            .transmit(&states, &bob_bases, &mut rng)
            .unwrap();

        // Sifting.
        let alice_sifted = sift(&alice_bases, &bob_bases, &alice_bits).unwrap();
        let bob_sifted = sift(&alice_bases, &bob_bases, &bob_bits).unwrap();
        assert_eq!(alice_sifted, bob_sifted);
        assert!(alice_sifted.len() > 200);

        // Parameter estimation.
        let estimator = ParameterEstimator::new(0.25, 0).unwrap();
        let estimate = estimator.estimate(&alice_sifted, &bob_sifted, &mut rng).unwrap();
        assert_eq!(estimate.decision, Decision::Continue);
        assert_eq!(estimate.tested.len(), alice_sifted.len() / 4);
        let alice_key = estimate.surviving_key(&alice_sifted).unwrap();
        let bob_key = estimate.surviving_key(&bob_sifted).unwrap();

        // Reconciliation.
        let reconciler = Reconciler::new(ParityCheckMatrix::repetition3());
        let syndromes = reconciler.block_syndromes(&alice_key).unwrap();
        let reconciled = reconciler.reconcile_blocks(&bob_key, &syndromes).unwrap();
        assert_eq!(reconciled.corrected_bits, 0);
        let alice_key = alice_key.truncated(reconciled.corrected.len());
        assert_eq!(alice_key, reconciled.corrected);

        // Privacy amplification, each party with its own hasher.
        let alice_hasher = TwoUniversalHasher::with_seed(96, 24, 1.0, 11).unwrap();
        let bob_hasher = TwoUniversalHasher::with_seed(96, 24, 1.0, 11).unwrap();
        let alice_secret = alice_hasher.hash(&alice_key.truncated(96)).unwrap();
        let bob_secret = bob_hasher.hash(&reconciled.corrected.truncated(96)).unwrap();
        assert_eq!(alice_secret, bob_secret);
        assert_eq!(alice_secret.len(), 24);
    }

    #[test]
    fn test_seeded_runs_replay_exactly() {
        let protocol = Bb84Protocol::new(protocol_config()).unwrap();
        let channel = NoisyChannel::new(0.01).unwrap();
        let a = protocol.run(&channel, &mut seeded_source(5));
        let b = protocol.run(&channel, &mut seeded_source(5));
        assert_eq!(a.trace, b.trace);
        assert_eq!(a.stats, b.stats);
        assert!(a.stats.hash_seed.is_some());
        assert_eq!(a.outcome.ok(), b.outcome.ok());
    }

    #[test]
    fn test_eavesdropper_raises_error_rate_to_a_quarter() {
        let mut config = protocol_config();
        config.abort_threshold = 1_000;
        let result = run_experiment(&sim(config, 0.0, 1.0, 60)).unwrap();
        assert_eq!(result.aborted, 0);
        assert!(
            result.pooled_error_rate > 0.20 && result.pooled_error_rate < 0.30,
            "pooled error rate {}",
            result.pooled_error_rate
        );
        // Confirmation catches every miscorrected run.
        assert_eq!(result.completed, 0);
        assert_eq!(result.reconcile_failed, 60);
        assert_eq!(result.asymptotic_key_fraction(), 0.0);
    }

    #[test]
    fn test_abort_rate_rises_as_threshold_tightens() {
        let config = sim(protocol_config(), 0.0, 0.5, 60);
        let sweep = threshold_sweep(&config, &[40, 12, 8, 2]).unwrap();
        let rates: Vec<f64> = sweep.iter().map(|(_, result)| result.abort_rate()).collect();
        assert!(rates.windows(2).all(|w| w[0] <= w[1]), "rates {:?}", rates);
        assert_eq!(rates[0], 0.0);
        assert!(rates[3] > 0.9, "rates {:?}", rates);
    }

    #[test]
    fn test_small_noise_is_corrected() {
        let protocol = Bb84Protocol::new(protocol_config()).unwrap();
        let channel = InterceptResend::new(NoisyChannel::new(0.005).unwrap(), 0.0).unwrap();

        let runs: Vec<_> = (0..40)
            .map(|trial| run_trial(&protocol, &channel, 7, trial))
            .collect();
        let done = runs.iter().filter(|run| run.state() == ProtocolState::Done).count();
        let corrected: usize = runs.iter().map(|run| run.stats.corrected_bits).sum();
        assert!(done >= 35, "{} of 40 runs completed", done);
        assert!(corrected > 0);
        for run in &runs {
            if let Ok(keys) = &run.outcome {
                assert!(keys.is_consistent());
            }
        }
    }

    #[test]
    fn test_unconfirmed_keys_can_disagree() {
        let mut config = protocol_config();
        config.abort_threshold = 1_000;
        config.confirm_keys = false;
        let result = run_experiment(&sim(config, 0.0, 1.0, 20)).unwrap();
        assert_eq!(result.completed, 20);
        assert!(result.disagreements > 0);
    }

    #[test]
    fn test_sources_fit_line_width() {
        let sources = [
            ("bb84_protocol.rs", include_str!("bb84_protocol.rs")),
            ("bb84_states.rs", include_str!("bb84_states.rs")),
            ("bits.rs", include_str!("bits.rs")),
            ("channel.rs", include_str!("channel.rs")),
            ("config.rs", include_str!("config.rs")),
            ("error.rs", include_str!("error.rs")),
            ("estimation.rs", include_str!("estimation.rs")),
            ("privacy_amplification.rs", include_str!("privacy_amplification.rs")),
            ("random.rs", include_str!("random.rs")),
            ("reconciliation.rs", include_str!("reconciliation.rs")),
            ("sifting.rs", include_str!("sifting.rs")),
            ("simulation.rs", include_str!("simulation.rs")),
            ("tests.rs", include_str!("tests.rs")),
            ("verification.rs", include_str!("verification.rs")),
            ("bin/bb84_sim.rs", include_str!("bin/bb84_sim.rs")),
        ];
        for (name, text) in sources {
            for (number, line) in text.lines().enumerate() {
                assert!(
                    line.chars().count() <= 100,
                    "{}:{} is {} columns wide",
                    name,
                    number + 1,
                    line.chars().count()
                );
            }
        }
    }

    #[test]
    fn test_json_config_with_hamming_code() {
        let config = ProtocolConfig::from_json_str(
            r#"{
                "qubits": 600,
                "abort_threshold": 2,
                "parity_check": [[1,0,1,0,1,0,1], [0,1,1,0,0,1,1], [0,0,0,1,1,1,1]],
                "hasher": {"input_len": 120, "output_len": 16, "load_factor": 2.0}
            }"#,
        )
        .unwrap();
        let protocol = Bb84Protocol::new(config).unwrap();
        assert_eq!(protocol.reconciler().block_len(), 7);

        let run = protocol.run(&NoisyChannel::noiseless(), &mut seeded_source(31));
        assert_eq!(
            run.trace,
            vec![
                ProtocolState::Init,
                ProtocolState::Sifting,
                ProtocolState::ParameterEstimation,
                ProtocolState::Reconciling,
                ProtocolState::Amplifying,
                ProtocolState::Done,
            ]
        );
        assert_eq!(run.stats.reconciled_len % 7, 0);
        let keys = run.into_result().unwrap();
        assert!(keys.is_consistent());
        assert_eq!(keys.alice.len(), 16);
    }
}
