//! Success and abort rates over a range of channel noise levels.

use bb84::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("BB84 Protocol with Noise Simulation");
    println!();

    let mut protocol = ProtocolConfig::default();
    protocol.abort_threshold = 8;

    println!(" noise   done  aborted  failed   qber   h2-rate");
    for noise in [0.0, 0.01, 0.02, 0.05, 0.1, 0.2] {
        let result = run_experiment(&SimConfig {
            protocol: protocol.clone(),
            flip_probability: noise,
            intercept_fraction: 0.0,
            trials: 200,
            seed: 5,
        })?;
        println!(
            " {:>5.2}  {:>5}  {:>7}  {:>6}  {:.3}  {:.3}",
            noise,
            result.completed,
            result.aborted,
            result.reconcile_failed,
            result.pooled_error_rate,
            result.asymptotic_key_fraction()
        );
    }

    Ok(())
}
