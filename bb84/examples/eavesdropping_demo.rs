//! Intercept-resend eavesdropping and how parameter estimation exposes it.

use bb84::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("BB84 Eavesdropping Simulation");
    println!();

    let mut rng = seeded_source(99);
    let n = 2_000;
    let alice_bits = rng.generate_binary_array(n);
    let alice_bases = rng.generate_bases(n);
    let bob_bases = rng.generate_bases(n);
    let states = encode(&alice_bits, &alice_bases)?;

    // Eve measures every qubit in a random basis and resends what she saw.
    let eve = InterceptResend::new(NoisyChannel::noiseless(), 1.0)?;
    let (forwarded, record) = eve.intercept(&states, &mut rng);
    let eve_right_basis = record
        .indices
        .iter()
        .zip(record.bases.iter())
        .filter(|&(&i, &basis)| alice_bases.get(i) == Some(basis))
        .count();
    println!(
        "Eve picked Alice's basis on {} of {} qubits",
        eve_right_basis,
        record.indices.len()
    );

    let bob_bits = NoisyChannel::noiseless().transmit(&forwarded, &bob_bases, &mut rng)?;
    let alice_sifted = sift(&alice_bases, &bob_bases, &alice_bits)?;
    let bob_sifted = sift(&alice_bases, &bob_bases, &bob_bits)?;
    let qber = alice_sifted.hamming_distance(&bob_sifted)? as f64 / alice_sifted.len() as f64;
    println!("Sifted key of {} bits, error rate {:.3}", alice_sifted.len(), qber);
    println!(
        "Secret fraction at that error rate: {:.3}",
        secret_key_fraction(qber)
    );
    println!();

    // Full protocol runs at increasing interception rates.
    let protocol = Bb84Protocol::new(ProtocolConfig::default())?;
    for fraction in [0.0, 0.1, 0.25, 0.5, 1.0] {
        let channel = InterceptResend::new(NoisyChannel::noiseless(), fraction)?;
        let run = protocol.run(&channel, &mut seeded_source(7));
        println!(
            "intercept {:>4.2}: {} mismatches in {} tested bits -> {:?}",
            fraction,
            run.stats.mismatches,
            run.stats.tested,
            run.state()
        );
    }

    Ok(())
}
