//! One BB84 run, stage by stage, with every intermediate string printed.

use bb84::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut rng = seeded_source(2024);
    let n = 48;

    let alice_bits = rng.generate_binary_array(n);
    let alice_bases = rng.generate_bases(n);
    let bob_bases = rng.generate_bases(n);
    let states = encode(&alice_bits, &alice_bases)?;
    let bob_bits = NoisyChannel::new(0.02)?.transmit(&states, &bob_bases, &mut rng)?;

    println!("Alice's bits:  {}", alice_bits);
    println!("Alice's bases: {}", alice_bases.to_bits());
    println!("Bob's bases:   {}", bob_bases.to_bits());
    println!("Bob's bits:    {}", bob_bits);

    // Step 1: sifting
    let alice_sifted = sift(&alice_bases, &bob_bases, &alice_bits)?;
    let bob_sifted = sift(&alice_bases, &bob_bases, &bob_bits)?;
    println!();
    println!("Sifted ({} bits)", alice_sifted.len());
    println!("  Alice: {}", alice_sifted);
    println!("  Bob:   {}", bob_sifted);

    // Step 2: parameter estimation
    let estimator = ParameterEstimator::new(0.25, 2)?;
    let estimate = estimator.estimate(&alice_sifted, &bob_sifted, &mut rng)?;
    println!();
    println!(
        "Tested positions {:?}: {} mismatches, QBER {:.3}, {:?}",
        estimate.tested,
        estimate.mismatches,
        estimate.error_rate(),
        estimate.decision
    );
    if estimate.decision == Decision::Abort {
        println!("Too many errors, aborting.");
        return Ok(());
    }
    let alice_key = estimate.surviving_key(&alice_sifted)?;
    let bob_key = estimate.surviving_key(&bob_sifted)?;

    // Step 3: reconciliation over blocks of the repetition code
    let reconciler = Reconciler::new(ParityCheckMatrix::repetition3());
    let syndromes = reconciler.block_syndromes(&alice_key)?;
    let reconciled = reconciler.reconcile_blocks(&bob_key, &syndromes)?;
    let alice_key = alice_key.truncated(reconciled.corrected.len());
    println!();
    println!(
        "Reconciled {} blocks, {} bits flipped",
        reconciled.blocks, reconciled.corrected_bits
    );
    println!("  Alice: {}", alice_key);
    println!("  Bob:   {}", reconciled.corrected);
    println!("  Tags agree: {}", keys_confirmed(&alice_key, &reconciled.corrected));

    // Step 4: privacy amplification
    let input_len = alice_key.len();
    let output_len = (input_len / 3).max(1);
    let alice_hasher = TwoUniversalHasher::with_seed(input_len, output_len, 1.0, 11)?;
    let bob_hasher = TwoUniversalHasher::with_seed(input_len, output_len, 1.0, 11)?;
    let alice_secret = alice_hasher.hash(&alice_key)?;
    let bob_secret = bob_hasher.hash(&reconciled.corrected)?;
    println!();
    println!("Final Alice's key: {}", alice_secret);
    println!("Final Bob's key:   {}", bob_secret);
    println!("Keys match: {}", alice_secret == bob_secret);

    Ok(())
}
