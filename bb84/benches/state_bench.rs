use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bb84::prelude::*;

fn benchmark_stages(c: &mut Criterion) {
    c.bench_function("encode_and_transmit_1024", |b| {
        let mut rng = seeded_source(1);
        let bits = rng.generate_binary_array(1024);
        let alice = rng.generate_bases(1024);
        let bob = rng.generate_bases(1024);
        let channel = NoisyChannel::new(0.02).unwrap();
        b.iter(|| {
            let states = encode(&bits, &alice).unwrap();
            channel.transmit(black_box(&states), &bob, &mut rng).unwrap()
        });
    });

    c.bench_function("sift_1024", |b| {
        let mut rng = seeded_source(2);
        let bits = rng.generate_binary_array(1024);
        let alice = rng.generate_bases(1024);
        let bob = rng.generate_bases(1024);
        b.iter(|| sift(&alice, &bob, black_box(&bits)).unwrap());
    });

    c.bench_function("reconcile_blocks_repetition3_384", |b| {
        let mut rng = seeded_source(3);
        let reconciler = Reconciler::new(ParityCheckMatrix::repetition3());
        let alice = rng.generate_binary_array(384);
        let bob = alice.flipped(17).unwrap().flipped(200).unwrap();
        let syndromes = reconciler.block_syndromes(&alice).unwrap();
        b.iter(|| reconciler.reconcile_blocks(black_box(&bob), &syndromes).unwrap());
    });

    c.bench_function("two_universal_hash_256_to_64", |b| {
        let mut rng = seeded_source(4);
        let hasher = TwoUniversalHasher::with_seed(256, 64, 1.0, 11).unwrap();
        let key = rng.generate_binary_array(256);
        b.iter(|| hasher.hash(black_box(&key)).unwrap());
    });

    c.bench_function("protocol_run_1024", |b| {
        let protocol = Bb84Protocol::new(ProtocolConfig::default()).unwrap();
        let channel = NoisyChannel::new(0.01).unwrap();
        let mut rng = seeded_source(5);
        b.iter(|| protocol.run(&channel, &mut rng).stats);
    });
}

criterion_group!(benches, benchmark_stages);
criterion_main!(benches);
