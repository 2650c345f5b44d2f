//! Use a BB84 secret as an AES-256-GCM key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use bb84::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = ProtocolConfig::default();
    config.qubits = 4096;
    config.abort_threshold = 12;
    config.hasher = HasherConfig::new(768, 128, 1.0, None);
    let protocol = Bb84Protocol::new(config)?;

    let mut rng = rand::thread_rng();
    let keys = protocol
        .run(&NoisyChannel::new(0.002)?, &mut rng)
        .into_result()?;
    println!("Agreed on a {}-bit secret", keys.alice.len());

    // Stretch the secret to 256 bits on each side.
    let alice_key = Sha256::digest(keys.alice.to_bytes());
    let bob_key = Sha256::digest(keys.bob.to_bytes());
    let alice_cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&alice_key));
    let bob_cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bob_key));

    let mut nonce = [0u8; 12];
    rng.fill_bytes(&mut nonce);
    let nonce = Nonce::from_slice(&nonce);

    let message = b"Your secret message";
    let ciphertext = alice_cipher
        .encrypt(nonce, message.as_ref())
        .expect("encryption failure");
    let plaintext = bob_cipher
        .decrypt(nonce, ciphertext.as_ref())
        .expect("decryption failure");

    assert_eq!(message, &plaintext[..]);
    println!("Success! Bob decrypted Alice's message with the reconciled key.");

    Ok(())
}
