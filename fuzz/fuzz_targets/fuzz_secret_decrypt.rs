//! Fuzz target for secret payload decryption
//!
//! Tests:
//! - Arbitrary ciphertext/nonce pairs never panic and never authenticate
//! - Any single-byte change to a sealed secret is rejected
//! - Decrypted plaintext that is not a `{title, content}` record is reported, not unwrapped

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use joyvault_core::crypto::cipher::{decrypt, encrypt, open_payload};
use joyvault_core::crypto::{CryptoError, MasterKey};

/// Fixed master key for fuzzing
fn fixed_master_key() -> MasterKey {
    let mut key = [0u8; 32];
    for (i, b) in key.iter_mut().enumerate() {
        *b = i as u8;
    }
    MasterKey::from_bytes(key)
}

#[derive(Arbitrary, Debug)]
enum FuzzInput {
    /// Raw bytes handed straight to the decryptor
    Raw { ciphertext: Vec<u8>, nonce: Vec<u8> },
    /// Seal a plaintext, flip one byte, expect rejection
    Tamper {
        plaintext: Vec<u8>,
        position: usize,
        flip: u8,
        in_nonce: bool,
    },
}

fuzz_target!(|input: FuzzInput| {
    let key = fixed_master_key();

    match input {
        FuzzInput::Raw { ciphertext, nonce } => {
            let _ = open_payload(&key, &ciphertext, &nonce);
            if let Ok(plaintext) = decrypt(&key, &ciphertext, &nonce) {
                // Only reachable by forging a GCM tag
                panic!("forged ciphertext authenticated: {} bytes", plaintext.len());
            }
        }
        FuzzInput::Tamper {
            plaintext,
            position,
            flip,
            in_nonce,
        } => {
            let Ok(mut sealed) = encrypt(&key, &plaintext) else {
                return;
            };
            assert_eq!(
                decrypt(&key, &sealed.ciphertext, &sealed.nonce).unwrap().as_slice(),
                plaintext.as_slice()
            );

            let flip = flip.max(1);
            if in_nonce {
                let i = position % sealed.nonce.len();
                sealed.nonce[i] ^= flip;
            } else {
                let i = position % sealed.ciphertext.len();
                sealed.ciphertext[i] ^= flip;
            }
            assert!(matches!(
                decrypt(&key, &sealed.ciphertext, &sealed.nonce),
                Err(CryptoError::DecryptionFailed)
            ));
        }
    }
});
