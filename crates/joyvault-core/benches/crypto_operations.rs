//! Benchmarks for Life Phrase derivation, secret sealing and account decoding.
//!
//! Derivation is intentionally slow (scrypt N=2^14); the group uses a small
//! sample size so a full run stays reasonable.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use joyvault_core::crypto::cipher::{decrypt, encrypt};
use joyvault_core::crypto::kdf;
use joyvault_core::crypto::keys::MasterKey;
use joyvault_core::crypto::strength::validate_strength;
use joyvault_core::protocol::accounts::{EncryptedSecret, decode_secret, encode_account_padded};
use joyvault_core::protocol::{ProgramAddresses, SecretType};
use solana_program::pubkey::Pubkey;
use std::hint::black_box;

const PHRASE: &str = "Grandmother garden purple flowers 42 sunset evening over Enugu";

fn bench_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("life_phrase_derivation");
    group.sample_size(10);
    group.bench_function("scrypt_v1", |b| {
        b.iter(|| kdf::derive(black_box(PHRASE), None).unwrap());
    });
    group.bench_function("scrypt_v1_with_context", |b| {
        b.iter(|| kdf::derive(black_box(PHRASE), Some(black_box("wallet-context"))).unwrap());
    });
    group.finish();

    c.bench_function("validate_strength", |b| {
        b.iter(|| validate_strength(black_box(PHRASE)));
    });
}

fn bench_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("secret_cipher");
    let master_key = MasterKey::random();

    for size in [16usize, 256, 1024] {
        let plaintext = vec![0x42u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", size), &plaintext, |b, data| {
            b.iter(|| encrypt(&master_key, black_box(data)).unwrap());
        });

        let sealed = encrypt(&master_key, &plaintext).unwrap();
        group.bench_with_input(BenchmarkId::new("decrypt", size), &sealed, |b, sealed| {
            b.iter(|| decrypt(&master_key, black_box(&sealed.ciphertext), &sealed.nonce).unwrap());
        });
    }
    group.finish();
}

fn bench_protocol(c: &mut Criterion) {
    let addresses = ProgramAddresses::default();
    let vault = Pubkey::new_unique();

    c.bench_function("secret_address", |b| {
        b.iter(|| addresses.secret_address(black_box(&vault), black_box(7)));
    });

    let account = EncryptedSecret {
        vault,
        secret_type: SecretType::Password,
        ciphertext: vec![0xAB; 512],
        nonce: [1; 12],
        created_at: 1_767_225_600,
        bump: 254,
    };
    let data = encode_account_padded(&account).unwrap();
    c.bench_function("decode_secret_account", |b| {
        b.iter(|| decode_secret(black_box(&data)).unwrap());
    });
}

criterion_group!(benches, bench_derivation, bench_cipher, bench_protocol);
criterion_main!(benches);
