//! Phrase to vault and back, with the real key derivation.

mod common;

use common::Harness;
use joyvault_core::client::Session;
use joyvault_core::crypto::strength::{StrengthError, validate_strength};
use joyvault_core::crypto::{AttemptTracker, CryptoError};
use joyvault_core::protocol::SecretType;

const PHRASE: &str = "Grandmother garden purple flowers 42 sunset evening over Enugu";

#[test]
fn test_short_phrase_is_invalid_but_scored() {
    let report = validate_strength("My dog Max was born in Lagos on Christmas 2015");
    assert!(!report.valid);
    assert!(report.score > 0);
    assert!(
        report
            .errors
            .iter()
            .any(|e| matches!(e, StrengthError::TooShort { min: 50, .. }))
    );
}

#[tokio::test]
async fn test_same_phrase_reopens_vault() {
    let h = Harness::new();
    assert!(validate_strength(PHRASE).valid);

    let mut tracker = AttemptTracker::new();
    let mut session = Session::new();
    session.unlock(PHRASE, None, &mut tracker).unwrap();
    let key = session.master_key().unwrap();
    h.client.create_vault(key).await.unwrap();
    h.client
        .add_secret(key, SecretType::PrivateKey, "laptop ssh", "-----BEGIN KEY-----")
        .await
        .unwrap();
    let first_address = h.client.locate(key).address;
    session.lock();

    // A fresh session on another device derives the same vault.
    let mut other = Session::new();
    other
        .unlock(PHRASE, None, &mut AttemptTracker::new())
        .unwrap();
    let key = other.master_key().unwrap();
    assert_eq!(h.client.locate(key).address, first_address);

    let listing = h.client.list_secrets(key).await.unwrap();
    assert!(listing.failures.is_empty());
    assert_eq!(listing.secrets[0].payload.title, "laptop ssh");
}

#[tokio::test]
async fn test_one_character_off_is_a_different_vault() {
    let h = Harness::new();

    let mut session = Session::new();
    session
        .unlock(PHRASE, None, &mut AttemptTracker::new())
        .unwrap();
    h.client
        .create_vault(session.master_key().unwrap())
        .await
        .unwrap();

    let typo = PHRASE.replace("42", "43");
    let mut wrong = Session::new();
    wrong
        .unlock(&typo, None, &mut AttemptTracker::new())
        .unwrap();
    let key = wrong.master_key().unwrap();
    assert!(
        h.client
            .fetch_vault(&h.client.locate(key).address)
            .await
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_repeated_unlocks_are_throttled() {
    let mut tracker = AttemptTracker::new();
    let mut session = Session::new();
    session.unlock(PHRASE, Some("wallet-a"), &mut tracker).unwrap();
    let err = session
        .unlock(PHRASE, Some("wallet-a"), &mut tracker)
        .unwrap_err();
    assert!(matches!(
        err,
        joyvault_core::client::SessionError::Crypto(CryptoError::RateLimited { .. })
    ));
}
