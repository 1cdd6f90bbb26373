//! In-memory unlock state.
//!
//! A [`Session`] holds the master key between unlock and lock. It is never
//! persisted; locking drops the key, which zeroes it.

use thiserror::Error;
use tracing::{info, instrument};
use zeroize::Zeroizing;

use crate::crypto::kdf::{self, KdfVersion};
use crate::crypto::rate_limit::{AttemptTracker, Clock};
use crate::crypto::{CryptoError, MasterKey, VaultSeed};

/// Rate-limit identifier used when no context is supplied.
const ANONYMOUS: &str = "anonymous";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is locked")]
    Locked,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Default)]
pub struct Session {
    key: Option<MasterKey>,
    version: KdfVersion,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: KdfVersion) -> Self {
        Self { key: None, version }
    }

    /// Derive the master key for `life_phrase`, subject to `tracker`.
    ///
    /// `context` (typically the wallet address) salts the derivation and keys
    /// the attempt record. A derivation that succeeds says nothing about
    /// whether the phrase is the right one; that is decided by whether the
    /// resulting vault exists.
    #[instrument(level = "debug", skip_all)]
    pub fn unlock<C: Clock>(
        &mut self,
        life_phrase: &str,
        context: Option<&str>,
        tracker: &mut AttemptTracker<C>,
    ) -> Result<(), SessionError> {
        tracker.admit(context.unwrap_or(ANONYMOUS))?;
        let derived = kdf::derive_with_version(life_phrase, context, self.version)?;
        self.key = Some(derived.into_master_key());
        info!("Session unlocked");
        Ok(())
    }

    /// [`unlock`](Self::unlock) with the KDF on the blocking pool.
    #[cfg(feature = "async")]
    pub async fn unlock_async<C: Clock>(
        &mut self,
        life_phrase: Zeroizing<String>,
        context: Option<String>,
        tracker: &mut AttemptTracker<C>,
    ) -> Result<(), SessionError> {
        tracker.admit(context.as_deref().unwrap_or(ANONYMOUS))?;
        let version = self.version;
        let derived = tokio::task::spawn_blocking(move || {
            kdf::derive_with_version(&life_phrase, context.as_deref(), version)
        })
        .await
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("derivation task failed: {e}")))??;
        self.key = Some(derived.into_master_key());
        info!("Session unlocked");
        Ok(())
    }

    /// Drop the master key.
    pub fn lock(&mut self) {
        if self.key.take().is_some() {
            info!("Session locked");
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    pub fn master_key(&self) -> Result<&MasterKey, SessionError> {
        self.key.as_ref().ok_or(SessionError::Locked)
    }

    pub fn vault_seed(&self) -> Result<VaultSeed, SessionError> {
        Ok(self.master_key()?.vault_seed())
    }

    /// Fingerprint of the unlocked key, for presence checks only.
    pub fn fingerprint(&self) -> Result<Zeroizing<String>, SessionError> {
        Ok(self.master_key()?.fingerprint())
    }

    /// Constant-time check that the unlocked key has `fingerprint`.
    pub fn matches_fingerprint(&self, fingerprint: &str) -> bool {
        self.key
            .as_ref()
            .is_some_and(|key| key.matches_fingerprint(fingerprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FixedClock(Duration);

    impl Clock for FixedClock {
        fn now(&self) -> Duration {
            self.0
        }
    }

    const PHRASE: &str = "My first bicycle was blue summer 1998 Lagos";

    #[test]
    fn test_unlock_then_lock() {
        let mut tracker = AttemptTracker::with_clock(FixedClock(Duration::from_secs(1_000)));
        let mut session = Session::new();
        assert!(matches!(session.master_key(), Err(SessionError::Locked)));

        session.unlock(PHRASE, None, &mut tracker).unwrap();
        assert!(session.is_unlocked());
        let fingerprint = session.fingerprint().unwrap();
        assert_eq!(
            fingerprint.as_str(),
            "d7c81f2fc23f2a07a1e280ad43c6ae369c60ae1e49e7f829f99e0263bf83cf6a"
        );
        assert!(session.matches_fingerprint(&fingerprint));

        session.lock();
        assert!(!session.is_unlocked());
        assert!(!session.matches_fingerprint(&fingerprint));
        assert!(matches!(session.vault_seed(), Err(SessionError::Locked)));
    }

    #[test]
    fn test_unlock_is_rate_limited() {
        let mut tracker = AttemptTracker::with_clock(FixedClock(Duration::from_secs(1_000)));
        let mut session = Session::new();
        session.unlock(PHRASE, Some("wallet"), &mut tracker).unwrap();
        session.lock();

        let err = session
            .unlock(PHRASE, Some("wallet"), &mut tracker)
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Crypto(CryptoError::RateLimited { .. })
        ));
        assert!(!session.is_unlocked());
    }

    #[test]
    fn test_empty_phrase_counts_as_attempt() {
        let mut tracker = AttemptTracker::with_clock(FixedClock(Duration::from_secs(1_000)));
        let mut session = Session::new();
        assert!(matches!(
            session.unlock("  ", None, &mut tracker),
            Err(SessionError::Crypto(CryptoError::EmptyPhrase))
        ));
        assert_eq!(tracker.record(ANONYMOUS).unwrap().count, 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_unlock_async() {
        let mut tracker = AttemptTracker::with_clock(FixedClock(Duration::from_secs(1_000)));
        let mut session = Session::new();
        session
            .unlock_async(Zeroizing::new(PHRASE.to_string()), None, &mut tracker)
            .await
            .unwrap();
        assert_eq!(
            session.vault_seed().unwrap().to_string(),
            "7ecd55fdef4f44dad72105faa465ad18893db204c60fa38e9ccf60bc3d2c5734"
        );
    }
}
