//! Progressive backoff for repeated Life Phrase attempts.
//!
//! The tracker is an explicit store owned by the caller and consulted before
//! every derivation. Time comes from an injected [`Clock`] so the schedule can
//! be driven deterministically in tests.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::CryptoError;

/// Required gap before the next attempt, indexed by attempts already made.
pub const PROGRESSIVE_DELAYS: [Duration; 6] = [
    Duration::from_secs(0),
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
];

/// Idle time after which an identifier's attempt count starts over.
pub const RESET_AFTER: Duration = Duration::from_secs(60);

/// Attempts advertised as the per-minute budget.
pub const MAX_ATTEMPTS_PER_MINUTE: u32 = 3;

const MAX_ENTRIES: usize = 10_000;

/// Source of the current time as an offset from the Unix epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub count: u32,
    pub last_attempt: Duration,
}

/// Outcome of [`AttemptTracker::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Time left before the next attempt is accepted; zero when allowed.
    pub delay: Duration,
    pub attempts_remaining: u32,
}

/// Attempt records keyed by identifier (typically a wallet address).
#[derive(Debug)]
pub struct AttemptTracker<C: Clock = SystemClock> {
    records: HashMap<String, AttemptRecord>,
    clock: C,
}

impl AttemptTracker<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for AttemptTracker<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> AttemptTracker<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            records: HashMap::new(),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Check whether `identifier` may attempt now, and record the attempt if so.
    ///
    /// A rejected attempt leaves the record untouched, so waiting out the
    /// reported delay is always enough to be admitted.
    pub fn check(&mut self, identifier: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let mut record = self
            .records
            .get(identifier)
            .copied()
            .unwrap_or(AttemptRecord {
                count: 0,
                last_attempt: Duration::ZERO,
            });

        let elapsed = now.saturating_sub(record.last_attempt);
        if elapsed > RESET_AFTER {
            record.count = 0;
        }

        let index = usize::try_from(record.count)
            .unwrap_or(usize::MAX)
            .min(PROGRESSIVE_DELAYS.len() - 1);
        let required = PROGRESSIVE_DELAYS[index];

        if elapsed < required {
            let delay = required - elapsed;
            debug!(identifier, attempts = record.count, ?delay, "Attempt rejected by backoff");
            return RateLimitDecision {
                allowed: false,
                delay,
                attempts_remaining: 0,
            };
        }

        record.count = record.count.saturating_add(1);
        record.last_attempt = now;
        self.records.insert(identifier.to_string(), record);
        self.evict_idle(now);

        RateLimitDecision {
            allowed: true,
            delay: Duration::ZERO,
            attempts_remaining: MAX_ATTEMPTS_PER_MINUTE.saturating_sub(record.count),
        }
    }

    /// [`check`](Self::check) as a `Result`, for use in front of derivation.
    pub fn admit(&mut self, identifier: &str) -> Result<RateLimitDecision, CryptoError> {
        let decision = self.check(identifier);
        if decision.allowed {
            Ok(decision)
        } else {
            Err(CryptoError::RateLimited {
                retry_after: decision.delay,
            })
        }
    }

    /// Forget `identifier`, e.g. after a successful unlock.
    pub fn reset(&mut self, identifier: &str) {
        self.records.remove(identifier);
    }

    pub fn record(&self, identifier: &str) -> Option<AttemptRecord> {
        self.records.get(identifier).copied()
    }

    fn evict_idle(&mut self, now: Duration) {
        if self.records.len() > MAX_ENTRIES {
            self.records
                .retain(|_, r| now.saturating_sub(r.last_attempt) <= RESET_AFTER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<Duration>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.0.get()
        }
    }

    fn tracker() -> (AttemptTracker<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        clock.advance(Duration::from_secs(1_700_000_000));
        (AttemptTracker::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_first_attempt_allowed() {
        let (mut tracker, _) = tracker();
        let decision = tracker.check("wallet");
        assert!(decision.allowed);
        assert_eq!(decision.attempts_remaining, 2);
    }

    #[test]
    fn test_progressive_delays() {
        let (mut tracker, clock) = tracker();
        assert!(tracker.check("wallet").allowed);

        // Second attempt needs 2s
        let denied = tracker.check("wallet");
        assert!(!denied.allowed);
        assert_eq!(denied.delay, Duration::from_secs(2));

        clock.advance(Duration::from_secs(2));
        let second = tracker.check("wallet");
        assert!(second.allowed);
        assert_eq!(second.attempts_remaining, 1);

        // Third attempt needs 5s
        clock.advance(Duration::from_secs(4));
        let denied = tracker.check("wallet");
        assert_eq!(denied.delay, Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));
        let third = tracker.check("wallet");
        assert!(third.allowed);
        assert_eq!(third.attempts_remaining, 0);
    }

    #[test]
    fn test_delay_caps_at_one_minute() {
        let (mut tracker, clock) = tracker();
        for gap in [0, 2, 5, 10, 30, 60] {
            clock.advance(Duration::from_secs(gap));
            assert!(tracker.check("wallet").allowed, "gap {gap}");
        }
        // count is 6 now; the requirement stays at 60s, and a gap of exactly 60s
        // does not reset the count
        clock.advance(Duration::from_secs(59));
        assert_eq!(tracker.check("wallet").delay, Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));
        assert!(tracker.check("wallet").allowed);
        assert_eq!(tracker.record("wallet").unwrap().count, 7);
    }

    #[test]
    fn test_idle_resets_count() {
        let (mut tracker, clock) = tracker();
        assert!(tracker.check("wallet").allowed);
        clock.advance(Duration::from_secs(2));
        assert!(tracker.check("wallet").allowed);

        clock.advance(Duration::from_secs(61));
        let decision = tracker.check("wallet");
        assert!(decision.allowed);
        assert_eq!(tracker.record("wallet").unwrap().count, 1);
        assert_eq!(decision.attempts_remaining, 2);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (mut tracker, _) = tracker();
        assert!(tracker.check("a").allowed);
        assert!(tracker.check("b").allowed);
        assert!(!tracker.check("a").allowed);
    }

    #[test]
    fn test_admit_and_reset() {
        let (mut tracker, _) = tracker();
        tracker.admit("wallet").unwrap();
        let err = tracker.admit("wallet").unwrap_err();
        assert!(matches!(err, CryptoError::RateLimited { retry_after } if retry_after == Duration::from_secs(2)));

        tracker.reset("wallet");
        assert!(tracker.admit("wallet").is_ok());
    }
}
