//! Login Rate Limiting (AC-7)
//!
//! NIST SP 800-53 AC-7 (Unsuccessful Logon Attempts) compliant per-identity
//! login throttling: a sliding-window attempt tracker with progressive
//! delay and temporary lockout.
//!
//! # Behavior
//!
//! For each identity (login email) the limiter keeps the timestamps of
//! recent failed attempts plus an optional block expiry:
//!
//! 1. A blocked identity is rejected outright with the remaining block time.
//! 2. An expired block clears the block *and* the attempt history (full
//!    reset, not partial).
//! 3. Attempts older than the window are pruned lazily at check time.
//! 4. With `n > 0` prior failures in the window, the check waits
//!    `base^(n-1)` seconds before proceeding, slowing rapid brute-force
//!    attempts well before the hard limit.
//! 5. At `max_attempts` failures the identity is blocked for
//!    `block_duration`.
//!
//! A successful login fully resets the identity's tracking.
//!
//! # Concurrency
//!
//! State is a single map behind an `RwLock`, shared by `Clone` (all clones
//! see the same records). Write sections are short; the progressive delay
//! is an async suspension taken strictly *outside* the lock, so one
//! identity's backoff never stalls another identity's check. The block
//! decision is re-evaluated at a commit point after the delay, and attempts
//! are only ever recorded whole by [`LoginRateLimiter::record_failure`], so
//! a caller cancelled mid-delay leaves the state consistent.
//!
//! # Storage Note
//!
//! Tracking is in process memory and resets on restart. That is acceptable
//! for single-instance deployments; multi-instance deployments need a
//! shared backend and should treat this limiter as per-instance
//! best-effort.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::AuthError;
use crate::events::SecurityEvent;

// ============================================================================
// Clock
// ============================================================================

/// Time source for the limiter.
///
/// Injected so tests can advance time without sleeping. Production code
/// uses [`SystemClock`].
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Default clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ============================================================================
// Lockout Policy (AC-7)
// ============================================================================

/// Lockout policy configuration (AC-7).
///
/// All parameters are constructor-configurable; the defaults match the
/// deployed system: 5 attempts in a 5 minute window, 15 minute block,
/// delay doubling from 1s.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    /// Failed attempts within the window before lockout
    pub max_attempts: u32,

    /// Sliding window over which failed attempts are counted
    pub attempt_window: Duration,

    /// Block duration once `max_attempts` is reached
    pub block_duration: Duration,

    /// Base of the progressive delay: the n-th prior failure costs
    /// `base^(n-1)` seconds before the next check proceeds. `0` disables
    /// the delay (tests, or callers applying their own backoff).
    pub progressive_delay_base: u32,

    /// Upper bound on a single progressive delay
    pub max_delay: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_window: Duration::from_secs(5 * 60),
            block_duration: Duration::from_secs(15 * 60),
            progressive_delay_base: 2,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl LockoutPolicy {
    /// Create a new builder
    pub fn builder() -> LockoutPolicyBuilder {
        LockoutPolicyBuilder::default()
    }

    /// Progressive delay owed before a check with `prior_attempts` recent
    /// failures may proceed.
    pub fn delay_for(&self, prior_attempts: u32) -> Duration {
        if prior_attempts == 0 || self.progressive_delay_base == 0 {
            return Duration::ZERO;
        }

        let secs = (self.progressive_delay_base as u64).saturating_pow(prior_attempts - 1);
        Duration::from_secs(secs).min(self.max_delay)
    }
}

/// Builder for [`LockoutPolicy`]
#[derive(Debug, Clone, Default)]
pub struct LockoutPolicyBuilder {
    policy: LockoutPolicy,
}

impl LockoutPolicyBuilder {
    /// Set maximum failed attempts before lockout
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    /// Set the sliding window for counting attempts
    pub fn attempt_window(mut self, window: Duration) -> Self {
        self.policy.attempt_window = window;
        self
    }

    /// Set the block duration
    pub fn block_duration(mut self, duration: Duration) -> Self {
        self.policy.block_duration = duration;
        self
    }

    /// Set the progressive delay base (0 disables the delay)
    pub fn progressive_delay_base(mut self, base: u32) -> Self {
        self.policy.progressive_delay_base = base;
        self
    }

    /// Set the cap on a single progressive delay
    pub fn max_delay(mut self, cap: Duration) -> Self {
        self.policy.max_delay = cap;
        self
    }

    /// Build the policy
    pub fn build(self) -> LockoutPolicy {
        self.policy
    }
}

// ============================================================================
// Attempt Record
// ============================================================================

/// Tracking state for a single identity.
#[derive(Debug, Clone, Default)]
pub struct AttemptRecord {
    /// Failed attempt timestamps within (roughly) the current window.
    /// Entries older than the window are pruned lazily at check time.
    pub attempts: Vec<Instant>,
    /// When set and in the future, the identity is blocked until then.
    pub blocked_until: Option<Instant>,
}

impl AttemptRecord {
    /// Drop attempts that fell out of the window as of `now`.
    fn prune(&mut self, window: Duration, now: Instant) {
        self.attempts
            .retain(|&t| now.duration_since(t) < window);
    }

    /// Remaining block time as of `now`, if any.
    fn remaining_block(&self, now: Instant) -> Option<Duration> {
        match self.blocked_until {
            Some(until) if now < until => Some(until - now),
            _ => None,
        }
    }
}

// ============================================================================
// Login Rate Limiter
// ============================================================================

/// Per-identity login attempt limiter with progressive delay and lockout.
///
/// `Clone` shares the underlying records; hand clones to each place that
/// participates in the login path.
pub struct LoginRateLimiter {
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
    records: Arc<RwLock<HashMap<String, AttemptRecord>>>,
}

impl fmt::Debug for LoginRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRateLimiter")
            .field("policy", &self.policy)
            .finish()
    }
}

impl Clone for LoginRateLimiter {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            clock: Arc::clone(&self.clock),
            records: Arc::clone(&self.records),
        }
    }
}

impl LoginRateLimiter {
    /// Create a limiter with the given policy and the system clock.
    pub fn new(policy: LockoutPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a limiter with an injected clock.
    pub fn with_clock(policy: LockoutPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Gate a login attempt for `identity`.
    ///
    /// Must be called before credential verification. On success the caller
    /// may proceed; on [`AuthError::TooManyAttempts`] the attempt must be
    /// rejected with the carried `retry_after` hint.
    ///
    /// This call suspends for the progressive delay when the identity has
    /// recent failures. No lock is held across the suspension.
    pub async fn check(&self, identity: &str) -> Result<(), AuthError> {
        // Phase 1: block bookkeeping, prune, measure the delay owed.
        // Identities with no recorded failures get no entry; only
        // record_failure creates state, so probing unknown emails cannot
        // grow the map.
        let delay = {
            let mut records = self.records.write().expect("attempt map lock poisoned");
            let now = self.clock.now();
            match records.get_mut(identity) {
                None => Duration::ZERO,
                Some(record) => {
                    if let Some(remaining) = record.remaining_block(now) {
                        crate::security_event!(
                            SecurityEvent::RateLimitExceeded,
                            identity = %identity,
                            retry_after_secs = remaining.as_secs(),
                            "Login attempt while blocked"
                        );
                        return Err(AuthError::TooManyAttempts { retry_after: remaining });
                    }

                    if record.blocked_until.take().is_some() {
                        // Block expired: full reset, not partial.
                        record.attempts.clear();
                        crate::security_event!(
                            SecurityEvent::AccountUnlocked,
                            identity = %identity,
                            "Login block expired"
                        );
                    }

                    record.prune(self.policy.attempt_window, now);
                    self.policy.delay_for(record.attempts.len() as u32)
                }
            }
        };

        // Phase 2: progressive delay, outside the lock so unrelated
        // identities are never stalled by this identity's backoff.
        if !delay.is_zero() {
            tracing::debug!(
                identity = %identity,
                delay_secs = delay.as_secs(),
                "Applying progressive login delay"
            );
            tokio::time::sleep(delay).await;
        }

        // Phase 3: commit point. Re-evaluate under the lock; state may have
        // moved while this task slept.
        {
            let mut records = self.records.write().expect("attempt map lock poisoned");
            let now = self.clock.now();
            if let Some(record) = records.get_mut(identity) {
                if let Some(remaining) = record.remaining_block(now) {
                    return Err(AuthError::TooManyAttempts { retry_after: remaining });
                }

                record.prune(self.policy.attempt_window, now);
                if record.attempts.len() as u32 >= self.policy.max_attempts {
                    record.blocked_until = Some(now + self.policy.block_duration);
                    crate::security_event!(
                        SecurityEvent::AccountLocked,
                        identity = %identity,
                        failed_attempts = record.attempts.len(),
                        block_secs = self.policy.block_duration.as_secs(),
                        "Identity blocked after repeated login failures"
                    );
                    return Err(AuthError::TooManyAttempts {
                        retry_after: self.policy.block_duration,
                    });
                }
            }
        }

        Ok(())
    }

    /// Record a failed credential verification for `identity`.
    ///
    /// Call only after a passing [`LoginRateLimiter::check`] when
    /// verification then failed.
    pub fn record_failure(&self, identity: &str) {
        let mut records = self.records.write().expect("attempt map lock poisoned");
        let now = self.clock.now();
        let record = records.entry(identity.to_string()).or_default();
        record.prune(self.policy.attempt_window, now);
        record.attempts.push(now);

        tracing::debug!(
            identity = %identity,
            recent_failures = record.attempts.len(),
            "Recorded failed login attempt"
        );
    }

    /// Record a successful authentication for `identity`.
    ///
    /// Fully resets brute-force tracking: attempt history and any block.
    pub fn record_success(&self, identity: &str) {
        let mut records = self.records.write().expect("attempt map lock poisoned");
        records.remove(identity);
    }

    /// Administrative/test reset: clear one identity, or everything.
    pub fn reset(&self, identity: Option<&str>) {
        let mut records = self.records.write().expect("attempt map lock poisoned");
        match identity {
            Some(identity) => {
                if records.remove(identity).is_some() {
                    crate::security_event!(
                        SecurityEvent::AccountUnlocked,
                        identity = %identity,
                        "Login tracking reset"
                    );
                }
            }
            None => records.clear(),
        }
    }

    /// Recent failure count for `identity` (admin/debugging).
    pub fn attempt_count(&self, identity: &str) -> u32 {
        let records = self.records.read().expect("attempt map lock poisoned");
        let now = self.clock.now();
        records
            .get(identity)
            .map(|r| {
                r.attempts
                    .iter()
                    .filter(|&&t| now.duration_since(t) < self.policy.attempt_window)
                    .count() as u32
            })
            .unwrap_or(0)
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(LockoutPolicy::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
