//! Progressive lockout after repeated failed logins.
//!
//! Two states per identity: unlocked, or locked-until(T). A lock reverts to
//! unlocked purely by the clock passing T, checked lazily on each attempt.
//! The counter read-modify-write is not atomic across concurrent attempts;
//! under a concurrent attack the count may drift slightly, which only shifts
//! lockout timing, never the allow/deny decision once locked.

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Debug)]
pub(crate) struct LockoutPolicy {
    threshold: i32,
    lock_duration: Duration,
}

/// Counter/lock update to persist after a failed password check.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FailureUpdate {
    Counted {
        attempts: i32,
    },
    Locked {
        attempts: i32,
        locked_until: DateTime<Utc>,
    },
}

impl LockoutPolicy {
    pub(crate) fn new(threshold: i32, lock_duration_seconds: i64) -> Self {
        Self {
            threshold,
            lock_duration: Duration::seconds(lock_duration_seconds),
        }
    }

    /// Decide the counter/lock update for one failed attempt.
    pub(crate) fn on_failure(
        &self,
        attempts: i32,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> FailureUpdate {
        // An expired lock starts a fresh window: counter back to 1, lock cleared.
        if let Some(until) = locked_until
            && until <= now
        {
            return FailureUpdate::Counted { attempts: 1 };
        }

        let attempts = attempts.saturating_add(1);
        if attempts >= self.threshold && locked_until.is_none() {
            FailureUpdate::Locked {
                attempts,
                locked_until: now + self.lock_duration,
            }
        } else {
            FailureUpdate::Counted { attempts }
        }
    }

}

pub(crate) fn is_locked(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    locked_until.is_some_and(|until| until > now)
}

/// Minutes until the lock expires, rounded up.
pub(crate) fn remaining_minutes(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (locked_until - now).num_seconds().max(0);
    (seconds as u64).div_ceil(60) as i64
}
