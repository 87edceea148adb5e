//! Request throttling for the public and admin surfaces.
//!
//! Counters live behind the [`CounterStore`] trait so single-instance
//! deployments can use the in-memory map while multi-instance ones can plug
//! in an external keyed store. Callers only ever see [`Decision`]; the
//! backing map is never exposed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Time source injected everywhere an instant is observed, so tests can pin
/// submission times and window boundaries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed-window budget: at most `max_requests` per `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked { retry_after_secs: u64 },
}

impl Decision {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Backing store for windowed counters.
pub trait CounterStore: Send + Sync {
    /// Consume one unit for `key` and return the count after the attempt.
    /// The slot lapses at `expires_at`.
    fn acquire(&self, key: &str, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> u32;
}

/// Map-backed counter store for single-instance deployments.
#[derive(Default)]
pub struct InMemoryCounterStore {
    slots: Mutex<HashMap<String, (u32, DateTime<Utc>)>>,
}

const PRUNE_THRESHOLD: usize = 1_024;

impl CounterStore for InMemoryCounterStore {
    fn acquire(&self, key: &str, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> u32 {
        let mut slots = self.slots.lock().expect("counter mutex poisoned");
        if slots.len() >= PRUNE_THRESHOLD {
            slots.retain(|_, (_, lapse)| *lapse > now);
        }
        let entry = slots.entry(key.to_string()).or_insert((0, expires_at));
        entry.0 += 1;
        entry.0
    }
}

/// Windowed limiter keyed by caller identity (typically a peer IP).
pub struct RateLimiter {
    scope: &'static str,
    policy: WindowPolicy,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(
        scope: &'static str,
        policy: WindowPolicy,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scope,
            policy,
            store,
            clock,
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        let now = self.clock.now();
        let window = self.policy.window_secs.max(1) as i64;
        let slot = now.timestamp().div_euclid(window);
        let slot_key = format!("{}:{key}:{slot}", self.scope);
        let window_end = (slot + 1) * window;
        let expires_at = DateTime::<Utc>::from_timestamp(window_end, 0).unwrap_or(now);

        let count = self.store.acquire(&slot_key, now, expires_at);
        if count > self.policy.max_requests {
            Decision::Blocked {
                retry_after_secs: (window_end - now.timestamp()).max(1) as u64,
            }
        } else {
            Decision::Allowed
        }
    }
}

const SHORT_BLOCK_FAILURES: u32 = 3;
const LONG_BLOCK_FAILURES: u32 = 5;
const SHORT_BLOCK_MINS: i64 = 5;
const LONG_BLOCK_MINS: i64 = 15;

#[derive(Debug, Default, Clone, Copy)]
struct FailureState {
    failures: u32,
    blocked_until: Option<DateTime<Utc>>,
}

/// Escalating block for repeated failed logins: three failures earn a five
/// minute block, five failures fifteen minutes. A successful login resets
/// the ledger.
pub struct LoginThrottle {
    clock: Arc<dyn Clock>,
    state: Mutex<HashMap<String, FailureState>>,
}

impl LoginThrottle {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("throttle mutex poisoned");
        match state.get(key).and_then(|entry| entry.blocked_until) {
            Some(until) if until > now => Decision::Blocked {
                retry_after_secs: (until - now).num_seconds().max(1) as u64,
            },
            Some(_) => {
                state.remove(key);
                Decision::Allowed
            }
            None => Decision::Allowed,
        }
    }

    pub fn record_failure(&self, key: &str) {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("throttle mutex poisoned");
        let entry = state.entry(key.to_string()).or_default();
        entry.failures += 1;
        if entry.failures >= LONG_BLOCK_FAILURES {
            entry.blocked_until = Some(now + Duration::minutes(LONG_BLOCK_MINS));
        } else if entry.failures >= SHORT_BLOCK_FAILURES {
            entry.blocked_until = Some(now + Duration::minutes(SHORT_BLOCK_MINS));
        }
    }

    pub fn reset(&self, key: &str) {
        self.state
            .lock()
            .expect("throttle mutex poisoned")
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct ManualClock {
        now: StdMutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn at(now: DateTime<Utc>) -> Self {
            Self {
                now: StdMutex::new(now),
            }
        }

        fn advance(&self, delta: Duration) {
            let mut now = self.now.lock().expect("clock mutex poisoned");
            *now += delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().expect("clock mutex poisoned")
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_717_236_000, 0).expect("valid instant")
    }

    fn limiter(clock: Arc<ManualClock>, max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(
            "test",
            WindowPolicy {
                max_requests,
                window_secs,
            },
            Arc::new(InMemoryCounterStore::default()),
            clock,
        )
    }

    #[test]
    fn allows_up_to_budget_then_blocks() {
        let clock = Arc::new(ManualClock::at(epoch()));
        let limiter = limiter(clock, 3, 60);

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1").is_allowed());
        }
        match limiter.check("10.0.0.1") {
            Decision::Blocked { retry_after_secs } => assert!(retry_after_secs <= 60),
            Decision::Allowed => panic!("expected block after budget spent"),
        }
    }

    #[test]
    fn budgets_are_per_key() {
        let clock = Arc::new(ManualClock::at(epoch()));
        let limiter = limiter(clock, 1, 60);

        assert!(limiter.check("10.0.0.1").is_allowed());
        assert!(limiter.check("10.0.0.2").is_allowed());
        assert!(!limiter.check("10.0.0.1").is_allowed());
    }

    #[test]
    fn window_rollover_resets_budget() {
        let clock = Arc::new(ManualClock::at(epoch()));
        let limiter = limiter(clock.clone(), 1, 60);

        assert!(limiter.check("10.0.0.1").is_allowed());
        assert!(!limiter.check("10.0.0.1").is_allowed());

        clock.advance(Duration::seconds(61));
        assert!(limiter.check("10.0.0.1").is_allowed());
    }

    #[test]
    fn login_throttle_escalates_then_expires() {
        let clock = Arc::new(ManualClock::at(epoch()));
        let throttle = LoginThrottle::new(clock.clone());

        throttle.record_failure("attacker");
        throttle.record_failure("attacker");
        assert!(throttle.check("attacker").is_allowed());

        throttle.record_failure("attacker");
        match throttle.check("attacker") {
            Decision::Blocked { retry_after_secs } => {
                assert!(retry_after_secs <= SHORT_BLOCK_MINS as u64 * 60);
            }
            Decision::Allowed => panic!("expected short block after three failures"),
        }

        clock.advance(Duration::minutes(SHORT_BLOCK_MINS + 1));
        assert!(throttle.check("attacker").is_allowed());
    }

    #[test]
    fn login_throttle_long_block_after_five_failures() {
        let clock = Arc::new(ManualClock::at(epoch()));
        let throttle = LoginThrottle::new(clock.clone());

        for _ in 0..5 {
            throttle.record_failure("attacker");
        }
        match throttle.check("attacker") {
            Decision::Blocked { retry_after_secs } => {
                assert!(retry_after_secs > SHORT_BLOCK_MINS as u64 * 60);
            }
            Decision::Allowed => panic!("expected long block after five failures"),
        }
    }

    #[test]
    fn login_throttle_reset_clears_ledger() {
        let clock = Arc::new(ManualClock::at(epoch()));
        let throttle = LoginThrottle::new(clock);

        for _ in 0..3 {
            throttle.record_failure("operator");
        }
        throttle.reset("operator");
        assert!(throttle.check("operator").is_allowed());
    }
}
