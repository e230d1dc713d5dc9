//! Explicit per-process registry of throttle state, shared by reference with
//! every collaborator instead of living behind a process-wide global.

// std
use std::{thread, time::Duration as StdDuration};
// crates.io
use tracing::{debug, info};
// self
use crate::{
	_prelude::*,
	id::ServiceKey,
	limit::{
		RateLimitPolicy,
		state::{RateLimitDecision, ServiceRateState},
	},
};

/// Per-service throttle registry.
///
/// One instance is constructed per process and handed by reference to every
/// scraper and integration. State is created lazily per [`ServiceKey`] and
/// lives for the process's duration; policies travel with each call, so a
/// collaborator swapping its policy mid-run takes effect immediately.
///
/// The check-then-record sequence runs under one lock per key. Both wait
/// adapters release that lock before sleeping and reacquire it to recheck, so
/// a waiting caller never blocks other keys, and abandoning a wait mid-sleep
/// leaves the state untouched.
pub struct RateLimiterRegistry {
	clock: Arc<dyn Clock>,
	states: Mutex<HashMap<ServiceKey, Arc<AsyncMutex<ServiceRateState>>>>,
}
impl RateLimiterRegistry {
	/// Creates a registry on the system clock.
	pub fn new() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}

	/// Creates a registry on an injected clock, for deterministic tests.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { clock, states: Mutex::new(HashMap::new()) }
	}

	/// Checks whether a request to `key` may proceed right now.
	///
	/// Pure observation aside from lazy pruning and a cooldown-gated burst
	/// reset; pair with [`record`](Self::record) only on call sites that
	/// already serialize their own requests; under concurrency the composed
	/// [`try_acquire`](Self::try_acquire) is the race-free form.
	pub fn can_proceed(&self, key: &ServiceKey, policy: &RateLimitPolicy) -> bool {
		let state = self.state_for(key);
		let decision = state.lock_blocking().evaluate(self.clock.now(), policy);

		matches!(decision, RateLimitDecision::Allow)
	}

	/// Records an outbound request against `key`.
	///
	/// Call immediately after the request is issued, not after its response,
	/// so in-flight requests count conservatively against the budget.
	pub fn record(&self, key: &ServiceKey) {
		let now = self.clock.now();
		let state = self.state_for(key);
		let mut guard = state.lock_blocking();

		guard.record(now);
		debug!(service = %key, in_window = guard.in_window(now), "Recorded request.");
	}

	/// Time until the current blocking reason for `key` resolves.
	///
	/// Returns [`Duration::ZERO`] when the next request may already proceed;
	/// otherwise the wait is floored to a small positive value so retry loops
	/// never spin.
	pub fn wait_time(&self, key: &ServiceKey, policy: &RateLimitPolicy) -> Duration {
		let state = self.state_for(key);

		match state.lock_blocking().evaluate(self.clock.now(), policy) {
			RateLimitDecision::Allow => Duration::ZERO,
			RateLimitDecision::Delay { retry_in, .. } => retry_in,
		}
	}

	/// Atomically checks `key` and, when allowed, records in the same
	/// critical section.
	pub fn try_acquire(&self, key: &ServiceKey, policy: &RateLimitPolicy) -> RateLimitDecision {
		let state = self.state_for(key);
		let decision = state.lock_blocking().acquire(self.clock.now(), policy);

		if matches!(decision, RateLimitDecision::Allow) {
			debug!(service = %key, "Acquired request slot.");
		}

		decision
	}

	/// Blocks the calling thread until a slot for `key` is acquired.
	///
	/// For sequential scrapers on dedicated threads. The successful check has
	/// already recorded; callers issue their request immediately after.
	pub fn wait_if_needed(&self, key: &ServiceKey, policy: &RateLimitPolicy) {
		loop {
			match self.try_acquire(key, policy) {
				RateLimitDecision::Allow => return,
				RateLimitDecision::Delay { retry_in, reason } => {
					info!(service = %key, wait = %retry_in, ?reason, "Rate limit reached; waiting.");
					thread::sleep(to_std(retry_in));
				},
			}
		}
	}

	/// Suspends the calling task until a slot for `key` is acquired.
	///
	/// The cooperative twin of [`wait_if_needed`](Self::wait_if_needed) for
	/// bounded-concurrency pipelines; only the logical task sleeps, never the
	/// worker thread. Cancellation mid-sleep is safe; nothing was recorded.
	pub async fn await_if_needed(&self, key: &ServiceKey, policy: &RateLimitPolicy) {
		loop {
			let state = self.state_for(key);
			let decision = state.lock().await.acquire(self.clock.now(), policy);

			match decision {
				RateLimitDecision::Allow => {
					debug!(service = %key, "Acquired request slot.");

					return;
				},
				RateLimitDecision::Delay { retry_in, reason } => {
					info!(service = %key, wait = %retry_in, ?reason, "Rate limit reached; waiting.");
					tokio::time::sleep(to_std(retry_in)).await;
				},
			}
		}
	}

	/// Number of requests recorded against `key` inside the trailing window.
	pub fn recorded_in_window(&self, key: &ServiceKey) -> usize {
		let state = self.state_for(key);
		let mut guard = state.lock_blocking();

		guard.in_window(self.clock.now())
	}

	fn state_for(&self, key: &ServiceKey) -> Arc<AsyncMutex<ServiceRateState>> {
		self.states
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(ServiceRateState::default())))
			.clone()
	}
}
impl Default for RateLimiterRegistry {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for RateLimiterRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiterRegistry").field("services", &self.states.lock().len()).finish()
	}
}

fn to_std(wait: Duration) -> StdDuration {
	wait.unsigned_abs()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn fixture() -> (Arc<ManualClock>, RateLimiterRegistry, ServiceKey) {
		let clock = Arc::new(ManualClock::starting_at(macros::datetime!(2025-06-01 12:00 UTC)));
		let registry = RateLimiterRegistry::with_clock(clock.clone());
		let key = ServiceKey::new("carmax").expect("Service fixture should be valid.");

		(clock, registry, key)
	}

	#[test]
	fn unseen_key_starts_fresh() {
		let (_, registry, key) = fixture();
		let policy = RateLimitPolicy::new(1, 1, Duration::seconds(1))
			.expect("Registry test policy should be valid.");

		assert!(registry.can_proceed(&key, &policy));
		assert_eq!(registry.recorded_in_window(&key), 0);
	}

	#[test]
	fn window_refills_after_sixty_one_seconds() {
		let (clock, registry, key) = fixture();
		let policy = RateLimitPolicy::new(3, 100, Duration::seconds(1))
			.expect("Registry test policy should be valid.");

		for _ in 0..3 {
			registry.record(&key);
		}

		assert!(!registry.can_proceed(&key, &policy));
		assert_eq!(registry.recorded_in_window(&key), 3);

		clock.advance(Duration::seconds(61));

		assert!(registry.can_proceed(&key, &policy));
		assert_eq!(registry.recorded_in_window(&key), 0);
	}

	#[test]
	fn policy_change_applies_immediately() {
		let (_, registry, key) = fixture();
		let tight = RateLimitPolicy::new(1, 100, Duration::seconds(1))
			.expect("Tight policy should be valid.");
		let loose = RateLimitPolicy::new(10, 100, Duration::seconds(1))
			.expect("Loose policy should be valid.");

		registry.record(&key);

		// Same key, same state; only the policy in hand differs.
		assert!(!registry.can_proceed(&key, &tight));
		assert!(registry.can_proceed(&key, &loose));
	}

	#[test]
	fn keys_are_throttled_independently() {
		let (_, registry, key) = fixture();
		let other = ServiceKey::new("manheim").expect("Service fixture should be valid.");
		let policy = RateLimitPolicy::new(1, 100, Duration::seconds(1))
			.expect("Registry test policy should be valid.");

		registry.record(&key);

		assert!(!registry.can_proceed(&key, &policy));
		assert!(registry.can_proceed(&other, &policy));
	}

	#[test]
	fn try_acquire_consumes_the_slot() {
		let (_, registry, key) = fixture();
		let policy = RateLimitPolicy::new(1, 100, Duration::seconds(1))
			.expect("Registry test policy should be valid.");

		assert_eq!(registry.try_acquire(&key, &policy), RateLimitDecision::Allow);
		assert!(matches!(registry.try_acquire(&key, &policy), RateLimitDecision::Delay { .. }));
		assert_eq!(registry.recorded_in_window(&key), 1);
	}

	#[test]
	fn wait_time_reports_zero_when_allowed() {
		let (clock, registry, key) = fixture();
		let policy = RateLimitPolicy::new(2, 100, Duration::seconds(1))
			.expect("Registry test policy should be valid.");

		assert_eq!(registry.wait_time(&key, &policy), Duration::ZERO);

		registry.record(&key);
		registry.record(&key);
		clock.advance(Duration::seconds(10));

		// Oldest entry ages out 50 s after the advance.
		assert_eq!(registry.wait_time(&key, &policy), Duration::seconds(50));
	}

	#[tokio::test]
	async fn await_if_needed_acquires_without_blocking_forever() {
		let (_, registry, key) = fixture();
		let policy = RateLimitPolicy::new(10, 10, Duration::seconds(1))
			.expect("Registry test policy should be valid.");

		registry.await_if_needed(&key, &policy).await;

		assert_eq!(registry.recorded_in_window(&key), 1);
	}
}
