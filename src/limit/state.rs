//! Per-service throttle state and the shared decision core both wait
//! adapters evaluate.

// std
use std::collections::VecDeque;
// self
use crate::{_prelude::*, limit::RateLimitPolicy};

/// Trailing window bounding total requests per service.
pub(crate) const RATE_WINDOW: Duration = Duration::seconds(60);
/// Floor applied to every computed wait so retry loops never spin.
pub(crate) const WAIT_FLOOR: Duration = Duration::milliseconds(250);

/// Outcome of evaluating a service's throttle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request should be delayed.
	Delay {
		/// How long the caller should wait before rechecking.
		retry_in: Duration,
		/// Which limit produced the delay.
		reason: DelayReason,
	},
}

/// Which of the two limits blocked a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayReason {
	/// The trailing 60-second window is at its request budget.
	WindowFull,
	/// The consecutive-burst limit was hit and the cooldown has not elapsed.
	CoolingDown,
}

/// Mutable throttle state for one service key.
///
/// Owned exclusively by the registry and only ever touched under that key's
/// lock. The request history is pruned lazily on access; the burst counter
/// resets only once a check observes the cooldown fully elapsed; window expiry
/// alone never decays it.
#[derive(Debug, Default)]
pub(crate) struct ServiceRateState {
	history: VecDeque<OffsetDateTime>,
	consecutive: u32,
	last_request: Option<OffsetDateTime>,
}
impl ServiceRateState {
	/// Evaluates both limits at `now`, pruning stale history first.
	pub(crate) fn evaluate(
		&mut self,
		now: OffsetDateTime,
		policy: &RateLimitPolicy,
	) -> RateLimitDecision {
		self.prune(now);

		if self.history.len() >= policy.requests_per_minute() as usize {
			return RateLimitDecision::Delay {
				retry_in: self.window_wait(now),
				reason: DelayReason::WindowFull,
			};
		}
		if self.consecutive >= policy.burst_limit() {
			if let Some(last) = self.last_request {
				let idle = now - last;

				if idle < policy.cooldown() {
					return RateLimitDecision::Delay {
						retry_in: floor(policy.cooldown() - idle),
						reason: DelayReason::CoolingDown,
					};
				}
			}

			// Cooldown observed; the burst counter may reset.
			self.consecutive = 0;
		}

		RateLimitDecision::Allow
	}

	/// Evaluates and, on [`RateLimitDecision::Allow`], records in the same
	/// step: the atomic check-then-record unit both wait adapters loop on.
	pub(crate) fn acquire(
		&mut self,
		now: OffsetDateTime,
		policy: &RateLimitPolicy,
	) -> RateLimitDecision {
		let decision = self.evaluate(now, policy);

		if matches!(decision, RateLimitDecision::Allow) {
			self.record(now);
		}

		decision
	}

	/// Appends a request at `now` and bumps the burst counter.
	pub(crate) fn record(&mut self, now: OffsetDateTime) {
		self.history.push_back(now);
		self.consecutive += 1;
		self.last_request = Some(now);
	}

	/// Number of requests still inside the trailing window at `now`.
	pub(crate) fn in_window(&mut self, now: OffsetDateTime) -> usize {
		self.prune(now);

		self.history.len()
	}

	fn prune(&mut self, now: OffsetDateTime) {
		let cutoff = now - RATE_WINDOW;

		while self.history.front().is_some_and(|&t| t <= cutoff) {
			self.history.pop_front();
		}
	}

	fn window_wait(&self, now: OffsetDateTime) -> Duration {
		match self.history.front() {
			Some(&oldest) => floor(oldest + RATE_WINDOW - now),
			None => WAIT_FLOOR,
		}
	}
}

fn floor(wait: Duration) -> Duration {
	wait.max(WAIT_FLOOR)
}
