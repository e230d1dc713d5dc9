//! Injectable time source shared by the rate limiter and session store.

// self
use crate::_prelude::*;

/// Time source abstraction so throttling decisions and session TTLs can be
/// driven deterministically in tests.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Production clock backed by the system UTC time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
	instant: Mutex<OffsetDateTime>,
}
impl ManualClock {
	/// Creates a clock pinned to the provided instant.
	pub fn starting_at(instant: OffsetDateTime) -> Self {
		Self { instant: Mutex::new(instant) }
	}

	/// Moves the clock forward by the provided duration.
	pub fn advance(&self, delta: Duration) {
		*self.instant.lock() += delta;
	}

	/// Pins the clock to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.instant.lock() = instant;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.instant.lock()
	}
}
