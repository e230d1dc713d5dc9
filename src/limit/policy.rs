//! Immutable per-service throttle policy supplied by each collaborator.

// self
use crate::{_prelude::*, error::ConfigError};

/// Throttle budget for one external service.
///
/// Each scraper or integration constructs one policy per service at setup
/// time and passes it by reference on every check; the policy itself never
/// changes for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
	requests_per_minute: u32,
	burst_limit: u32,
	cooldown: Duration,
}
impl RateLimitPolicy {
	/// Validates and builds a policy.
	///
	/// All three limits must be positive; a zero budget would block every
	/// request forever, which is always a configuration mistake.
	pub fn new(
		requests_per_minute: u32,
		burst_limit: u32,
		cooldown: Duration,
	) -> Result<Self, ConfigError> {
		if requests_per_minute == 0 {
			return Err(ConfigError::InvalidPolicy { field: "requests_per_minute" });
		}
		if burst_limit == 0 {
			return Err(ConfigError::InvalidPolicy { field: "burst_limit" });
		}
		if !cooldown.is_positive() {
			return Err(ConfigError::InvalidPolicy { field: "cooldown" });
		}

		Ok(Self { requests_per_minute, burst_limit, cooldown })
	}

	/// Maximum requests allowed inside the trailing 60-second window.
	pub fn requests_per_minute(&self) -> u32 {
		self.requests_per_minute
	}

	/// Maximum consecutive requests before a mandatory cooldown.
	pub fn burst_limit(&self) -> u32 {
		self.burst_limit
	}

	/// Minimum idle time required after hitting the burst limit.
	pub fn cooldown(&self) -> Duration {
		self.cooldown
	}
}
