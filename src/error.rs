//! Crate-level error types shared across the rate limiter and session store.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem, fatal to the caller's setup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Storage-layer failure; escapes only from session writes.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
}

/// Configuration and validation failures surfaced at construction time.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// A rate-limit policy field was zero or otherwise non-positive.
	#[error("Rate-limit policy field `{field}` must be positive.")]
	InvalidPolicy {
		/// Name of the offending policy field.
		field: &'static str,
	},
}

/// Error type produced by the session persistence layer.
///
/// Read-path instances never escape [`SessionStore::load`](crate::session::SessionStore::load);
/// they are logged and downgraded to a cache miss.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Serialization or encryption failure while preparing a record.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Filesystem-level failure underneath the store.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
