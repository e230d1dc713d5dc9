//! Shared throttling-and-session layer for multi-source vehicle data
//! collection: per-service adaptive rate limiting plus encrypted, TTL-bounded
//! persistence of authenticated browser cookie sets.
//!
//! Scrapers and history-report integrations call [`limit::RateLimiterRegistry`]
//! before every outbound request, and bracket their browser-driven logins with
//! [`session::SessionStore`] so repeat visits replay cookies instead of
//! re-triggering interactive logins and anti-automation defenses.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod clock;
pub mod error;
pub mod id;
pub mod limit;
pub mod session;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		path::{Path, PathBuf},
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::{
		clock::{Clock, SystemClock},
		error::{Error, Result},
	};
}

pub use url;
