//! Persisted session record and its 24-hour freshness lifecycle.

// self
use crate::{_prelude::*, id::PlatformId, session::Cookie};

/// Validity horizon for a persisted session.
///
/// Purely structural: a fresh record promises nothing about whether the
/// remote site still honors the cookies; callers verify that themselves after
/// replay.
pub const SESSION_TTL: Duration = Duration::hours(24);

/// Freshness of a record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
	/// Captured within the TTL; worth replaying.
	Fresh,
	/// Older than the TTL; equivalent to no session at all.
	Expired,
}

/// One authenticated cookie set captured from a browser context.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Normalized, replay-safe cookies.
	pub cookies: Vec<Cookie>,
	/// Instant the session was captured.
	pub captured_at: OffsetDateTime,
	/// Page the browser was on at capture time.
	pub source_url: Url,
	/// Platform the session authenticates against.
	pub platform: PlatformId,
}
impl SessionRecord {
	/// Builds a record, normalizing every cookie at the storage boundary.
	pub fn new(
		cookies: impl IntoIterator<Item = Cookie>,
		captured_at: OffsetDateTime,
		source_url: Url,
		platform: PlatformId,
	) -> Self {
		Self {
			cookies: cookies.into_iter().map(Cookie::normalized).collect(),
			captured_at,
			source_url,
			platform,
		}
	}

	/// Computes the freshness status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> SessionStatus {
		if instant - self.captured_at <= SESSION_TTL {
			SessionStatus::Fresh
		} else {
			SessionStatus::Expired
		}
	}

	/// Returns `true` if the record is within its TTL at the provided instant.
	pub fn is_fresh_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), SessionStatus::Fresh)
	}
}
impl Debug for SessionRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionRecord")
			.field("cookies", &format_args!("<{} redacted>", self.cookies.len()))
			.field("captured_at", &self.captured_at)
			.field("source_url", &self.source_url)
			.field("platform", &self.platform)
			.finish()
	}
}
