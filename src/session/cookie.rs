//! Replay-safe cookie model and the normalization applied when cookies are
//! accepted into storage.

// self
use crate::_prelude::*;

/// SameSite policy as reported by a browser-automation driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	/// Cookie is only sent on same-site requests.
	Strict,
	/// Cookie is sent on same-site requests and top-level navigations.
	Lax,
	/// Cookie is sent on all requests.
	None,
}

/// One browser cookie captured from an authenticated session.
///
/// Drivers hand these over with whatever attributes the browser exposed;
/// [`Cookie::normalized`] canonicalizes them into the shape replay APIs
/// accept before they ever reach disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
	/// Cookie name.
	pub name: String,
	/// Cookie value; treated as a credential and never logged.
	pub value: String,
	/// Host the cookie is scoped to.
	pub domain: String,
	/// Path the cookie is scoped to.
	pub path: String,
	/// Absolute expiry reported by the browser, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expiry: Option<OffsetDateTime>,
	/// SameSite attribute reported by the browser, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
}
impl Cookie {
	/// Creates a cookie with the attributes every replay API accepts.
	pub fn new(
		name: impl Into<String>,
		value: impl Into<String>,
		domain: impl Into<String>,
		path: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: domain.into(),
			path: path.into(),
			expiry: None,
			same_site: None,
		}
	}

	/// Attaches the browser-reported expiry.
	pub fn with_expiry(mut self, instant: OffsetDateTime) -> Self {
		self.expiry = Some(instant);

		self
	}

	/// Attaches the browser-reported SameSite attribute.
	pub fn with_same_site(mut self, policy: SameSite) -> Self {
		self.same_site = Some(policy);

		self
	}

	/// Strips the attributes replay APIs reject.
	///
	/// Drivers refuse cookies carrying `expiry`/`sameSite` encodings they did
	/// not produce themselves, so both are dropped once, here, at the storage
	/// boundary. The session record's own 24-hour TTL governs freshness.
	pub fn normalized(mut self) -> Self {
		self.expiry = None;
		self.same_site = None;

		self
	}
}
