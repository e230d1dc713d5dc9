//! Durable, confidential persistence of browser cookie sets with automatic
//! expiry.

// std
use std::{
	fs::{self, File},
	io::Write,
};
// crates.io
use tracing::{debug, info};
// self
use crate::{
	_prelude::*,
	error::StoreError,
	id::{PlatformId, ProfileName},
	session::{Cookie, KeyManager, SessionRecord, crypto},
};

/// Encrypted session store, one file per (profile, platform) pair.
///
/// `save` wholesale-replaces the prior record; `load` treats every read,
/// decrypt, or deserialize failure as a cache miss and an over-TTL record as
/// expired. The store decides nothing about login validity; callers replay the
/// cookies and inspect the resulting page themselves.
pub struct SessionStore {
	root: PathBuf,
	keys: KeyManager,
	clock: Arc<dyn Clock>,
}
impl SessionStore {
	/// Creates a store rooted at the profiles directory, on the system clock.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self::with_clock(root, Arc::new(SystemClock))
	}

	/// Creates a store on an injected clock, for deterministic expiry tests.
	pub fn with_clock(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
		let root = root.into();

		Self { keys: KeyManager::new(&root), root, clock }
	}

	/// Encrypts and persists the platform's cookie set for `profile`,
	/// overwriting any prior session.
	///
	/// Cookies are normalized into their replay-safe shape before touching
	/// disk. Write-side failures surface as [`Error::Storage`]; silently
	/// dropping a fresh login would strand the caller on its next visit.
	pub fn save(
		&self,
		profile: &ProfileName,
		platform: &PlatformId,
		cookies: impl IntoIterator<Item = Cookie>,
		source_url: Url,
	) -> Result<()> {
		let record =
			SessionRecord::new(cookies, self.clock.now(), source_url, platform.clone());
		let plaintext = serde_json::to_vec(&record).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize session record: {e}"),
		})?;
		let key = self.keys.acquire_profile_key(profile)?;
		let blob = crypto::seal(&key, &plaintext)?;

		self.persist(profile, platform, &blob)?;
		info!(%profile, %platform, cookies = record.cookies.len(), "Saved encrypted session.");

		Ok(())
	}

	/// Loads the platform's session for `profile`, if one exists and is
	/// within its TTL.
	///
	/// Any read, decrypt, or deserialize failure is downgraded to `None`; the
	/// caller treats that exactly like an absent session and logs in afresh.
	pub fn load(&self, profile: &ProfileName, platform: &PlatformId) -> Option<SessionRecord> {
		let path = self.session_path(profile, platform);

		if !path.exists() {
			debug!(%profile, %platform, "No saved session found.");

			return None;
		}

		let record = match self.read_record(&path, profile) {
			Ok(record) => record,
			Err(e) => {
				debug!(%profile, %platform, error = %e, "Discarding unreadable session.");

				return None;
			},
		};

		if !record.is_fresh_at(self.clock.now()) {
			info!(%profile, %platform, captured_at = %record.captured_at, "Session expired.");

			return None;
		}

		info!(%profile, %platform, cookies = record.cookies.len(), "Loaded session.");

		Some(record)
	}

	fn read_record(&self, path: &Path, profile: &ProfileName) -> Result<SessionRecord, StoreError> {
		let blob = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let key = self.keys.acquire_profile_key(profile)?;
		let plaintext = crypto::open(&key, &blob)?;
		let deserializer = &mut serde_json::Deserializer::from_slice(&plaintext);

		serde_path_to_error::deserialize(deserializer).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	// Temp file + rename so a concurrent reader never observes a torn write;
	// concurrent saves for the same pair are last-writer-wins.
	fn persist(
		&self,
		profile: &ProfileName,
		platform: &PlatformId,
		blob: &[u8],
	) -> Result<(), StoreError> {
		let path = self.session_path(profile, platform);

		super::key::ensure_parent_exists(&path)?;

		let mut tmp_path = path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(blob).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	fn session_path(&self, profile: &ProfileName, platform: &PlatformId) -> PathBuf {
		self.root.join(profile.as_ref()).join(format!("{platform}_session.enc"))
	}
}
impl Debug for SessionStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionStore").field("root", &self.root).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn temp_root() -> PathBuf {
		let unique = format!(
			"scrape_gate_sessions_{}_{}",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn fixture_cookies() -> Vec<Cookie> {
		vec![
			Cookie::new("auth_token", "tok-1", ".carmax.com", "/"),
			Cookie::new("visitor", "vis-9", ".carmax.com", "/cars"),
		]
	}

	fn cleanup(root: &Path) {
		fs::remove_dir_all(root)
			.unwrap_or_else(|e| panic!("Failed to remove {}: {e}", root.display()));
	}

	#[test]
	fn save_then_load_round_trips() {
		let root = temp_root();
		let store = SessionStore::new(&root);
		let profile = ProfileName::new("default").expect("Profile fixture should be valid.");
		let platform = PlatformId::new("carmax").expect("Platform fixture should be valid.");
		let url: Url =
			"https://www.carmax.com/mycarmax".parse().expect("Fixture URL should parse.");

		store
			.save(&profile, &platform, fixture_cookies(), url.clone())
			.expect("Saving a fresh session should succeed.");

		let record = store.load(&profile, &platform).expect("Fresh session should load.");

		assert_eq!(record.cookies, fixture_cookies());
		assert_eq!(record.source_url, url);
		assert_eq!(record.platform, platform);

		cleanup(&root);
	}

	#[test]
	fn load_for_absent_platform_is_a_miss() {
		let root = temp_root();
		let store = SessionStore::new(&root);
		let profile = ProfileName::new("default").expect("Profile fixture should be valid.");
		let platform = PlatformId::new("manheim").expect("Platform fixture should be valid.");

		assert!(store.load(&profile, &platform).is_none());
		// No directory should have been created by a pure read.
		assert!(!root.exists());
	}

	#[test]
	fn session_expires_after_twenty_four_hours() {
		let root = temp_root();
		let clock = Arc::new(ManualClock::starting_at(macros::datetime!(2025-06-01 12:00 UTC)));
		let store = SessionStore::with_clock(&root, clock.clone());
		let profile = ProfileName::new("default").expect("Profile fixture should be valid.");
		let platform = PlatformId::new("carfax").expect("Platform fixture should be valid.");
		let url: Url = "https://www.carfax.com/login".parse().expect("Fixture URL should parse.");

		store
			.save(&profile, &platform, fixture_cookies(), url)
			.expect("Saving a fresh session should succeed.");

		clock.advance(Duration::hours(23));

		assert!(store.load(&profile, &platform).is_some(), "23-hour-old session must load.");

		clock.advance(Duration::hours(2));

		assert!(store.load(&profile, &platform).is_none(), "25-hour-old session must expire.");

		cleanup(&root);
	}

	#[test]
	fn corrupted_file_is_a_miss_not_an_error() {
		let root = temp_root();
		let store = SessionStore::new(&root);
		let profile = ProfileName::new("default").expect("Profile fixture should be valid.");
		let platform = PlatformId::new("carmax").expect("Platform fixture should be valid.");
		let url: Url = "https://www.carmax.com/".parse().expect("Fixture URL should parse.");

		store
			.save(&profile, &platform, fixture_cookies(), url)
			.expect("Saving a fresh session should succeed.");

		let path = store.session_path(&profile, &platform);
		let mut blob = fs::read(&path).expect("Saved session file should be readable.");

		let mid = blob.len() / 2;
		blob[mid] ^= 0x01;
		fs::write(&path, &blob).expect("Corrupted session file should be writable.");

		assert!(store.load(&profile, &platform).is_none());

		cleanup(&root);
	}

	#[test]
	fn save_overwrites_wholesale() {
		let root = temp_root();
		let store = SessionStore::new(&root);
		let profile = ProfileName::new("default").expect("Profile fixture should be valid.");
		let platform = PlatformId::new("carmax").expect("Platform fixture should be valid.");
		let url: Url = "https://www.carmax.com/".parse().expect("Fixture URL should parse.");

		store
			.save(&profile, &platform, fixture_cookies(), url.clone())
			.expect("First save should succeed.");

		let replacement = vec![Cookie::new("auth_token", "tok-2", ".carmax.com", "/")];

		store
			.save(&profile, &platform, replacement.clone(), url)
			.expect("Second save should succeed.");

		let record = store.load(&profile, &platform).expect("Replacement session should load.");

		assert_eq!(record.cookies, replacement);

		cleanup(&root);
	}

	#[test]
	fn profiles_are_isolated() {
		let root = temp_root();
		let store = SessionStore::new(&root);
		let buyer = ProfileName::new("buyer").expect("Profile fixture should be valid.");
		let dealer = ProfileName::new("dealer").expect("Profile fixture should be valid.");
		let platform = PlatformId::new("manheim").expect("Platform fixture should be valid.");
		let url: Url = "https://www.manheim.com/".parse().expect("Fixture URL should parse.");

		store
			.save(&buyer, &platform, fixture_cookies(), url)
			.expect("Saving the buyer session should succeed.");

		assert!(store.load(&buyer, &platform).is_some());
		assert!(store.load(&dealer, &platform).is_none());

		cleanup(&root);
	}

	#[test]
	fn stored_cookies_are_normalized() {
		let root = temp_root();
		let store = SessionStore::new(&root);
		let profile = ProfileName::new("default").expect("Profile fixture should be valid.");
		let platform = PlatformId::new("cargurus").expect("Platform fixture should be valid.");
		let url: Url = "https://www.cargurus.com/".parse().expect("Fixture URL should parse.");
		let raw = vec![
			Cookie::new("sid", "v", ".cargurus.com", "/")
				.with_expiry(macros::datetime!(2026-01-01 00:00 UTC))
				.with_same_site(crate::session::SameSite::Strict),
		];

		store.save(&profile, &platform, raw, url).expect("Saving should succeed.");

		let record = store.load(&profile, &platform).expect("Session should load.");

		assert_eq!(record.cookies[0].expiry, None);
		assert_eq!(record.cookies[0].same_site, None);

		cleanup(&root);
	}
}
