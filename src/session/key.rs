//! Per-profile encryption key management: one key, created on first use,
//! reused thereafter.

// std
use std::fs;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use tracing::info;
// self
use crate::{
	_prelude::*,
	error::StoreError,
	id::ProfileName,
	session::crypto::{self, KEY_LEN},
};

const KEY_FILE: &str = "session.key";

/// Scoped acquire-or-create access to each profile's symmetric key.
///
/// Keys live at `<root>/<profile>/session.key` as base64 text and are never
/// rotated; losing one only costs the profile's saved sessions, which the
/// callers can re-establish with a fresh login.
#[derive(Clone, Debug)]
pub struct KeyManager {
	root: PathBuf,
}
impl KeyManager {
	/// Creates a manager rooted at the profiles directory.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Returns the profile's key, generating and persisting one on first use.
	pub fn acquire_profile_key(&self, profile: &ProfileName) -> Result<[u8; KEY_LEN], StoreError> {
		let path = self.key_path(profile);

		if path.exists() {
			return Self::read_key(&path);
		}

		let key = crypto::generate_key();

		self.persist_key(&path, &key)?;
		info!(%profile, "Generated encryption key for profile.");

		Ok(key)
	}

	fn key_path(&self, profile: &ProfileName) -> PathBuf {
		self.root.join(profile.as_ref()).join(KEY_FILE)
	}

	fn read_key(path: &Path) -> Result<[u8; KEY_LEN], StoreError> {
		let text = fs::read_to_string(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let bytes = BASE64.decode(text.trim()).map_err(|e| StoreError::Serialization {
			message: format!("Failed to decode {}: {e}", path.display()),
		})?;

		<[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| StoreError::Serialization {
			message: format!("Key file {} holds {} bytes, expected {KEY_LEN}", path.display(), bytes.len()),
		})
	}

	fn persist_key(&self, path: &Path, key: &[u8; KEY_LEN]) -> Result<(), StoreError> {
		ensure_parent_exists(path)?;
		fs::write(path, BASE64.encode(key)).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", path.display()),
		})?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;

			fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
				StoreError::Backend {
					message: format!("Failed to restrict {}: {e}", path.display()),
				}
			})?;
		}

		Ok(())
	}
}

pub(crate) fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}
