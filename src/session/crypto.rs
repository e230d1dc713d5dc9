//! ChaCha20-Poly1305 sealing for session files.
//!
//! Wire shape is `<12-byte nonce><ciphertext + tag>`; a fresh random nonce is
//! drawn per seal, so saving the same cookies twice never produces the same
//! bytes. Any flipped byte fails Poly1305 authentication on open.

// crates.io
use chacha20poly1305::{
	ChaCha20Poly1305, Key, Nonce,
	aead::{Aead, AeadCore, KeyInit, OsRng},
};
// self
use crate::error::StoreError;

/// Nonce length in bytes (96 bits).
pub(crate) const NONCE_LEN: usize = 12;
/// Key length in bytes (256 bits).
pub(crate) const KEY_LEN: usize = 32;

/// Generates a fresh 256-bit key.
pub(crate) fn generate_key() -> [u8; KEY_LEN] {
	ChaCha20Poly1305::generate_key(&mut OsRng).into()
}

/// Encrypts `plaintext`, prepending the nonce to the returned blob.
pub(crate) fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
	let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
	let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
	let ciphertext = cipher.encrypt(&nonce, plaintext).map_err(|e| StoreError::Serialization {
		message: format!("Failed to encrypt session payload: {e}"),
	})?;
	let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());

	blob.extend_from_slice(nonce.as_slice());
	blob.extend_from_slice(&ciphertext);

	Ok(blob)
}

/// Decrypts a `seal`-produced blob.
pub(crate) fn open(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Vec<u8>, StoreError> {
	if blob.len() < NONCE_LEN {
		return Err(StoreError::Serialization {
			message: format!("Session payload is truncated ({} bytes)", blob.len()),
		});
	}

	let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
	let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

	cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|e| StoreError::Serialization {
		message: format!("Failed to decrypt session payload: {e}"),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn test_key() -> [u8; KEY_LEN] {
		[0x42; KEY_LEN]
	}

	#[test]
	fn seal_open_round_trip() {
		let key = test_key();
		let blob = seal(&key, b"cookie jar").expect("Sealing should succeed.");
		let plaintext = open(&key, &blob).expect("Opening should succeed.");

		assert_eq!(plaintext, b"cookie jar");
	}

	#[test]
	fn nonces_differ_between_seals() {
		let key = test_key();
		let a = seal(&key, b"same").expect("First seal should succeed.");
		let b = seal(&key, b"same").expect("Second seal should succeed.");

		assert_ne!(a, b);
	}

	#[test]
	fn wrong_key_fails() {
		let blob = seal(&test_key(), b"secret").expect("Sealing should succeed.");

		assert!(open(&[0x43; KEY_LEN], &blob).is_err());
	}

	#[test]
	fn any_flipped_byte_fails_authentication() {
		let key = test_key();
		let blob = seal(&key, b"secret").expect("Sealing should succeed.");

		for i in 0..blob.len() {
			let mut tampered = blob.clone();

			tampered[i] ^= 0x01;

			assert!(open(&key, &tampered).is_err(), "Flipping byte {i} must fail.");
		}
	}

	#[test]
	fn truncated_blob_is_an_error_not_a_panic() {
		assert!(open(&test_key(), &[0x00; NONCE_LEN - 1]).is_err());
		assert!(open(&test_key(), &[]).is_err());
	}
}
