//! Authenticated encryption of ballot content.
//!
//! Envelope layout, before base64 (standard alphabet, padded):
//!
//! ```text
//! nonce (12 bytes) ‖ ciphertext ‖ GCM tag (16 bytes)
//! ```
//!
//! The key is derived once from the configured secret with PBKDF2-HMAC-SHA256
//! over a fixed salt, so the same secret always yields the same key and
//! envelopes stay decryptable across restarts. Confidentiality rests entirely
//! on the secrecy of the configured secret.

use aes_gcm::{
  Aes256Gcm, Key, KeyInit as _, Nonce,
  aead::Aead as _,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::{Error, Result};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Fixed PBKDF2 salt. Changing it orphans every stored envelope.
pub const KDF_SALT: &[u8] = b"fixed-salt-12345";
pub const KDF_ITERATIONS: u32 = 100_000;

/// Derive the 256-bit vote key from a configured secret.
pub fn derive_key(secret: &str) -> [u8; KEY_LEN] {
  let mut key = [0u8; KEY_LEN];
  pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut key);
  key
}

/// Encrypts and decrypts ballot envelopes under one fixed key.
#[derive(Clone)]
pub struct VoteCipher {
  aead: Aes256Gcm,
}

impl std::fmt::Debug for VoteCipher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("VoteCipher").field("key", &"<redacted>").finish()
  }
}

impl VoteCipher {
  /// Build a cipher from a configured secret (runs the KDF once).
  pub fn from_secret(secret: &str) -> Self { Self::from_key(derive_key(secret)) }

  /// Build a cipher from raw key material.
  pub fn from_key(key: [u8; KEY_LEN]) -> Self {
    Self { aead: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)) }
  }

  /// Encrypt `plaintext` under a fresh random nonce and return the base64
  /// envelope.
  pub fn encrypt(&self, plaintext: &str) -> Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = self
      .aead
      .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
      .map_err(|_| Error::Encrypt)?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(B64.encode(combined))
  }

  /// Authenticate and decrypt an envelope produced by [`encrypt`](Self::encrypt).
  pub fn decrypt(&self, envelope: &str) -> Result<String> {
    let combined = B64.decode(envelope.trim()).map_err(|_| Error::Tamper)?;
    if combined.len() < NONCE_LEN + TAG_LEN {
      return Err(Error::Tamper);
    }

    let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
    let plaintext = self
      .aead
      .decrypt(Nonce::from_slice(nonce), ciphertext)
      .map_err(|_| Error::Tamper)?;

    String::from_utf8(plaintext).map_err(|_| Error::Tamper)
  }
}

/// Hex SHA-256 of an envelope; handed back to the voter as a receipt.
pub fn receipt(envelope: &str) -> String { hex::encode(Sha256::digest(envelope.as_bytes())) }
