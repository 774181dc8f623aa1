//! Field encryption for the local store
//!
//! AES-256-GCM with a fresh 96-bit nonce per write. Ciphertext is stored as
//! `v{version}:{nonce_b64}:{ciphertext_b64}` so a later key rotation can tell
//! envelopes apart.

use crate::config::SecretString;
use crate::domain::{DecryptionError, FieldSyncError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const KEY_VERSION: u32 = 1;
const NONCE_LEN: usize = 12;

/// Symmetric cipher for the sensitive part of a record
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Creates a cipher from a raw 32-byte key
    pub fn new(key: [u8; 32]) -> Self {
        let mut key = key;
        let cipher = Aes256Gcm::new(&key.into());
        key.zeroize();
        Self { cipher }
    }

    /// Creates a cipher from the configured key material
    ///
    /// Base64 that decodes to exactly 32 bytes is used as-is; anything else
    /// is treated as a passphrase and hashed with SHA-256.
    pub fn from_secret(secret: &SecretString) -> Result<Self> {
        let material = secret.expose_secret();
        if material.is_empty() {
            return Err(FieldSyncError::Configuration(
                "encryption key cannot be empty".to_string(),
            ));
        }

        let mut key = [0u8; 32];
        match BASE64.decode(material.as_bytes()) {
            Ok(mut bytes) if bytes.len() == 32 => {
                key.copy_from_slice(&bytes);
                bytes.zeroize();
            }
            Ok(mut bytes) => {
                bytes.zeroize();
                key.copy_from_slice(&Sha256::digest(material.as_bytes()));
            }
            Err(_) => key.copy_from_slice(&Sha256::digest(material.as_bytes())),
        }

        Ok(Self::new(key))
    }

    /// Generates a random key, base64 encoded, suitable for `store.encryption_key`
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        let encoded = BASE64.encode(key);
        key.zeroize();
        encoded
    }

    /// Encrypts raw bytes into a versioned envelope
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| FieldSyncError::Store("field encryption failed".to_string()))?;

        Ok(format!(
            "v{}:{}:{}",
            KEY_VERSION,
            BASE64.encode(nonce_bytes),
            BASE64.encode(ciphertext)
        ))
    }

    /// Decrypts an envelope produced by [`FieldCipher::encrypt`]
    ///
    /// `context` names what is being decrypted and ends up in the error.
    pub fn decrypt(&self, envelope: &str, context: &str) -> Result<Vec<u8>> {
        let fail = |reason: &str| FieldSyncError::from(DecryptionError::new(context, reason));

        let mut parts = envelope.splitn(3, ':');
        let (version, nonce_b64, ct_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(v), Some(n), Some(c)) => (v, n, c),
            _ => return Err(fail("malformed envelope")),
        };

        let version = version
            .strip_prefix('v')
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| fail("malformed key version"))?;
        if version != KEY_VERSION {
            return Err(fail(&format!("unsupported key version {version}")));
        }

        let nonce_bytes = BASE64
            .decode(nonce_b64)
            .map_err(|_| fail("nonce is not valid base64"))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(fail("nonce has the wrong length"));
        }
        let ciphertext = BASE64
            .decode(ct_b64)
            .map_err(|_| fail("ciphertext is not valid base64"))?;

        self.cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| fail("authentication failed (corrupted data or wrong key)"))
    }

    /// Serializes a value to JSON and encrypts it as one blob
    pub fn seal<T: Serialize>(&self, value: &T) -> Result<String> {
        let mut json = serde_json::to_vec(value)?;
        let sealed = self.encrypt(&json);
        json.zeroize();
        sealed
    }

    /// Decrypts and deserializes a blob produced by [`FieldCipher::seal`]
    pub fn open<T: DeserializeOwned>(&self, envelope: &str, context: &str) -> Result<T> {
        let mut plaintext = self.decrypt(envelope, context)?;
        let value = serde_json::from_slice(&plaintext).map_err(|e| {
            FieldSyncError::from(DecryptionError::new(
                context,
                format!("decrypted payload is not valid: {e}"),
            ))
        });
        plaintext.zeroize();
        value
    }
}
