use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{TryRngCore, rngs::OsRng};
use sha2::Sha256;

use crate::error::KeyError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted length for a caller-supplied secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Process-wide HMAC-SHA256 key.
///
/// Generated once at startup and injected wherever tokens are signed. It is
/// never persisted, so every token dies with the process.
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl SigningKey {
    /// Generate a fresh key from the operating system's secure random source.
    pub fn generate() -> Result<Self, KeyError> {
        let mut secret = [0u8; MIN_SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut secret)
            .map_err(|e| KeyError::Entropy(e.to_string()))?;
        Self::from_secret(&secret)
    }

    /// Build a key from existing secret bytes.
    pub fn from_secret(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(KeyError::TooShort {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        // HMAC accepts keys of any length.
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| KeyError::TooShort {
            min: MIN_SECRET_LEN,
            actual: secret.len(),
        })?;
        Ok(Self { mac })
    }

    fn mac_over(&self, header: &str, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac
    }

    /// Sign `header.payload` and return the base64url signature segment.
    pub fn sign(&self, header: &str, payload: &str) -> String {
        let tag = self.mac_over(header, payload).finalize().into_bytes();
        URL_SAFE_NO_PAD.encode(tag)
    }

    /// Check a signature segment against `header.payload`.
    ///
    /// A segment that is not valid base64url simply fails verification. The
    /// tag comparison is constant time.
    pub fn verify(&self, header: &str, payload: &str, signature: &str) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        self.mac_over(header, payload).verify_slice(&tag).is_ok()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}
