//! Key material for the token codec.

use serde::{Deserialize, Serialize};

/// Size of the codec key in bytes (BLAKE3 keyed-hash key width).
pub const CODEC_KEY_SIZE: usize = 32;

/// Size of the per-artifact token secret in bytes.
pub const TOKEN_SECRET_SIZE: usize = 16;

/// The codec-wide MAC key.
///
/// One key signs every token the engine mints. Individual artifacts are
/// invalidated through their per-artifact [`TokenSecret`], never by
/// rotating this key, so a single burn does not orphan every outstanding
/// token in the system.
#[derive(Clone)]
pub struct CodecKey([u8; CODEC_KEY_SIZE]);

impl CodecKey {
    /// Generates a random codec key.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Builds a key from raw bytes (e.g. loaded from a secret store).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CODEC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CODEC_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for CodecKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("CodecKey").finish_non_exhaustive()
    }
}

/// Per-artifact secret embedded in every token minted for that artifact.
///
/// Regeneration installs a fresh secret on the successor artifact, which
/// is what makes tokens from the superseded generation verifiably stale.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret([u8; TOKEN_SECRET_SIZE]);

impl TokenSecret {
    /// Generates a random secret.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Builds a secret from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; TOKEN_SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw secret bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TOKEN_SECRET_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecret").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_unique() {
        assert_ne!(CodecKey::generate().as_bytes(), CodecKey::generate().as_bytes());
        assert_ne!(TokenSecret::generate(), TokenSecret::generate());
    }

    #[test]
    fn test_debug_does_not_leak_material() {
        let key = CodecKey::from_bytes([0xAB; CODEC_KEY_SIZE]);
        let secret = TokenSecret::from_bytes([0xCD; TOKEN_SECRET_SIZE]);
        assert!(!format!("{:?}", key).contains("171"));
        assert!(!format!("{:?}", secret).contains("205"));
    }

    #[test]
    fn test_secret_round_trips_through_serde() {
        let secret = TokenSecret::generate();
        let json = serde_json::to_string(&secret).unwrap();
        let parsed: TokenSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(secret, parsed);
    }
}
