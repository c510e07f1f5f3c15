//! Token minting and verification.
//!
//! ## Threat Model
//!
//! The codec defends the access boundary against:
//!
//! - **Forgery**: tokens are MAC'd with a keyed BLAKE3 hash; without the
//!   codec key an attacker cannot produce a verifying token.
//! - **Tampering**: any bit flip in the payload invalidates the MAC.
//! - **Replay across generations**: the embedded per-artifact secret is
//!   checked against the artifact's current secret, so tokens minted
//!   before a regeneration are rejected as stale.
//!
//! What the codec deliberately does NOT decide is whether the artifact is
//! currently serviceable. A verified token proves origin; the lifecycle
//! controller re-reads artifact state on every request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::TokenError;
use crate::keys::{CodecKey, TokenSecret, TOKEN_SECRET_SIZE};
use crate::Result;

/// Printable prefix on every minted token.
///
/// The prefix makes tokens greppable in logs and lets the codec reject
/// arbitrary strings before attempting to decode them.
pub const TOKEN_PREFIX: &str = "mnu_";

/// Current wire version of the token payload.
const TOKEN_VERSION: u8 = 1;

/// Payload layout: version (1) + artifact id (16) + issued_at (8) + secret (16).
const PAYLOAD_LEN: usize = 1 + 16 + 8 + TOKEN_SECRET_SIZE;

/// MAC width (BLAKE3 output).
const MAC_LEN: usize = 32;

/// A minted, opaque access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// The token as a shareable string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verified contents of a token.
///
/// Claims prove that the codec key signed this payload. They say nothing
/// about the artifact's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// The artifact this token was minted for.
    pub artifact_id: Uuid,
    /// Mint time, unix milliseconds.
    pub issued_at: u64,
    /// The per-artifact secret embedded at mint time.
    pub secret: TokenSecret,
}

/// Mints and verifies access tokens under a single codec key.
///
/// # Example
///
/// ```rust
/// use ember_token::{CodecKey, TokenCodec, TokenSecret};
/// use uuid::Uuid;
///
/// let codec = TokenCodec::new(CodecKey::generate());
/// let token = codec.mint(Uuid::new_v4(), &TokenSecret::generate());
/// assert!(token.as_str().starts_with("mnu_"));
/// ```
pub struct TokenCodec {
    key: CodecKey,
}

impl TokenCodec {
    /// Creates a codec over the given key.
    #[must_use]
    pub const fn new(key: CodecKey) -> Self {
        Self { key }
    }

    /// Mints a token for an artifact, stamped with the current time.
    #[must_use]
    pub fn mint(&self, artifact_id: Uuid, secret: &TokenSecret) -> AccessToken {
        self.mint_at(artifact_id, secret, unix_millis_now())
    }

    /// Mints a token with an explicit issue timestamp.
    ///
    /// Exists so tests and replays can pin `issued_at`; production paths
    /// use [`mint`](Self::mint).
    #[must_use]
    pub fn mint_at(&self, artifact_id: Uuid, secret: &TokenSecret, issued_at: u64) -> AccessToken {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = TOKEN_VERSION;
        payload[1..17].copy_from_slice(artifact_id.as_bytes());
        payload[17..25].copy_from_slice(&issued_at.to_be_bytes());
        payload[25..].copy_from_slice(secret.as_bytes());

        let mac = blake3::keyed_hash(self.key.as_bytes(), &payload);

        let mut raw = Vec::with_capacity(PAYLOAD_LEN + MAC_LEN);
        raw.extend_from_slice(&payload);
        raw.extend_from_slice(mac.as_bytes());

        AccessToken(format!("{}{}", TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(raw)))
    }

    /// Verifies a token string and returns its claims.
    ///
    /// Fully self-contained: no storage lookup is needed to reject bad
    /// input. Verification of artifact *validity* (not burned, not
    /// expired, not locked) is the lifecycle controller's job.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Malformed`] for structural problems
    /// - [`TokenError::SignatureMismatch`] when the MAC fails
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let encoded = token.strip_prefix(TOKEN_PREFIX).ok_or(TokenError::Malformed)?;
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| TokenError::Malformed)?;

        if raw.len() != PAYLOAD_LEN + MAC_LEN {
            return Err(TokenError::Malformed);
        }
        let (payload, tag) = raw.split_at(PAYLOAD_LEN);
        if payload[0] != TOKEN_VERSION {
            return Err(TokenError::Malformed);
        }

        // blake3::Hash equality is constant-time, so the tag comparison
        // does not leak how many MAC bytes matched.
        let expected = blake3::keyed_hash(self.key.as_bytes(), payload);
        let mut tag_bytes = [0u8; MAC_LEN];
        tag_bytes.copy_from_slice(tag);
        if expected != blake3::Hash::from_bytes(tag_bytes) {
            return Err(TokenError::SignatureMismatch);
        }

        let mut id_bytes = [0u8; 16];
        id_bytes.copy_from_slice(&payload[1..17]);
        let mut ts_bytes = [0u8; 8];
        ts_bytes.copy_from_slice(&payload[17..25]);
        let mut secret_bytes = [0u8; TOKEN_SECRET_SIZE];
        secret_bytes.copy_from_slice(&payload[25..]);

        Ok(TokenClaims {
            artifact_id: Uuid::from_bytes(id_bytes),
            issued_at: u64::from_be_bytes(ts_bytes),
            secret: TokenSecret::from_bytes(secret_bytes),
        })
    }

    /// Checks that verified claims belong to the artifact's current
    /// generation.
    ///
    /// # Errors
    ///
    /// [`TokenError::Stale`] when the embedded secret differs from the
    /// artifact's current secret (a regeneration or manual rotation has
    /// superseded this token).
    pub fn ensure_current(&self, claims: &TokenClaims, current: &TokenSecret) -> Result<()> {
        if claims.secret == *current {
            Ok(())
        } else {
            Err(TokenError::Stale)
        }
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

/// Milliseconds since the unix epoch.
fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
