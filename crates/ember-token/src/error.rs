//! Error types for token verification.

use thiserror::Error;

/// Errors produced while verifying an access token.
///
/// # Security Notes
///
/// Callers must never surface these variants to recipients. All three map
/// to the same generic not-found response at the API boundary so that a
/// probing client cannot distinguish a forged token from a superseded one.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The token is structurally invalid: wrong prefix, bad encoding,
    /// truncated payload, or an unknown version byte.
    #[error("malformed token")]
    Malformed,

    /// The payload decodes but its MAC does not verify under the codec
    /// key. Indicates tampering or an outright forgery.
    #[error("token signature mismatch")]
    SignatureMismatch,

    /// The token is authentic but was minted for a superseded generation
    /// of the artifact (its embedded secret no longer matches).
    #[error("stale token from a superseded artifact")]
    Stale,
}
