//! # Ember Token Codec
//!
//! Mints and verifies the opaque access tokens that gate disposable
//! catalog artifacts ("menus"). A token is self-contained: malformed or
//! forged input is rejected without any storage lookup. What a token can
//! never prove on its own is *current authorization*: the artifact it
//! names may have been burned or locked since minting, so every access
//! still consults the lifecycle controller.
//!
//! ## Token layout
//!
//! ```text
//! mnu_ base64url( version | artifact_id | issued_at | secret | mac )
//!                    1B         16B          8B         16B     32B
//! ```
//!
//! The MAC is a keyed BLAKE3 hash over the payload under the codec key.
//! The embedded per-artifact secret is how superseded tokens die: a
//! regenerated artifact carries a fresh secret, so tokens minted for the
//! previous generation fail [`TokenCodec::ensure_current`] with
//! [`TokenError::Stale`] without the codec key ever rotating.
//!
//! ## Usage
//!
//! ```rust
//! use ember_token::{CodecKey, TokenCodec, TokenSecret};
//! use uuid::Uuid;
//!
//! let codec = TokenCodec::new(CodecKey::generate());
//! let secret = TokenSecret::generate();
//! let artifact_id = Uuid::new_v4();
//!
//! let token = codec.mint(artifact_id, &secret);
//! let claims = codec.verify(token.as_str()).unwrap();
//! assert_eq!(claims.artifact_id, artifact_id);
//! codec.ensure_current(&claims, &secret).unwrap();
//! ```

mod codec;
mod error;
mod keys;

pub use codec::{AccessToken, TokenClaims, TokenCodec, TOKEN_PREFIX};
pub use error::TokenError;
pub use keys::{CodecKey, TokenSecret};

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, TokenError>;
