//! Error types for the LSAT credential model.

use thiserror::Error;

/// Errors that can occur while decoding, attenuating or verifying an LSAT.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LsatError {
    /// Malformed identifier, caveat or credential bytes.
    #[error("failed to decode credential: {0}")]
    Decode(String),

    /// The identifier carries a version this implementation does not know.
    /// Unknown versions are rejected outright, never guessed at.
    #[error("unknown identifier version {0}")]
    UnknownVersion(u8),

    /// The recomputed HMAC chain does not match the credential's signature.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The target service is not covered by every services caveat present.
    #[error("not authorized for service {0}")]
    NotAuthorized(String),

    /// A first-party caveat with a condition the verifier does not support.
    #[error("unsupported caveat condition {0}")]
    UnsupportedCaveat(String),
}
