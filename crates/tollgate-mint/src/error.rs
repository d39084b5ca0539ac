//! Error types for the mint and its secret stores.

use thiserror::Error;
use tollgate_lsat::LsatError;

/// Errors that can occur while minting or verifying an LSAT, or while
/// operating on its root secret. Every kind stays distinguishable to the
/// caller; nothing is folded into a generic auth failure.
#[derive(Debug, Error)]
pub enum MintError {
    /// No secret exists for the identifier: never issued, or revoked.
    /// Surfaced verbatim through verification so revocation is observable.
    #[error("no secret found for the given identifier")]
    SecretNotFound,

    /// The stretch seed is below the minimum length. Short seeds cannot
    /// carry enough entropy regardless of stretching.
    #[error("seed is below the minimum length for key stretching")]
    InvalidSeed,

    /// Key stretching itself failed (bad parameters, not a bad seed).
    #[error("key stretching failed: {0}")]
    Stretch(String),

    /// The presented preimage does not hash to the credential's payment hash.
    #[error("invalid preimage for the credential payment hash")]
    PaymentMismatch,

    /// Revocation was requested on a deterministically derived secret.
    /// Derived secrets are denylisted externally, never deleted here.
    #[error("derived secrets cannot be revoked")]
    DerivedNotRevocable,

    /// Transient secret-store backend failure. Caller-retryable, and never
    /// conflated with [`MintError::SecretNotFound`].
    #[error("secret store backend failure: {0}")]
    Backend(String),

    /// The payment challenger failed to produce a challenge.
    #[error("payment challenger failure: {0}")]
    Challenger(String),

    /// The service limiter failed to resolve capabilities.
    #[error("service limiter failure: {0}")]
    Limiter(String),

    /// Credential-level failure: decode error, signature mismatch or an
    /// unauthorized target service.
    #[error(transparent)]
    Lsat(#[from] LsatError),
}
