//! # tollgate-mint
//!
//! The minting authority for the Tollgate access gateway.
//!
//! This crate provides functionality for:
//! - Minting LSATs that bind a macaroon to a Lightning payment challenge
//! - Verifying presented credentials: signature chain, payment preimage,
//!   revocation state and services caveats
//! - Managing per-credential root secrets behind the [`SecretStore`] trait,
//!   with in-memory and deterministic (derived) implementations
//! - Stretching user-supplied seeds into root key material
//!
//! ## Two modes of secret generation
//!
//! | Mode | Secret | Revocable | Store round-trip |
//! |------|--------|-----------|------------------|
//! | **Stateful** | fresh random, persisted | yes, by deleting it | yes |
//! | **Deterministic** | `HMAC(key, sha256(token_id))` | no (external denylist) | no |
//!
//! The mode is fixed at mint construction: configuring
//! `key_for_pseudo_randomness` switches the mint to the derived store for
//! its lifetime.

pub mod error;
pub mod mint;
pub mod secrets;
pub mod stretch;

pub use error::MintError;
pub use mint::{Challenge, Challenger, Mint, MintConfig, ServiceLimiter, VerificationParams};
pub use secrets::{
    DerivedSecretStore, MemorySecretStore, SECRET_SIZE, Secret, SecretId, SecretStore,
};
pub use stretch::{KEY_SIZE, MIN_USER_SEED_LENGTH, stretch_key};
