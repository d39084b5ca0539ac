//! # tollgate-lsat
//!
//! The LSAT credential model for the Tollgate access gateway.
//!
//! This crate provides functionality for:
//! - Encoding and decoding the versioned binary identifier that ties a
//!   credential to its payment challenge and root secret
//! - Building, attenuating and verifying HMAC-chained macaroons
//! - Encoding services caveats and evaluating them against a target service
//!
//! ## Credential model
//!
//! An LSAT is a macaroon whose opaque identifier is the binary encoding
//! `{version:1B, payment_hash:32B, token_id:32B}`. The root secret that
//! signs the chain is looked up by `sha256(token_id)`. First-party caveats
//! are append-only: anyone holding the credential bytes can add one, and a
//! target service is authorized only if it appears in **every** services
//! caveat present. A credential with no services caveat at all is an admin
//! credential, authorized for any service.

pub mod caveat;
pub mod error;
pub mod identifier;
pub mod macaroon;

pub use caveat::{
    Caveat, SERVICES_CONDITION, Service, Tier, decode_services_caveat, services_caveat,
    verify_caveats,
};
pub use error::LsatError;
pub use identifier::{ENCODED_ID_SIZE, HASH_SIZE, Identifier, LATEST_VERSION, TOKEN_ID_SIZE};
pub use macaroon::{Macaroon, SIG_SIZE};
