//! Versioned binary identifier tying a credential to its payment challenge
//! and root secret.

use crate::error::LsatError;
use sha2::{Digest, Sha256};

/// Size of a payment hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Size of a token id in bytes.
pub const TOKEN_ID_SIZE: usize = 32;

/// The newest identifier version this implementation produces.
pub const LATEST_VERSION: u8 = 0;

/// Encoded size of an identifier: `{version:1B, payment_hash:32B, token_id:32B}`.
pub const ENCODED_ID_SIZE: usize = 1 + HASH_SIZE + TOKEN_ID_SIZE;

/// The opaque payload embedded in a credential. The token id uniquely
/// determines the root secret via `sha256(token_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier {
    pub version: u8,
    pub payment_hash: [u8; HASH_SIZE],
    pub token_id: [u8; TOKEN_ID_SIZE],
}

impl Identifier {
    /// Build an identifier at the latest version.
    pub fn new(payment_hash: [u8; HASH_SIZE], token_id: [u8; TOKEN_ID_SIZE]) -> Self {
        Self {
            version: LATEST_VERSION,
            payment_hash,
            token_id,
        }
    }

    /// Encode to the stable binary layout `{version, payment_hash, token_id}`.
    pub fn encode(&self) -> [u8; ENCODED_ID_SIZE] {
        let mut buf = [0u8; ENCODED_ID_SIZE];
        buf[0] = self.version;
        buf[1..1 + HASH_SIZE].copy_from_slice(&self.payment_hash);
        buf[1 + HASH_SIZE..].copy_from_slice(&self.token_id);
        buf
    }

    /// Decode from the binary layout, rejecting unknown versions and buffers
    /// of the wrong length.
    pub fn decode(bytes: &[u8]) -> Result<Self, LsatError> {
        if bytes.len() != ENCODED_ID_SIZE {
            return Err(LsatError::Decode(format!(
                "identifier must be {ENCODED_ID_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let version = bytes[0];
        if version > LATEST_VERSION {
            return Err(LsatError::UnknownVersion(version));
        }

        let mut payment_hash = [0u8; HASH_SIZE];
        payment_hash.copy_from_slice(&bytes[1..1 + HASH_SIZE]);
        let mut token_id = [0u8; TOKEN_ID_SIZE];
        token_id.copy_from_slice(&bytes[1 + HASH_SIZE..]);

        Ok(Self {
            version,
            payment_hash,
            token_id,
        })
    }

    /// The key this credential's root secret is stored under.
    pub fn secret_id(&self) -> [u8; 32] {
        let digest = Sha256::digest(self.token_id);
        digest.into()
    }

    /// Hex rendering of the token id, for logs.
    pub fn token_id_hex(&self) -> String {
        hex::encode(self.token_id)
    }
}
