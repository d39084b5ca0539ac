//! Root secret lifecycle: creation, lookup and revocation.
//!
//! Secrets are keyed by `sha256(token_id)` and owned exclusively by the
//! store. Revocation deletes the secret, which immediately invalidates every
//! credential signed with it; no per-credential bookkeeping exists or is
//! needed. The deterministic variant derives secrets as a keyed PRF of the
//! id instead of persisting them, which removes the store as a single point
//! of failure at the cost of revocability.

use crate::error::MintError;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

type HmacSha256 = Hmac<Sha256>;

/// Size in bytes of a credential's root secret.
pub const SECRET_SIZE: usize = 32;

/// A credential's root signing secret.
pub type Secret = [u8; SECRET_SIZE];

/// Storage key for a secret: `sha256(token_id)`.
pub type SecretId = [u8; 32];

/// Keyed PRF used for deterministic derivation.
pub(crate) fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// Lifecycle operations on per-credential root secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create and persist a fresh random secret for `id` if none exists.
    /// Creation for an id that already holds a secret is idempotent and
    /// returns the stored value, so a retried mint after a lost write-ack
    /// never invalidates a credential already in circulation.
    async fn new_secret(&self, id: SecretId) -> Result<Secret, MintError>;

    /// Return the secret for `id`, or [`MintError::SecretNotFound`] if it
    /// was never issued or has been revoked.
    async fn get_secret(&self, id: SecretId) -> Result<Secret, MintError>;

    /// Durably delete the secret for `id`. Every subsequent `get_secret`
    /// for the same id observes [`MintError::SecretNotFound`].
    async fn revoke_secret(&self, id: SecretId) -> Result<(), MintError>;
}

/// In-memory secret store for tests and non-clustered deployments.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<SecretId, Secret>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn new_secret(&self, id: SecretId) -> Result<Secret, MintError> {
        let mut secrets = self
            .secrets
            .write()
            .map_err(|e| MintError::Backend(format!("failed to acquire write lock: {e}")))?;
        match secrets.entry(id) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                let mut secret = [0u8; SECRET_SIZE];
                rand::rng().fill_bytes(&mut secret);
                slot.insert(secret);
                Ok(secret)
            }
        }
    }

    async fn get_secret(&self, id: SecretId) -> Result<Secret, MintError> {
        let secrets = self
            .secrets
            .read()
            .map_err(|e| MintError::Backend(format!("failed to acquire read lock: {e}")))?;
        secrets.get(&id).copied().ok_or(MintError::SecretNotFound)
    }

    async fn revoke_secret(&self, id: SecretId) -> Result<(), MintError> {
        let mut secrets = self
            .secrets
            .write()
            .map_err(|e| MintError::Backend(format!("failed to acquire write lock: {e}")))?;
        secrets.remove(&id);
        tracing::debug!(id = %hex::encode(id), "revoked secret");
        Ok(())
    }
}

/// Deterministic secret store: `secret = HMAC(derivation_key, id)`.
///
/// Derivation is pure, so neither creation nor lookup touches any backend
/// and a "new" secret for a previously seen id is always the same value.
/// Revocation is refused; deployments in this mode need an external
/// denylist if they want it.
pub struct DerivedSecretStore {
    derivation_key: Vec<u8>,
}

impl DerivedSecretStore {
    pub fn new(derivation_key: impl Into<Vec<u8>>) -> Self {
        Self {
            derivation_key: derivation_key.into(),
        }
    }

    fn derive(&self, id: &SecretId) -> Secret {
        hmac_sha256(&self.derivation_key, id)
    }
}

#[async_trait]
impl SecretStore for DerivedSecretStore {
    async fn new_secret(&self, id: SecretId) -> Result<Secret, MintError> {
        Ok(self.derive(&id))
    }

    async fn get_secret(&self, id: SecretId) -> Result<Secret, MintError> {
        Ok(self.derive(&id))
    }

    async fn revoke_secret(&self, _id: SecretId) -> Result<(), MintError> {
        Err(MintError::DerivedNotRevocable)
    }
}
