//! # tollgate-store-pg
//!
//! Postgres-backed [`SecretStore`] for clustered Tollgate deployments.
//!
//! The backing table gives the three guarantees the secret store contract
//! requires: atomic create-if-absent (`INSERT ... ON CONFLICT DO NOTHING`
//! against the primary key), read-after-write consistency, and durable
//! deletes. Transient connection or query failures surface as
//! [`MintError::Backend`], never as [`MintError::SecretNotFound`], so
//! callers can tell a revoked credential from an unreachable store.

use async_trait::async_trait;
use rand::RngCore;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tollgate_mint::{MintError, SECRET_SIZE, Secret, SecretId, SecretStore};
use tracing::debug;

const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS lsat_secrets (
    id     BYTEA PRIMARY KEY,
    secret BYTEA NOT NULL
)";

/// Secret store backed by a Postgres table keyed on the identifier hash.
pub struct PostgresSecretStore {
    pool: PgPool,
}

impl PostgresSecretStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database and ensure the secrets table exists.
    pub async fn connect(url: &str) -> Result<Self, MintError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
            .map_err(backend)?;
        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Create the secrets table if it does not exist yet.
    pub async fn init(&self) -> Result<(), MintError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for PostgresSecretStore {
    async fn new_secret(&self, id: SecretId) -> Result<Secret, MintError> {
        let mut secret = [0u8; SECRET_SIZE];
        rand::rng().fill_bytes(&mut secret);

        // The conditional insert either wins the race or loses to an earlier
        // writer; the follow-up read returns whichever value the table holds,
        // which makes re-creation idempotent for an already-issued id.
        sqlx::query("INSERT INTO lsat_secrets (id, secret) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(&id[..])
            .bind(&secret[..])
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        self.get_secret(id).await
    }

    async fn get_secret(&self, id: SecretId) -> Result<Secret, MintError> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT secret FROM lsat_secrets WHERE id = $1")
                .bind(&id[..])
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        match row {
            Some((bytes,)) => Secret::try_from(bytes.as_slice())
                .map_err(|_| MintError::Backend("stored secret has invalid length".into())),
            None => Err(MintError::SecretNotFound),
        }
    }

    async fn revoke_secret(&self, id: SecretId) -> Result<(), MintError> {
        sqlx::query("DELETE FROM lsat_secrets WHERE id = $1")
            .bind(&id[..])
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        debug!(id = %hex::encode(id), "revoked secret");
        Ok(())
    }
}

fn backend(err: sqlx::Error) -> MintError {
    MintError::Backend(err.to_string())
}
