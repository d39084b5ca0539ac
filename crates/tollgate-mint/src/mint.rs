//! The mint: the entity that issues and verifies LSAT credentials.

use crate::error::MintError;
use crate::secrets::{DerivedSecretStore, SecretStore, hmac_sha256};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tollgate_lsat::{
    HASH_SIZE, Identifier, Macaroon, Service, TOKEN_ID_SIZE, services_caveat, verify_caveats,
};
use tracing::debug;

/// Domain separator for deterministic token id derivation.
const TOKEN_ID_CONTEXT: &[u8] = b"tollgate-token-id";

/// A payment challenge the payer completes out of band. The invoice is
/// opaque to the mint; only the payment hash is bound into the credential.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub payment_hash: [u8; HASH_SIZE],
    pub invoice: String,
}

/// Produces fresh payment challenges. Implemented by the Lightning invoice
/// subsystem in production.
#[async_trait]
pub trait Challenger: Send + Sync {
    async fn new_challenge(&self) -> Result<Challenge, MintError>;
}

/// Maps requested services to the tier the caller is actually entitled to.
/// Implemented by the service catalog in production.
#[async_trait]
pub trait ServiceLimiter: Send + Sync {
    async fn service_capabilities(
        &self,
        services: &[Service],
    ) -> Result<Vec<Service>, MintError>;
}

/// Construction parameters for a [`Mint`].
pub struct MintConfig {
    /// Root secret storage. Ignored when `key_for_pseudo_randomness` is set.
    pub secrets: Arc<dyn SecretStore>,
    pub challenger: Arc<dyn Challenger>,
    pub service_limiter: Arc<dyn ServiceLimiter>,
    /// Location string baked into every minted credential.
    pub location: String,
    /// When set, switches the mint to deterministic mode for its lifetime:
    /// token ids and secrets become a keyed PRF of the payment hash, and no
    /// store writes happen at mint time.
    pub key_for_pseudo_randomness: Option<Vec<u8>>,
}

/// Parameters for verifying a presented credential.
pub struct VerificationParams<'a> {
    pub macaroon: &'a Macaroon,
    pub preimage: [u8; 32],
    pub target_service: &'a str,
}

/// The minting authority. Safe for unbounded concurrent use behind an `Arc`;
/// all coordination lives in the secret store backend.
pub struct Mint {
    challenger: Arc<dyn Challenger>,
    service_limiter: Arc<dyn ServiceLimiter>,
    secrets: Arc<dyn SecretStore>,
    location: String,
    derivation_key: Option<Vec<u8>>,
}

impl Mint {
    /// Build a mint from its configuration. A configured derivation key
    /// replaces the secret store with a [`DerivedSecretStore`] process-wide
    /// for this mint's lifetime.
    pub fn new(cfg: MintConfig) -> Self {
        let secrets: Arc<dyn SecretStore> = match &cfg.key_for_pseudo_randomness {
            Some(key) => Arc::new(DerivedSecretStore::new(key.clone())),
            None => Arc::clone(&cfg.secrets),
        };
        Self {
            challenger: cfg.challenger,
            service_limiter: cfg.service_limiter,
            secrets,
            location: cfg.location,
            derivation_key: cfg.key_for_pseudo_randomness,
        }
    }

    /// The secret store this mint issues and verifies against.
    pub fn secrets(&self) -> &Arc<dyn SecretStore> {
        &self.secrets
    }

    /// Generate the token id for a new credential: random in stateful mode,
    /// a keyed PRF of the payment hash in deterministic mode so that
    /// re-issuing for the same challenge yields the same credential id.
    fn new_token_id(&self, payment_hash: &[u8; HASH_SIZE]) -> [u8; TOKEN_ID_SIZE] {
        match &self.derivation_key {
            Some(key) => {
                let mut message = Vec::with_capacity(TOKEN_ID_CONTEXT.len() + HASH_SIZE);
                message.extend_from_slice(TOKEN_ID_CONTEXT);
                message.extend_from_slice(payment_hash);
                hmac_sha256(key, &message)
            }
            None => {
                use rand::RngCore;
                let mut token_id = [0u8; TOKEN_ID_SIZE];
                rand::rng().fill_bytes(&mut token_id);
                token_id
            }
        }
    }

    /// Mint a new LSAT scoped to the given services. An empty services list
    /// produces an admin credential carrying no services caveat at all.
    pub async fn mint_lsat(
        &self,
        services: &[Service],
    ) -> Result<(Macaroon, Challenge), MintError> {
        let challenge = self.challenger.new_challenge().await?;

        let token_id = self.new_token_id(&challenge.payment_hash);
        let id = Identifier::new(challenge.payment_hash, token_id);
        let secret = self.secrets.new_secret(id.secret_id()).await?;

        let mut macaroon = Macaroon::new(&secret, self.location.as_str(), &id.encode());
        if !services.is_empty() {
            let constrained = self.service_limiter.service_capabilities(services).await?;
            macaroon.add_first_party_caveat(services_caveat(&constrained));
        }

        debug!(
            token_id = %id.token_id_hex(),
            services = services.len(),
            "minted LSAT"
        );
        Ok((macaroon, challenge))
    }

    /// Verify a presented credential against a target service.
    ///
    /// Failure kinds stay distinct: identifier decode errors, a revoked or
    /// never-issued secret, signature mismatch, preimage mismatch and an
    /// unauthorized target each surface as their own [`MintError`].
    pub async fn verify_lsat(&self, params: &VerificationParams<'_>) -> Result<(), MintError> {
        let id = Identifier::decode(params.macaroon.identifier())?;

        let secret = self.secrets.get_secret(id.secret_id()).await?;
        params.macaroon.verify(&secret)?;

        let preimage_hash: [u8; 32] = Sha256::digest(params.preimage).into();
        if preimage_hash != id.payment_hash {
            return Err(MintError::PaymentMismatch);
        }

        verify_caveats(params.macaroon.caveats(), params.target_service)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;
    use tollgate_lsat::Tier;

    const TEST_PREIMAGE: [u8; 32] = [0x17; 32];

    fn test_service() -> Service {
        Service::new("lightning_loop", Tier::Base)
    }

    /// Challenger handing out the same (preimage, hash) pair every time.
    struct MockChallenger;

    #[async_trait]
    impl Challenger for MockChallenger {
        async fn new_challenge(&self) -> Result<Challenge, MintError> {
            Ok(Challenge {
                payment_hash: Sha256::digest(TEST_PREIMAGE).into(),
                invoice: "lnmock1invoice".to_string(),
            })
        }
    }

    /// Limiter granting every requested service at its requested tier.
    struct MockServiceLimiter;

    #[async_trait]
    impl ServiceLimiter for MockServiceLimiter {
        async fn service_capabilities(
            &self,
            services: &[Service],
        ) -> Result<Vec<Service>, MintError> {
            Ok(services.to_vec())
        }
    }

    fn new_mint(key: Option<Vec<u8>>) -> Mint {
        Mint::new(MintConfig {
            secrets: Arc::new(MemorySecretStore::new()),
            challenger: Arc::new(MockChallenger),
            service_limiter: Arc::new(MockServiceLimiter),
            location: "tollgate".to_string(),
            key_for_pseudo_randomness: key,
        })
    }

    #[tokio::test]
    async fn test_basic_lsat() {
        let mint = new_mint(None);
        let (macaroon, _) = mint.mint_lsat(&[test_service()]).await.unwrap();

        mint.verify_lsat(&VerificationParams {
            macaroon: &macaroon,
            preimage: TEST_PREIMAGE,
            target_service: "lightning_loop",
        })
        .await
        .unwrap();

        // The credential must not grant access to an unknown service.
        let err = mint
            .verify_lsat(&VerificationParams {
                macaroon: &macaroon,
                preimage: TEST_PREIMAGE,
                target_service: "unknown",
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not authorized"));
    }

    #[tokio::test]
    async fn test_admin_lsat() {
        let mint = new_mint(None);

        // No services requested: no caveat, access to anything.
        let (macaroon, _) = mint.mint_lsat(&[]).await.unwrap();
        for target in ["lightning_loop", "pool", "whatever"] {
            mint.verify_lsat(&VerificationParams {
                macaroon: &macaroon,
                preimage: TEST_PREIMAGE,
                target_service: target,
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_revoked_lsat() {
        let mint = new_mint(None);
        let (macaroon, _) = mint.mint_lsat(&[test_service()]).await.unwrap();

        let params = VerificationParams {
            macaroon: &macaroon,
            preimage: TEST_PREIMAGE,
            target_service: "lightning_loop",
        };
        mint.verify_lsat(&params).await.unwrap();

        let id = Identifier::decode(macaroon.identifier()).unwrap();
        mint.secrets().revoke_secret(id.secret_id()).await.unwrap();

        assert!(matches!(
            mint.verify_lsat(&params).await,
            Err(MintError::SecretNotFound)
        ));
    }

    #[tokio::test]
    async fn test_tampered_lsat() {
        let mint = new_mint(None);
        let (macaroon, _) = mint.mint_lsat(&[test_service()]).await.unwrap();

        // Flip the last serialized byte, which lands in the signature.
        let mut bytes = macaroon.serialize();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let tampered = Macaroon::deserialize(&bytes).unwrap();

        let err = mint
            .verify_lsat(&VerificationParams {
                macaroon: &tampered,
                preimage: TEST_PREIMAGE,
                target_service: "lightning_loop",
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("signature mismatch"));
    }

    #[tokio::test]
    async fn test_wrong_preimage() {
        let mint = new_mint(None);
        let (macaroon, _) = mint.mint_lsat(&[test_service()]).await.unwrap();

        let err = mint
            .verify_lsat(&VerificationParams {
                macaroon: &macaroon,
                preimage: [0u8; 32],
                target_service: "lightning_loop",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MintError::PaymentMismatch));
    }

    #[tokio::test]
    async fn test_demoted_services_lsat() {
        let mint = new_mint(None);
        let other = Service::new("unrelated", Tier::Base);

        // Authorized for both services to begin with.
        let (mut macaroon, _) = mint
            .mint_lsat(&[test_service(), other.clone()])
            .await
            .unwrap();
        for target in ["lightning_loop", "unrelated"] {
            mint.verify_lsat(&VerificationParams {
                macaroon: &macaroon,
                preimage: TEST_PREIMAGE,
                target_service: target,
            })
            .await
            .unwrap();
        }

        // Demote by appending a narrower caveat only covering the first.
        macaroon.add_first_party_caveat(services_caveat(&[test_service()]));

        mint.verify_lsat(&VerificationParams {
            macaroon: &macaroon,
            preimage: TEST_PREIMAGE,
            target_service: "lightning_loop",
        })
        .await
        .unwrap();
        let err = mint
            .verify_lsat(&VerificationParams {
                macaroon: &macaroon,
                preimage: TEST_PREIMAGE,
                target_service: "unrelated",
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not authorized"));
    }

    #[tokio::test]
    async fn test_deterministic_reissuance() {
        let key = b"could be a strong key".to_vec();
        let mint = new_mint(Some(key));

        // Same challenge, same derivation key: identical credential id, and
        // both credentials verify without any store writes.
        let (first, _) = mint.mint_lsat(&[test_service()]).await.unwrap();
        let (second, _) = mint.mint_lsat(&[test_service()]).await.unwrap();
        assert_eq!(first.identifier(), second.identifier());

        mint.verify_lsat(&VerificationParams {
            macaroon: &second,
            preimage: TEST_PREIMAGE,
            target_service: "lightning_loop",
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_deterministic_mode_key_matters() {
        let (first, _) = new_mint(Some(b"key one that is strong".to_vec()))
            .mint_lsat(&[])
            .await
            .unwrap();
        let (second, _) = new_mint(Some(b"key two that is strong".to_vec()))
            .mint_lsat(&[])
            .await
            .unwrap();
        assert_ne!(first.identifier(), second.identifier());
    }
}
