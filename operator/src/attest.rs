use crypto::ml_dsa::{MlDsaPublicKey, MlDsaSecretKey, MlDsaSignature};
use crypto::traits::{SigningKey, VerifyKey};
use oracle_protocol::{price_attestation_message, PRICE_ATTESTATION_DOMAIN};

use crate::config::OperatorConfig;
use crate::error::OperatorResult;

/// Owner-side signer for price attestations.
pub struct PriceSigner {
    secret: MlDsaSecretKey,
    public: MlDsaPublicKey,
}

impl PriceSigner {
    pub fn from_seed(seed: &[u8]) -> Self {
        let secret = MlDsaSecretKey::generate_deterministic(seed);
        let public = secret.verify_key();
        Self { secret, public }
    }

    pub fn from_config(config: &OperatorConfig) -> Self {
        Self::from_seed(&config.owner_seed)
    }

    pub fn public_key(&self) -> &MlDsaPublicKey {
        &self.public
    }

    /// Bytes to place in the oracle pallet's genesis `owner_public_key`.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_bytes()
    }

    pub fn attest(&self, price: u64) -> MlDsaSignature {
        self.secret
            .sign_in_domain(PRICE_ATTESTATION_DOMAIN, &price_attestation_message(price))
    }

    pub fn check(&self, price: u64, signature: &[u8]) -> OperatorResult<()> {
        let signature = MlDsaSignature::from_bytes(signature)?;
        self.public.verify_in_domain(
            PRICE_ATTESTATION_DOMAIN,
            &price_attestation_message(price),
            &signature,
        )?;
        Ok(())
    }
}

impl core::fmt::Debug for PriceSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PriceSigner")
            .field("public", &hex::encode(&self.public.as_bytes()[..8]))
            .finish_non_exhaustive()
    }
}
