use alloc::vec::Vec;

use codec::{Decode, DecodeWithMemTracking, Encode};
use crypto::deterministic::derive_seed;
use crypto::hashes::{tagged_hash, Commitment};
use crypto::ml_dsa::{MlDsaPublicKey, MlDsaSecretKey};
use crypto::traits::{SigningKey, VerifyKey};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::AggregationError;

const CIRCUIT_NAME: &[u8] = b"oracle-running-average";
const CIRCUIT_VERSION: u16 = 1;
const CIRCUIT_TAG: &[u8] = b"oracle-aggregation-circuit";
const SETUP_TAG: &[u8] = b"oracle-aggregation-setup";

/// Identity of the aggregation circuit for one batch size.
pub fn circuit_digest(batch_size: usize) -> Commitment {
    tagged_hash(
        CIRCUIT_TAG,
        &[
            CIRCUIT_NAME,
            &CIRCUIT_VERSION.to_le_bytes(),
            &(batch_size as u64).to_le_bytes(),
        ],
    )
}

/// Public key material a verifier needs for one batch size.
#[derive(
    Clone, Debug, PartialEq, Eq, Encode, Decode, DecodeWithMemTracking, TypeInfo, Serialize, Deserialize,
)]
pub struct VerificationKey {
    pub circuit: Commitment,
    pub batch_size: u32,
    pub public_key: Vec<u8>,
}

impl VerificationKey {
    pub(crate) fn certificate_key(&self) -> Result<MlDsaPublicKey, AggregationError> {
        MlDsaPublicKey::from_bytes(&self.public_key).map_err(|_| AggregationError::InvalidCertificate)
    }
}

/// Secret half of the setup; whoever holds it can produce proofs.
#[derive(Clone)]
pub struct ProvingKey<const N: usize> {
    pub(crate) signing_key: MlDsaSecretKey,
    pub(crate) verification_key: VerificationKey,
}

impl<const N: usize> ProvingKey<N> {
    /// Derive the key pair for batch size `N` from `setup_seed`.
    pub fn setup(setup_seed: &[u8]) -> Self {
        let circuit = circuit_digest(N);
        let mut material = Vec::with_capacity(setup_seed.len() + circuit.len());
        material.extend_from_slice(setup_seed);
        material.extend_from_slice(&circuit);
        let signing_key = MlDsaSecretKey::generate_deterministic(&derive_seed(SETUP_TAG, &material));
        let verification_key = VerificationKey {
            circuit,
            batch_size: N as u32,
            public_key: signing_key.verify_key().to_bytes(),
        };
        Self {
            signing_key,
            verification_key,
        }
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }
}

impl<const N: usize> core::fmt::Debug for ProvingKey<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProvingKey")
            .field("batch_size", &N)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_sizes_get_distinct_keys() {
        let small = ProvingKey::<20>::setup(b"setup");
        let large = ProvingKey::<100>::setup(b"setup");
        assert_ne!(small.verification_key().circuit, large.verification_key().circuit);
        assert_ne!(small.verification_key().public_key, large.verification_key().public_key);
        assert_eq!(small.verification_key().batch_size, 20);
    }

    #[test]
    fn setup_is_reproducible() {
        let a = ProvingKey::<20>::setup(b"setup");
        let b = ProvingKey::<20>::setup(b"setup");
        assert_eq!(a.verification_key(), b.verification_key());
        assert_ne!(
            ProvingKey::<20>::setup(b"other").verification_key(),
            a.verification_key()
        );
    }
}
