//! ML-DSA-65 (FIPS 204) signatures.
//!
//! Used twice in the oracle: by the owner to attest prices, and by the
//! aggregation prover to certify proof statements. Keys are always derived
//! from seed material so deployments are reproducible.

use alloc::vec::Vec;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::traits::{Signature as SigTrait, SigningKey as SigningKeyTrait, VerifyKey};

use ml_dsa::signature::{Signer, Verifier};
use ml_dsa::{MlDsa65, B32};

/// ML-DSA-65 parameter sizes (FIPS 204)
pub const ML_DSA_PUBLIC_KEY_LEN: usize = 1952;
pub const ML_DSA_SECRET_KEY_LEN: usize = 4032;
pub const ML_DSA_SIGNATURE_LEN: usize = 3309;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MlDsaSignature {
    bytes: Vec<u8>,
}

impl MlDsaSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ML_DSA_SIGNATURE_LEN {
            return Err(CryptoError::InvalidLength {
                expected: ML_DSA_SIGNATURE_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

impl SigTrait for MlDsaSignature {
    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Verification half of an ML-DSA-65 key pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MlDsaPublicKey {
    bytes: [u8; ML_DSA_PUBLIC_KEY_LEN],
}

impl MlDsaPublicKey {
    fn to_inner(&self) -> ml_dsa::VerifyingKey<MlDsa65> {
        ml_dsa::VerifyingKey::<MlDsa65>::decode(&self.bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8; ML_DSA_PUBLIC_KEY_LEN] {
        &self.bytes
    }
}

impl VerifyKey for MlDsaPublicKey {
    type Signature = MlDsaSignature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        let sig_bytes: [u8; ML_DSA_SIGNATURE_LEN] = signature
            .bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        let sig = ml_dsa::Signature::<MlDsa65>::decode(&sig_bytes.into())
            .ok_or(CryptoError::InvalidSignature)?;

        self.to_inner()
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; ML_DSA_PUBLIC_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidLength {
                expected: ML_DSA_PUBLIC_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self { bytes: arr })
    }
}

/// Signing half of an ML-DSA-65 key pair. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MlDsaSecretKey {
    bytes: [u8; ML_DSA_SECRET_KEY_LEN],
}

impl MlDsaSecretKey {
    fn to_inner(&self) -> ml_dsa::SigningKey<MlDsa65> {
        ml_dsa::SigningKey::<MlDsa65>::from_expanded(&self.bytes.into())
    }
}

impl core::fmt::Debug for MlDsaSecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MlDsaSecretKey").finish_non_exhaustive()
    }
}

impl SigningKeyTrait for MlDsaSecretKey {
    type VerifyKey = MlDsaPublicKey;
    type Signature = MlDsaSignature;

    fn generate_deterministic(seed: &[u8]) -> Self {
        let xi = crate::deterministic::derive_seed(b"ml-dsa-65-xi", seed);
        let seed_b32: B32 = xi.into();

        let sk = ml_dsa::SigningKey::<MlDsa65>::from_seed(&seed_b32);
        let encoded = sk.to_expanded();
        let mut bytes = [0u8; ML_DSA_SECRET_KEY_LEN];
        bytes.copy_from_slice(encoded.as_ref());
        Self { bytes }
    }

    fn sign(&self, message: &[u8]) -> Self::Signature {
        let sig = self.to_inner().sign(message);
        MlDsaSignature {
            bytes: sig.encode().to_vec(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; ML_DSA_SECRET_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidLength {
                expected: ML_DSA_SECRET_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self { bytes: arr })
    }

    fn verify_key(&self) -> Self::VerifyKey {
        let vk = self.to_inner().verifying_key();
        let encoded = vk.encode();
        let mut bytes = [0u8; ML_DSA_PUBLIC_KEY_LEN];
        bytes.copy_from_slice(encoded.as_ref());
        MlDsaPublicKey { bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let signing_key = MlDsaSecretKey::generate_deterministic(b"oracle owner");
        let verify_key = signing_key.verify_key();

        let signature = signing_key.sign(b"1848770935");
        assert!(verify_key.verify(b"1848770935", &signature).is_ok());
        assert_eq!(
            verify_key.verify(b"1848770936", &signature),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn domains_do_not_cross() {
        let signing_key = MlDsaSecretKey::generate_deterministic(b"domains");
        let verify_key = signing_key.verify_key();
        let signature = signing_key.sign_in_domain(b"price", b"42");
        assert!(verify_key.verify_in_domain(b"price", b"42", &signature).is_ok());
        assert!(verify_key.verify_in_domain(b"proof", b"42", &signature).is_err());
        assert!(verify_key.verify(b"42", &signature).is_err());
    }

    #[test]
    fn keygen_is_deterministic() {
        let sk1 = MlDsaSecretKey::generate_deterministic(b"seed");
        let sk2 = MlDsaSecretKey::generate_deterministic(b"seed");
        let sk3 = MlDsaSecretKey::generate_deterministic(b"other");
        assert_eq!(sk1.verify_key(), sk2.verify_key());
        assert_ne!(sk1.verify_key(), sk3.verify_key());
    }

    #[test]
    fn key_bytes_round_trip() {
        let sk = MlDsaSecretKey::generate_deterministic(b"bytes");
        let restored = MlDsaSecretKey::from_bytes(&sk.to_bytes()).unwrap();
        assert_eq!(restored.verify_key(), sk.verify_key());
        let pk = MlDsaPublicKey::from_bytes(&sk.verify_key().to_bytes()).unwrap();
        assert_eq!(pk, sk.verify_key());
        assert_eq!(
            MlDsaPublicKey::from_bytes(&[0u8; 10]),
            Err(CryptoError::InvalidLength {
                expected: ML_DSA_PUBLIC_KEY_LEN,
                actual: 10
            })
        );
    }

    #[test]
    fn malformed_signature_is_rejected() {
        assert!(MlDsaSignature::from_bytes(&[1u8; 12]).is_err());
        let sk = MlDsaSecretKey::generate_deterministic(b"malformed");
        let bogus = MlDsaSignature::from_bytes(&[0xffu8; ML_DSA_SIGNATURE_LEN]).unwrap();
        assert!(sk.verify_key().verify(b"m", &bogus).is_err());
    }
}
