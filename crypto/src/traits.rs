use alloc::vec::Vec;
use crate::error::CryptoError;

pub trait Signature: Sized + Clone {
    fn as_bytes(&self) -> &[u8];
    fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

pub trait SigningKey: Sized {
    type VerifyKey: VerifyKey<Signature = Self::Signature>;
    type Signature: Signature;

    fn generate_deterministic(seed: &[u8]) -> Self;
    fn sign(&self, message: &[u8]) -> Self::Signature;
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError>;
    fn verify_key(&self) -> Self::VerifyKey;

    /// Sign `message` under a domain tag so signatures for one purpose can
    /// never be replayed as signatures for another.
    fn sign_in_domain(&self, domain: &[u8], message: &[u8]) -> Self::Signature {
        self.sign(&domain_message(domain, message))
    }
}

pub trait VerifyKey: Sized + Clone {
    type Signature: Signature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError>;
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError>;

    fn verify_in_domain(
        &self,
        domain: &[u8],
        message: &[u8],
        signature: &Self::Signature,
    ) -> Result<(), CryptoError> {
        self.verify(&domain_message(domain, message), signature)
    }
}

/// Length-prefixed `domain || message` framing used by the domain helpers.
pub fn domain_message(domain: &[u8], message: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(4 + domain.len() + message.len());
    framed.extend_from_slice(&(domain.len() as u32).to_le_bytes());
    framed.extend_from_slice(domain);
    framed.extend_from_slice(message);
    framed
}
