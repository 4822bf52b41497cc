use alloc::string::String;
use alloc::vec::Vec;

use crypto::hashes::{tagged_hash, Commitment, ZERO_COMMITMENT};
use crypto::ml_dsa::MlDsaSignature;
use crypto::traits::VerifyKey;
use serde::{Deserialize, Serialize};

use crate::batch::{AggregationState, BASE_AVERAGE};
use crate::keys::VerificationKey;
use crate::AggregationError;

/// Upper bound on an encoded proof.
pub const MAX_PROOF_BYTES: usize = 4096;

pub(crate) const CERTIFICATE_DOMAIN: &[u8] = b"oracle-aggregation-proof-v1";
const STATEMENT_TAG: &[u8] = b"oracle-aggregation-statement";

/// Certified statement that a chain of `chain_length` batches folds to
/// `public_output`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationProof {
    pub circuit: Commitment,
    pub batch_size: u32,
    pub public_output: AggregationState,
    /// Hash chain over the digests of every batch consumed so far.
    pub batch_commitment: Commitment,
    /// Statement digest of the predecessor; zero for the base case.
    pub previous: Commitment,
    pub chain_length: u64,
    pub certificate: Vec<u8>,
}

impl AggregationProof {
    /// Digest of everything the certificate covers.
    pub fn statement_digest(&self) -> Commitment {
        tagged_hash(
            STATEMENT_TAG,
            &[
                &self.circuit,
                &self.batch_size.to_le_bytes(),
                &self.public_output.running_average.to_le_bytes(),
                &self.public_output.total_count.to_le_bytes(),
                &self.batch_commitment,
                &self.previous,
                &self.chain_length.to_le_bytes(),
            ],
        )
    }

    pub fn is_base(&self) -> bool {
        self.chain_length == 1
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AggregationError> {
        postcard::to_allocvec(self).map_err(|_| AggregationError::SerializeFailed)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AggregationError> {
        if bytes.len() > MAX_PROOF_BYTES {
            return Err(AggregationError::ProofTooLarge(bytes.len()));
        }
        postcard::from_bytes(bytes).map_err(|_| AggregationError::DeserializeFailed)
    }

    pub fn to_hex(&self) -> Result<String, AggregationError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    pub fn from_hex(encoded: &str) -> Result<Self, AggregationError> {
        let bytes = hex::decode(encoded.trim()).map_err(|_| AggregationError::DeserializeFailed)?;
        Self::from_bytes(&bytes)
    }
}

/// Check `proof` against `vk` and return its public output.
///
/// Cost does not depend on the chain length: only the newest statement and
/// its certificate are inspected.
pub fn verify_aggregation_proof(
    proof: &AggregationProof,
    vk: &VerificationKey,
) -> Result<AggregationState, AggregationError> {
    if proof.circuit != vk.circuit || proof.batch_size != vk.batch_size {
        return Err(AggregationError::CircuitMismatch);
    }

    let expected_count = proof
        .chain_length
        .checked_mul(vk.batch_size as u64)
        .ok_or(AggregationError::InconsistentOutput)?;
    if proof.chain_length == 0 || proof.public_output.total_count != expected_count {
        return Err(AggregationError::InconsistentOutput);
    }
    if proof.is_base()
        && (proof.public_output.running_average != BASE_AVERAGE
            || proof.previous != ZERO_COMMITMENT)
    {
        return Err(AggregationError::InconsistentOutput);
    }

    let key = vk.certificate_key()?;
    let signature =
        MlDsaSignature::from_bytes(&proof.certificate).map_err(|_| AggregationError::InvalidCertificate)?;
    key.verify_in_domain(CERTIFICATE_DOMAIN, &proof.statement_digest(), &signature)
        .map_err(|_| AggregationError::InvalidCertificate)?;

    log::debug!(
        target: "aggregation",
        "verified aggregation proof: batch_size={} length={} average={}",
        proof.batch_size,
        proof.chain_length,
        proof.public_output.running_average
    );
    Ok(proof.public_output)
}
