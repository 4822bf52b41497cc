use crypto::hashes::ZERO_COMMITMENT;
use crypto::traits::SigningKey;

use crate::batch::{extend_batch_commitment, AggregationState, PriceBatch};
use crate::keys::{ProvingKey, VerificationKey};
use crate::proof::{verify_aggregation_proof, AggregationProof, CERTIFICATE_DOMAIN};
use crate::AggregationError;

/// Running-average circuit for batches of exactly `N` prices.
#[derive(Clone, Debug)]
pub struct AggregationProgram<const N: usize> {
    proving_key: ProvingKey<N>,
}

pub type AggregationProgram20 = AggregationProgram<20>;
pub type AggregationProgram100 = AggregationProgram<100>;

impl<const N: usize> AggregationProgram<N> {
    /// Derive the program's keys from a setup seed.
    pub fn compile(setup_seed: &[u8]) -> Self {
        Self {
            proving_key: ProvingKey::setup(setup_seed),
        }
    }

    pub fn verification_key(&self) -> &VerificationKey {
        self.proving_key.verification_key()
    }

    /// First link of a chain. Records that `N` prices were consumed and
    /// reports [`crate::BASE_AVERAGE`] as the running average.
    pub fn base(
        &self,
        batch: &PriceBatch<N>,
    ) -> Result<(AggregationProof, AggregationState), AggregationError> {
        batch.validate()?;
        let state = AggregationState::base(N as u64);
        let batch_commitment = extend_batch_commitment(&ZERO_COMMITMENT, &batch.digest());
        let proof = self.certify(state, batch_commitment, ZERO_COMMITMENT, 1);
        Ok((proof, state))
    }

    /// Extend the chain ending in `previous` by one batch.
    pub fn step(
        &self,
        batch: &PriceBatch<N>,
        previous: &AggregationProof,
    ) -> Result<(AggregationProof, AggregationState), AggregationError> {
        batch.validate()?;
        let prior = verify_aggregation_proof(previous, self.verification_key()).map_err(|err| {
            log::warn!(target: "aggregation", "step rejected previous proof: {:?}", err);
            AggregationError::PreviousProofRejected
        })?;
        let state = prior.fold(batch.sum(), N as u64)?;
        let batch_commitment = extend_batch_commitment(&previous.batch_commitment, &batch.digest());
        let chain_length = previous
            .chain_length
            .checked_add(1)
            .ok_or(AggregationError::Overflow)?;
        let proof = self.certify(
            state,
            batch_commitment,
            previous.statement_digest(),
            chain_length,
        );
        Ok((proof, state))
    }

    fn certify(
        &self,
        public_output: AggregationState,
        batch_commitment: [u8; 32],
        previous: [u8; 32],
        chain_length: u64,
    ) -> AggregationProof {
        let vk = self.verification_key();
        let mut proof = AggregationProof {
            circuit: vk.circuit,
            batch_size: vk.batch_size,
            public_output,
            batch_commitment,
            previous,
            chain_length,
            certificate: alloc::vec::Vec::new(),
        };
        let signature = self
            .proving_key
            .signing_key
            .sign_in_domain(CERTIFICATE_DOMAIN, &proof.statement_digest());
        proof.certificate = signature.to_bytes();
        proof
    }
}
