//! Arena of proofs forming one aggregation chain.

use alloc::vec::Vec;

use crate::batch::{AggregationState, PriceBatch};
use crate::circuit::AggregationProgram;
use crate::proof::{verify_aggregation_proof, AggregationProof};
use crate::AggregationError;

/// Index of a proof inside an [`AggregationChain`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProofId(pub usize);

/// Every proof of one chain, oldest first. Proof `i + 1` certifies proof `i`.
#[derive(Clone, Debug)]
pub struct AggregationChain<const N: usize> {
    program: AggregationProgram<N>,
    proofs: Vec<AggregationProof>,
}

impl<const N: usize> AggregationChain<N> {
    pub fn new(program: AggregationProgram<N>) -> Self {
        Self {
            program,
            proofs: Vec::new(),
        }
    }

    pub fn program(&self) -> &AggregationProgram<N> {
        &self.program
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    pub fn get(&self, id: ProofId) -> Option<&AggregationProof> {
        self.proofs.get(id.0)
    }

    pub fn latest(&self) -> Option<&AggregationProof> {
        self.proofs.last()
    }

    pub fn state(&self) -> Option<AggregationState> {
        self.latest().map(|proof| proof.public_output)
    }

    /// Prove one more batch: base case on an empty chain, step otherwise.
    pub fn extend(&mut self, batch: &PriceBatch<N>) -> Result<ProofId, AggregationError> {
        let (proof, _) = match self.proofs.last() {
            None => self.program.base(batch)?,
            Some(head) => self.program.step(batch, head)?,
        };
        Ok(self.push_unchecked(proof))
    }

    /// Append a proof produced elsewhere (e.g. on a worker thread) if it
    /// verifies and directly extends the current head.
    pub fn append(&mut self, proof: AggregationProof) -> Result<ProofId, AggregationError> {
        verify_aggregation_proof(&proof, self.program.verification_key())?;
        let extends_head = match self.proofs.last() {
            None => proof.is_base(),
            Some(head) => {
                proof.previous == head.statement_digest()
                    && Some(proof.chain_length) == head.chain_length.checked_add(1)
            }
        };
        if !extends_head {
            return Err(AggregationError::NotChainHead);
        }
        Ok(self.push_unchecked(proof))
    }

    /// Verify the head. Equivalent to replaying the chain.
    pub fn verify_latest(&self) -> Result<AggregationState, AggregationError> {
        let head = self.latest().ok_or(AggregationError::InconsistentOutput)?;
        verify_aggregation_proof(head, self.program.verification_key())
    }

    fn push_unchecked(&mut self, proof: AggregationProof) -> ProofId {
        self.proofs.push(proof);
        ProofId(self.proofs.len() - 1)
    }
}
