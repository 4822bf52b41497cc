//! Settlement proofs for the oracle's off-chain price map.
//!
//! A settlement folds a batch of compare-and-swap intents into one root
//! transition. The proof records, for every intent, the value its key held
//! when the intent was reached plus a witness for that value under the
//! running root. Verifying replays those witnesses, so the verifier needs
//! nothing but the root it already trusts.
//!
//! An intent whose `from` does not match is not applied. It stays in the
//! proof marked [`StepOutcome::Rejected`] and the batch carries on.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod prover;
pub mod verifier;

use alloc::vec::Vec;

use crypto::hashes::Commitment;
use oracle_protocol::UpdateIntent;
use serde::{Deserialize, Serialize};
use state_merkle::MapWitness;

#[cfg(feature = "std")]
use thiserror::Error;

pub use constants::{MAX_INTENTS, MAX_PROOF_BYTES};
pub use prover::prove_settlement;
pub use verifier::{verify_settlement_proof, verify_settlement_proof_bytes};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Applied,
    Rejected,
}

/// One intent and the evidence for how it was resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementStep {
    pub intent: UpdateIntent,
    /// Value held by `intent.key` just before this step.
    pub observed: Option<u64>,
    pub witness: MapWitness,
    pub outcome: StepOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementProof {
    pub start_root: Commitment,
    pub end_root: Commitment,
    pub intents_commitment: Commitment,
    pub steps: Vec<SettlementStep>,
}

impl SettlementProof {
    pub fn intents(&self) -> impl Iterator<Item = &UpdateIntent> {
        self.steps.iter().map(|step| &step.intent)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SettlementError> {
        postcard::to_allocvec(self).map_err(|_| SettlementError::SerializeFailed)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SettlementError> {
        if bytes.len() > MAX_PROOF_BYTES {
            return Err(SettlementError::ProofTooLarge(bytes.len()));
        }
        postcard::from_bytes(bytes).map_err(|_| SettlementError::DeserializeFailed)
    }
}

/// What a verified settlement did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementSummary {
    pub start_root: Commitment,
    pub end_root: Commitment,
    pub intents_commitment: Commitment,
    pub intent_count: usize,
    pub applied: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum SettlementError {
    #[cfg_attr(feature = "std", error("settlement has no intents"))]
    EmptyBatch,
    #[cfg_attr(feature = "std", error("settlement has {actual} intents, limit is {max}"))]
    TooManyIntents { max: usize, actual: usize },
    #[cfg_attr(feature = "std", error("settlement starts from a stale root"))]
    StaleRoot,
    #[cfg_attr(feature = "std", error("witness for step {0} does not match the running root"))]
    WitnessMismatch(usize),
    #[cfg_attr(feature = "std", error("outcome of step {0} contradicts its observed value"))]
    OutcomeMismatch(usize),
    #[cfg_attr(feature = "std", error("settlement end root does not match the replay"))]
    EndRootMismatch,
    #[cfg_attr(feature = "std", error("intents commitment does not match the steps"))]
    CommitmentMismatch,
    #[cfg_attr(feature = "std", error("settlement proof of {0} bytes exceeds the size limit"))]
    ProofTooLarge(usize),
    #[cfg_attr(feature = "std", error("settlement proof encoding failed"))]
    SerializeFailed,
    #[cfg_attr(feature = "std", error("settlement proof decoding failed"))]
    DeserializeFailed,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for SettlementError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "settlement has no intents"),
            Self::TooManyIntents { max, actual } => {
                write!(f, "settlement has {} intents, limit is {}", actual, max)
            }
            Self::StaleRoot => write!(f, "settlement starts from a stale root"),
            Self::WitnessMismatch(i) => {
                write!(f, "witness for step {} does not match the running root", i)
            }
            Self::OutcomeMismatch(i) => {
                write!(f, "outcome of step {} contradicts its observed value", i)
            }
            Self::EndRootMismatch => write!(f, "settlement end root does not match the replay"),
            Self::CommitmentMismatch => write!(f, "intents commitment does not match the steps"),
            Self::ProofTooLarge(len) => {
                write!(f, "settlement proof of {} bytes exceeds the size limit", len)
            }
            Self::SerializeFailed => write!(f, "settlement proof encoding failed"),
            Self::DeserializeFailed => write!(f, "settlement proof decoding failed"),
        }
    }
}
