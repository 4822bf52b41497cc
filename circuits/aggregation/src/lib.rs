//! Recursive running-average aggregation over fixed-size price batches.
//!
//! A chain starts with [`AggregationProgram::base`] and grows one batch at a
//! time with [`AggregationProgram::step`]. Every step checks its predecessor
//! before extending it, so [`verify_aggregation_proof`] on the newest proof
//! vouches for the whole chain at constant cost.
//!
//! Proofs are certified statements: the program's proving key signs the
//! statement digest with ML-DSA-65 once the transition checks pass, and the
//! verification key carries the matching public key. Two batch sizes run side
//! by side with distinct keys, see [`AggregationProgram20`] and
//! [`AggregationProgram100`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod batch;
pub mod chain;
pub mod circuit;
pub mod keys;
pub mod proof;

pub use batch::{AggregationState, PriceBatch, PriceBatch100, PriceBatch20, BASE_AVERAGE};
pub use chain::{AggregationChain, ProofId};
pub use circuit::{AggregationProgram, AggregationProgram100, AggregationProgram20};
pub use keys::{circuit_digest, ProvingKey, VerificationKey};
pub use proof::{verify_aggregation_proof, AggregationProof, MAX_PROOF_BYTES};

#[cfg(feature = "std")]
use thiserror::Error;

/// Small batch size.
pub const BATCH_SIZE_20: usize = 20;
/// Large batch size.
pub const BATCH_SIZE_100: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum AggregationError {
    #[cfg_attr(
        feature = "std",
        error("batch count {actual} does not match circuit batch size {expected}")
    )]
    BatchSizeMismatch { expected: u64, actual: u64 },
    #[cfg_attr(feature = "std", error("proof was produced by a different circuit"))]
    CircuitMismatch,
    #[cfg_attr(feature = "std", error("proof public output is inconsistent with its chain"))]
    InconsistentOutput,
    #[cfg_attr(feature = "std", error("proof certificate is invalid"))]
    InvalidCertificate,
    #[cfg_attr(feature = "std", error("previous proof rejected"))]
    PreviousProofRejected,
    #[cfg_attr(feature = "std", error("proof does not extend the chain head"))]
    NotChainHead,
    #[cfg_attr(feature = "std", error("running sum overflow"))]
    Overflow,
    #[cfg_attr(feature = "std", error("proof of {0} bytes exceeds the size limit"))]
    ProofTooLarge(usize),
    #[cfg_attr(feature = "std", error("proof encoding failed"))]
    SerializeFailed,
    #[cfg_attr(feature = "std", error("proof decoding failed"))]
    DeserializeFailed,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for AggregationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AggregationError::BatchSizeMismatch { expected, actual } => write!(
                f,
                "batch count {} does not match circuit batch size {}",
                actual, expected
            ),
            AggregationError::CircuitMismatch => {
                write!(f, "proof was produced by a different circuit")
            }
            AggregationError::InconsistentOutput => {
                write!(f, "proof public output is inconsistent with its chain")
            }
            AggregationError::InvalidCertificate => write!(f, "proof certificate is invalid"),
            AggregationError::PreviousProofRejected => write!(f, "previous proof rejected"),
            AggregationError::NotChainHead => write!(f, "proof does not extend the chain head"),
            AggregationError::Overflow => write!(f, "running sum overflow"),
            AggregationError::ProofTooLarge(len) => {
                write!(f, "proof of {} bytes exceeds the size limit", len)
            }
            AggregationError::SerializeFailed => write!(f, "proof encoding failed"),
            AggregationError::DeserializeFailed => write!(f, "proof decoding failed"),
        }
    }
}
