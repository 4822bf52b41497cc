//! On-chain gateway for running-average aggregation proofs.
//!
//! Each supported batch size has its own verification key, fixed at genesis.
//! A proof that verifies has its public output recorded and announced; a
//! proof that does not leaves storage untouched.

#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

use aggregation_circuit::{AggregationError, AggregationProof, AggregationState, VerificationKey};
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use frame_support::pallet_prelude::*;
use frame_system::pallet_prelude::*;
use log::warn;
use scale_info::TypeInfo;
use sp_runtime::RuntimeDebug;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;
pub mod weights;

/// Batch sizes with a deployed aggregation circuit.
#[derive(
    Encode,
    Decode,
    DecodeWithMemTracking,
    MaxEncodedLen,
    Clone,
    Copy,
    Eq,
    PartialEq,
    RuntimeDebug,
    TypeInfo,
)]
pub enum BatchSize {
    Twenty,
    Hundred,
}

impl BatchSize {
    pub fn size(&self) -> u32 {
        match self {
            BatchSize::Twenty => 20,
            BatchSize::Hundred => 100,
        }
    }
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use crate::weights::WeightInfo;

    #[pallet::pallet]
    #[pallet::without_storage_info]
    pub struct Pallet<T>(_);

    #[pallet::config]
    pub trait Config: frame_system::Config {
        #[allow(deprecated)]
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;
        type WeightInfo: WeightInfo;
        #[pallet::constant]
        type MaxProofSize: Get<u32>;
    }

    /// Verification key per batch size. Written once at genesis.
    #[pallet::storage]
    #[pallet::getter(fn verification_key)]
    pub type VerificationKeys<T: Config> =
        StorageMap<_, Twox64Concat, BatchSize, VerificationKey, OptionQuery>;

    /// Public output of the most recently verified proof per batch size.
    #[pallet::storage]
    #[pallet::getter(fn latest_output)]
    pub type LatestOutputs<T: Config> =
        StorageMap<_, Twox64Concat, BatchSize, AggregationState, OptionQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        AggregationVerified {
            batch_size: BatchSize,
            running_average: u64,
            total_count: u64,
            chain_length: u64,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// No verification key was configured for this batch size.
        VerificationKeyMissing,
        /// Proof bytes could not be decoded.
        MalformedProof,
        /// Proof belongs to a different circuit.
        WrongCircuit,
        /// Proof failed verification.
        InvalidProof,
    }

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        pub verification_key_20: Option<VerificationKey>,
        pub verification_key_100: Option<VerificationKey>,
        #[serde(skip)]
        pub _phantom: core::marker::PhantomData<T>,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            for (batch_size, key) in [
                (BatchSize::Twenty, &self.verification_key_20),
                (BatchSize::Hundred, &self.verification_key_100),
            ] {
                if let Some(key) = key {
                    assert_eq!(
                        key.batch_size,
                        batch_size.size(),
                        "verification key registered under the wrong batch size"
                    );
                    VerificationKeys::<T>::insert(batch_size, key.clone());
                }
            }
        }
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::verify_aggregation_proof_20())]
        pub fn verify_aggregation_proof_20(
            origin: OriginFor<T>,
            proof: BoundedVec<u8, T::MaxProofSize>,
        ) -> DispatchResult {
            ensure_signed(origin)?;
            Self::verify_and_record(BatchSize::Twenty, &proof)?;
            Ok(())
        }

        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::verify_aggregation_proof_100())]
        pub fn verify_aggregation_proof_100(
            origin: OriginFor<T>,
            proof: BoundedVec<u8, T::MaxProofSize>,
        ) -> DispatchResult {
            ensure_signed(origin)?;
            Self::verify_and_record(BatchSize::Hundred, &proof)?;
            Ok(())
        }
    }

    impl<T: Config> Pallet<T> {
        /// Check `proof_bytes` for `batch_size` without touching storage.
        pub fn check_proof(
            batch_size: BatchSize,
            proof_bytes: &[u8],
        ) -> Result<(AggregationProof, AggregationState), Error<T>> {
            let key =
                VerificationKeys::<T>::get(batch_size).ok_or(Error::<T>::VerificationKeyMissing)?;
            let proof =
                AggregationProof::from_bytes(proof_bytes).map_err(|_| Error::<T>::MalformedProof)?;
            let state = aggregation_circuit::verify_aggregation_proof(&proof, &key).map_err(
                |err| {
                    warn!(
                        target: "aggregation-verifier",
                        "rejected {:?} proof: {:?}",
                        batch_size,
                        err
                    );
                    match err {
                        AggregationError::CircuitMismatch => Error::<T>::WrongCircuit,
                        _ => Error::<T>::InvalidProof,
                    }
                },
            )?;
            Ok((proof, state))
        }

        /// Verify, record the output and emit the event.
        pub fn verify_and_record(
            batch_size: BatchSize,
            proof_bytes: &[u8],
        ) -> Result<AggregationState, Error<T>> {
            let (proof, state) = Self::check_proof(batch_size, proof_bytes)?;
            LatestOutputs::<T>::insert(batch_size, state);
            Self::deposit_event(Event::AggregationVerified {
                batch_size,
                running_average: state.running_average,
                total_count: state.total_count,
                chain_length: proof.chain_length,
            });
            Ok(state)
        }
    }
}
