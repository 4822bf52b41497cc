//! Price oracle.
//!
//! Prices live in an off-chain sparse Merkle map; the chain only holds its
//! root. Writers stage compare-and-swap intents through the secret-gated
//! [`Pallet::init_base`] and [`Pallet::update`] calls, and anyone holding a
//! settlement proof for a prefix of the staged intents can advance the root
//! with [`Pallet::settle`]. Readers obtain prices from the operator together
//! with a witness and check them against the settled root.

#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use crypto::hashes::{secret_commitment, Commitment, ZERO_COMMITMENT};
use crypto::ml_dsa::{MlDsaPublicKey, MlDsaSignature, ML_DSA_PUBLIC_KEY_LEN, ML_DSA_SIGNATURE_LEN};
use crypto::traits::VerifyKey;
use frame_support::pallet_prelude::*;
use frame_system::pallet_prelude::*;
use log::{debug, warn};
use oracle_protocol::{
    intents_commitment, price_attestation_message, AssetKey, IpfsPointer, PriceClaim,
    PricesArray, UpdateIntent, ASSET_COUNT, PRICE_ATTESTATION_DOMAIN,
};
use scale_info::TypeInfo;
use settlement_circuit::{verify_settlement_proof_bytes, SettlementError};
use sp_runtime::RuntimeDebug;
use sp_std::vec::Vec;

#[cfg(test)]
mod mock;
pub mod weights;

pub type OwnerKeyBytes = BoundedVec<u8, ConstU32<{ ML_DSA_PUBLIC_KEY_LEN as u32 }>>;
pub type AttestationBytes = BoundedVec<u8, ConstU32<{ ML_DSA_SIGNATURE_LEN as u32 }>>;
/// One claim per published asset, in slot order.
pub type PriorClaims = BoundedVec<PriceClaim, ConstU32<{ ASSET_COUNT as u32 }>>;

/// On-chain snapshot of the off-chain price map.
#[derive(
    Encode,
    Decode,
    DecodeWithMemTracking,
    MaxEncodedLen,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    RuntimeDebug,
    TypeInfo,
)]
pub struct OffchainStateCommitment {
    pub root: Commitment,
    /// Intents consumed by settlements so far, applied or rejected.
    pub settled_intents: u64,
    pub settlements: u64,
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use crate::weights::WeightInfo;

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    #[pallet::config]
    pub trait Config: frame_system::Config {
        #[allow(deprecated)]
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;
        type WeightInfo: WeightInfo;
        /// Staged intents awaiting settlement. Must not exceed the settlement
        /// circuit's per-proof limit.
        #[pallet::constant]
        type MaxPendingIntents: Get<u32>;
        #[pallet::constant]
        type MaxProofSize: Get<u32>;
    }

    /// Commitment to the published price data (e.g. a tree over the history blob).
    #[pallet::storage]
    #[pallet::getter(fn price_commitment)]
    pub type PriceCommitment<T> = StorageValue<_, Commitment, ValueQuery>;

    /// Hash of the update secret. Zero until `init_base` runs.
    #[pallet::storage]
    #[pallet::getter(fn secret_hash)]
    pub type SecretHash<T> = StorageValue<_, Commitment, ValueQuery>;

    #[pallet::storage]
    #[pallet::getter(fn ipfs_pointer)]
    pub type IpfsPointerStorage<T> = StorageValue<_, IpfsPointer, ValueQuery>;

    #[pallet::storage]
    #[pallet::getter(fn owner_public_key)]
    pub type OwnerPublicKey<T> = StorageValue<_, OwnerKeyBytes, OptionQuery>;

    #[pallet::storage]
    #[pallet::getter(fn offchain_state)]
    pub type OffchainState<T> = StorageValue<_, OffchainStateCommitment, ValueQuery>;

    #[pallet::storage]
    #[pallet::getter(fn pending_intents)]
    pub type PendingIntents<T: Config> =
        StorageValue<_, BoundedVec<UpdateIntent, T::MaxPendingIntents>, ValueQuery>;

    /// Every intent consumed by a settlement, by position in settlement order.
    /// Operators replay it to catch up with settlements they did not submit.
    #[pallet::storage]
    pub type SettledIntentLog<T> = StorageMap<_, Twox64Concat, u64, UpdateIntent, OptionQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        Initialized {
            who: T::AccountId,
            commitment: Commitment,
        },
        PricesUpdated {
            who: T::AccountId,
            commitment: Commitment,
            pending: u32,
        },
        Settled {
            start_root: Commitment,
            end_root: Commitment,
            applied: u32,
            rejected: u32,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// `init_base` already ran.
        AlreadyInitialized,
        /// `update` before `init_base`.
        NotInitialized,
        /// Secret does not hash to the stored secret hash.
        InvalidSecret,
        /// Wrong number of prior price claims.
        MissingPriceClaims,
        /// A prior price claim does not verify against the settled root.
        InvalidPriceClaim,
        /// Too many intents awaiting settlement.
        PendingQueueFull,
        /// Settlement proof bytes could not be decoded.
        MalformedProof,
        /// Settlement proof was built against a root that is no longer current.
        StaleSettlement,
        /// Settlement proof failed replay.
        SettlementProofInvalid,
        /// Settlement proof does not cover a prefix of the pending intents.
        IntentsMismatch,
        /// No owner key is registered.
        OwnerKeyMissing,
        /// Signature does not match the owner key.
        InvalidAttestation,
    }

    #[pallet::hooks]
    impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
        fn integrity_test() {
            Self::check_queue_bounds();
        }
    }

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        /// ML-DSA-65 public key of the oracle owner.
        pub owner_public_key: Vec<u8>,
        #[serde(skip)]
        pub _phantom: core::marker::PhantomData<T>,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            Pallet::<T>::check_queue_bounds();
            if self.owner_public_key.is_empty() {
                return;
            }
            let key = OwnerKeyBytes::try_from(self.owner_public_key.clone())
                .ok()
                .filter(|key| key.len() == ML_DSA_PUBLIC_KEY_LEN);
            assert!(key.is_some(), "owner public key must be an ML-DSA-65 key");
            if let Some(key) = key {
                OwnerPublicKey::<T>::put(key);
            }
        }
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// One-time initialisation: store the commitment and pointer, lock in
        /// the secret hash and stage the first price of every asset.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::init_base())]
        pub fn init_base(
            origin: OriginFor<T>,
            commitment: Commitment,
            ipfs_pointer: IpfsPointer,
            prices: PricesArray,
            prior: PriorClaims,
            secret: [u8; 32],
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(
                SecretHash::<T>::get() == ZERO_COMMITMENT,
                Error::<T>::AlreadyInitialized
            );

            let pending = Self::stage_prices(&prices, &prior)?;
            PriceCommitment::<T>::put(commitment);
            IpfsPointerStorage::<T>::put(ipfs_pointer);
            SecretHash::<T>::put(secret_commitment(&secret));

            debug!(target: "oracle", "initialised with {} pending intents", pending);
            Self::deposit_event(Event::Initialized { who, commitment });
            Ok(())
        }

        /// Secret-gated price update.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::update())]
        pub fn update(
            origin: OriginFor<T>,
            commitment: Commitment,
            ipfs_pointer: IpfsPointer,
            prices: PricesArray,
            prior: PriorClaims,
            secret: [u8; 32],
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let stored = SecretHash::<T>::get();
            ensure!(stored != ZERO_COMMITMENT, Error::<T>::NotInitialized);
            ensure!(
                secret_commitment(&secret) == stored,
                Error::<T>::InvalidSecret
            );

            let pending = Self::stage_prices(&prices, &prior)?;
            PriceCommitment::<T>::put(commitment);
            IpfsPointerStorage::<T>::put(ipfs_pointer);

            Self::deposit_event(Event::PricesUpdated {
                who,
                commitment,
                pending,
            });
            Ok(())
        }

        /// Apply a settlement proof covering the oldest pending intents.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::settle(T::MaxPendingIntents::get()))]
        pub fn settle(
            origin: OriginFor<T>,
            proof: BoundedVec<u8, T::MaxProofSize>,
        ) -> DispatchResult {
            ensure_signed(origin)?;
            let state = OffchainState::<T>::get();

            let (_, summary) =
                verify_settlement_proof_bytes(&proof, &state.root).map_err(|err| {
                    warn!(target: "oracle", "settlement rejected: {:?}", err);
                    match err {
                        SettlementError::StaleRoot => Error::<T>::StaleSettlement,
                        SettlementError::DeserializeFailed | SettlementError::ProofTooLarge(_) => {
                            Error::<T>::MalformedProof
                        }
                        _ => Error::<T>::SettlementProofInvalid,
                    }
                })?;

            let pending = PendingIntents::<T>::get();
            let count = summary.intent_count;
            ensure!(count <= pending.len(), Error::<T>::IntentsMismatch);
            ensure!(
                intents_commitment(pending.iter().take(count)) == summary.intents_commitment,
                Error::<T>::IntentsMismatch
            );

            let mut consumed = pending.into_inner();
            let remaining = consumed.split_off(count);
            for (offset, intent) in consumed.iter().enumerate() {
                SettledIntentLog::<T>::insert(state.settled_intents + offset as u64, intent);
            }
            PendingIntents::<T>::put(BoundedVec::truncate_from(remaining));
            OffchainState::<T>::put(OffchainStateCommitment {
                root: summary.end_root,
                settled_intents: state.settled_intents.saturating_add(count as u64),
                settlements: state.settlements.saturating_add(1),
            });

            Self::deposit_event(Event::Settled {
                start_root: summary.start_root,
                end_root: summary.end_root,
                applied: summary.applied as u32,
                rejected: summary.rejected as u32,
            });
            Ok(())
        }

        /// Check an owner signature over `price`. Changes nothing.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::verify())]
        pub fn verify(
            origin: OriginFor<T>,
            signature: AttestationBytes,
            price: u64,
        ) -> DispatchResult {
            ensure_signed(origin)?;
            Self::verify_price_attestation(&signature, price)?;
            Ok(())
        }
    }

    impl<T: Config> Pallet<T> {
        /// Settled price of `key`, proven by `claim`. Absent keys read as 0.
        pub fn get_price(key: &AssetKey, claim: &PriceClaim) -> Result<u64, Error<T>> {
            let root = OffchainState::<T>::get().root;
            ensure!(claim.verify(&root, key), Error::<T>::InvalidPriceClaim);
            Ok(claim.value.unwrap_or(0))
        }

        /// Settled prices of every published asset, in slot order.
        pub fn get_prices(claims: &[PriceClaim]) -> Result<PricesArray, Error<T>> {
            ensure!(claims.len() == ASSET_COUNT, Error::<T>::MissingPriceClaims);
            let mut prices = [0u64; ASSET_COUNT];
            for ((slot, key), claim) in prices
                .iter_mut()
                .zip(oracle_protocol::asset_keys().iter())
                .zip(claims)
            {
                *slot = Self::get_price(key, claim)?;
            }
            Ok(PricesArray(prices))
        }

        /// Settled intents from position `from` on, oldest first.
        pub fn settled_intents(from: u64) -> Vec<UpdateIntent> {
            let end = OffchainState::<T>::get().settled_intents;
            (from..end).filter_map(SettledIntentLog::<T>::get).collect()
        }

        /// The pending queue must hold one full price update and fit in one
        /// settlement.
        pub fn check_queue_bounds() {
            let max = T::MaxPendingIntents::get() as usize;
            assert!(
                max >= ASSET_COUNT,
                "pending queue shorter than one price update"
            );
            assert!(
                max <= settlement_circuit::MAX_INTENTS,
                "pending queue longer than one settlement can fold"
            );
        }

        /// Latest staged value for `key`, if an intent for it is pending.
        pub fn pending_price(key: &AssetKey) -> Option<u64> {
            PendingIntents::<T>::get()
                .iter()
                .rev()
                .find(|intent| intent.key == *key)
                .map(|intent| intent.to)
        }

        pub fn verify_price_attestation(signature: &[u8], price: u64) -> Result<(), Error<T>> {
            let owner = OwnerPublicKey::<T>::get().ok_or(Error::<T>::OwnerKeyMissing)?;
            let owner =
                MlDsaPublicKey::from_bytes(&owner).map_err(|_| Error::<T>::OwnerKeyMissing)?;
            let signature =
                MlDsaSignature::from_bytes(signature).map_err(|_| Error::<T>::InvalidAttestation)?;
            owner
                .verify_in_domain(
                    PRICE_ATTESTATION_DOMAIN,
                    &price_attestation_message(price),
                    &signature,
                )
                .map_err(|_| Error::<T>::InvalidAttestation)
        }

        /// Queue one intent per published asset.
        ///
        /// `from` chains onto the newest pending intent for the same key; keys
        /// with nothing pending take the settled value proven by their claim.
        fn stage_prices(prices: &PricesArray, prior: &[PriceClaim]) -> Result<u32, Error<T>> {
            ensure!(prior.len() == ASSET_COUNT, Error::<T>::MissingPriceClaims);
            let root = OffchainState::<T>::get().root;

            PendingIntents::<T>::try_mutate(|pending| {
                for ((key, price), claim) in prices.entries().zip(prior) {
                    let staged = pending
                        .iter()
                        .rev()
                        .find(|intent| intent.key == key)
                        .map(|intent| intent.to);
                    let from = match staged {
                        Some(value) => Some(value),
                        None => {
                            ensure!(claim.verify(&root, &key), Error::<T>::InvalidPriceClaim);
                            claim.value
                        }
                    };
                    pending
                        .try_push(UpdateIntent::new(key, from, price))
                        .map_err(|_| Error::<T>::PendingQueueFull)?;
                }
                Ok(pending.len() as u32)
            })
        }
    }
}
