//! Types shared by the oracle pallets, the proof circuits and the off-chain
//! operator.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod assets;
pub mod intent;
pub mod packed;

pub use assets::{asset_keys, AssetKey, PricesArray, ASSET_COUNT, ASSET_NAMES, REFERENCE_PRICES};
pub use intent::{intents_commitment, PriceClaim, UpdateIntent};
pub use packed::{IpfsPointer, PackedString, PackedStringError};

/// Domain tag for owner price attestations.
pub const PRICE_ATTESTATION_DOMAIN: &[u8] = b"oracle-price-attestation-v1";

/// Message signed by the owner to attest `price`.
pub fn price_attestation_message(price: u64) -> [u8; 8] {
    price.to_be_bytes()
}
