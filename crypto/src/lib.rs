#![cfg_attr(not(feature = "std"), no_std)]

//! Cryptographic primitives shared by the oracle circuits, pallets and the
//! off-chain operator: domain separated blake3 commitments, deterministic
//! expansion, and ML-DSA-65 signatures.

extern crate alloc;

pub mod deterministic;
pub mod error;
pub mod hashes;
pub mod ml_dsa;
pub mod traits;

pub use error::CryptoError;
pub use hashes::Commitment;
