use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use crypto::hashes::{chain_hash, Commitment, ZERO_COMMITMENT};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use state_merkle::MapWitness;

use crate::assets::AssetKey;

const INTENTS_TAG: &[u8] = b"oracle-intents";

/// Compare-and-swap write: set `key` to `to` provided it currently holds
/// `from` (`None` meaning absent).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Encode,
    Decode,
    DecodeWithMemTracking,
    MaxEncodedLen,
    TypeInfo,
    Serialize,
    Deserialize,
)]
pub struct UpdateIntent {
    pub key: AssetKey,
    pub from: Option<u64>,
    pub to: u64,
}

impl UpdateIntent {
    pub fn new(key: AssetKey, from: Option<u64>, to: u64) -> Self {
        Self { key, from, to }
    }
}

/// Order-sensitive hash chain over a sequence of intents.
pub fn intents_commitment<'a, I>(intents: I) -> Commitment
where
    I: IntoIterator<Item = &'a UpdateIntent>,
{
    intents
        .into_iter()
        .fold(ZERO_COMMITMENT, |acc, intent| {
            chain_hash(INTENTS_TAG, &acc, &intent.encode())
        })
}

/// A settled value for one key together with its witness under the
/// settled root. `value == None` claims the key is absent.
#[derive(
    Clone, Debug, PartialEq, Eq, Encode, Decode, DecodeWithMemTracking, TypeInfo, Serialize, Deserialize,
)]
pub struct PriceClaim {
    pub value: Option<u64>,
    pub witness: MapWitness,
}

impl PriceClaim {
    pub fn verify(&self, root: &Commitment, key: &AssetKey) -> bool {
        self.witness.verify(root, key.as_bytes(), self.value)
    }
}
