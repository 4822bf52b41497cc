use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use crypto::hashes::{asset_key, Commitment};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use state_merkle::SparseMerkleMap;

/// Number of assets the oracle publishes.
pub const ASSET_COUNT: usize = 10;

/// Published assets, in price-vector slot order.
pub const ASSET_NAMES: [&str; ASSET_COUNT] = [
    "Mina",
    "Bitcoin",
    "Ethereum",
    "Solana",
    "Ripple",
    "Cardano",
    "Avalanche",
    "Polygon",
    "Chainlink",
    "Dogecoin",
];

/// Reference prices in slot order, fixed point with ten decimals.
pub const REFERENCE_PRICES: [u64; ASSET_COUNT] = [
    1_848_770_935,
    1_115_439_169_547_040,
    44_421_115_510_507,
    2_001_398_311_039,
    4_749_419_511,
    3_907_233_838,
    278_604_715_977,
    5_645_415_935,
    243_095_980_879,
    1_261_024_335,
];

/// Map key of an asset: a domain separated hash of its name.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
    DecodeWithMemTracking,
    MaxEncodedLen,
    TypeInfo,
    Serialize,
    Deserialize,
)]
pub struct AssetKey(pub Commitment);

impl AssetKey {
    pub fn from_name(name: &str) -> Self {
        Self(asset_key(name))
    }

    pub fn as_bytes(&self) -> &Commitment {
        &self.0
    }

    /// Slot of a published asset in [`PricesArray`].
    pub fn slot(&self) -> Option<usize> {
        ASSET_NAMES
            .iter()
            .position(|name| Self::from_name(name) == *self)
    }
}

/// Keys of the published assets, in slot order.
pub fn asset_keys() -> [AssetKey; ASSET_COUNT] {
    ASSET_NAMES.map(AssetKey::from_name)
}

/// One price per published asset, in [`ASSET_NAMES`] order.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
pub struct PricesArray(pub [u64; ASSET_COUNT]);

impl PricesArray {
    pub fn get(&self, name: &str) -> Option<u64> {
        let slot = ASSET_NAMES.iter().position(|n| *n == name)?;
        Some(self.0[slot])
    }

    pub fn reference() -> Self {
        Self(REFERENCE_PRICES)
    }

    /// Root of the map holding exactly these prices.
    pub fn commitment(&self) -> Commitment {
        SparseMerkleMap::from_entries(self.entries().map(|(key, price)| (key.0, price))).root()
    }

    /// `(key, price)` pairs in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (AssetKey, u64)> + '_ {
        asset_keys().into_iter().zip(self.0.iter().copied())
    }
}
