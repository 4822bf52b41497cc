use crate::{self as pallet_oracle};
use crypto::ml_dsa::MlDsaSecretKey;
use crypto::traits::{SigningKey, VerifyKey};
use frame_support::parameter_types;
use frame_support::traits::{ConstU16, ConstU32, Everything};
use frame_system as system;
use oracle_protocol::{AssetKey, PriceClaim, ASSET_NAMES};
use sp_core::H256;
use sp_runtime::traits::{BlakeTwo256, IdentityLookup};
use sp_runtime::BuildStorage;
use state_merkle::SparseMerkleMap;

pub const OWNER_SEED: &[u8] = b"oracle pallet mock owner";
pub const SECRET: [u8; 32] = [7u8; 32];

frame_support::construct_runtime!(
    pub enum Test {
        System: frame_system,
        Oracle: pallet_oracle,
    }
);

parameter_types! {
    pub static MaxPendingIntents: u32 = 30;
}

parameter_types! {
    pub const BlockHashCount: u64 = 250;
    pub const MaxProofSize: u32 = settlement_circuit::MAX_PROOF_BYTES as u32;
}

impl system::Config for Test {
    type BaseCallFilter = Everything;
    type BlockWeights = ();
    type BlockLength = ();
    type DbWeight = ();
    type RuntimeOrigin = RuntimeOrigin;
    type RuntimeCall = RuntimeCall;
    type RuntimeTask = ();
    type Nonce = u64;
    type Block = frame_system::mocking::MockBlock<Self>;
    type Hash = H256;
    type Hashing = BlakeTwo256;
    type AccountId = u64;
    type Lookup = IdentityLookup<Self::AccountId>;
    type RuntimeEvent = RuntimeEvent;
    type BlockHashCount = BlockHashCount;
    type Version = ();
    type PalletInfo = PalletInfo;
    type AccountData = ();
    type OnNewAccount = ();
    type OnKilledAccount = ();
    type SystemWeightInfo = ();
    type ExtensionsWeightInfo = ();
    type SS58Prefix = ConstU16<42>;
    type OnSetCode = ();
    type MaxConsumers = ConstU32<16>;
    type SingleBlockMigrations = ();
    type MultiBlockMigrator = ();
    type PreInherents = ();
    type PostInherents = ();
    type PostTransactions = ();
}

impl pallet_oracle::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type MaxPendingIntents = MaxPendingIntents;
    type MaxProofSize = MaxProofSize;
}

pub fn owner_key() -> MlDsaSecretKey {
    MlDsaSecretKey::generate_deterministic(OWNER_SEED)
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut storage = frame_system::GenesisConfig::<Test>::default()
        .build_storage()
        .expect("system storage");
    pallet_oracle::GenesisConfig::<Test> {
        owner_public_key: owner_key().verify_key().to_bytes(),
        _phantom: Default::default(),
    }
    .assimilate_storage(&mut storage)
    .expect("oracle storage");
    let mut ext: sp_io::TestExternalities = storage.into();
    ext.execute_with(|| frame_system::Pallet::<Test>::set_block_number(1));
    ext
}

/// Claims for every published asset against `map`.
pub fn claims(map: &SparseMerkleMap) -> pallet_oracle::PriorClaims {
    let claims: Vec<PriceClaim> = ASSET_NAMES
        .iter()
        .map(|name| claim(map, &AssetKey::from_name(name)))
        .collect();
    claims.try_into().expect("ten claims")
}

pub fn claim(map: &SparseMerkleMap, key: &AssetKey) -> PriceClaim {
    PriceClaim {
        value: map.get(&key.0),
        witness: map.witness(&key.0),
    }
}
