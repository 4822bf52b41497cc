use crate::{self as pallet_aggregation_verifier};
use aggregation_circuit::{AggregationProgram100, AggregationProgram20};
use frame_support::parameter_types;
use frame_support::traits::{ConstU16, ConstU32, Everything};
use frame_system as system;
use sp_core::H256;
use sp_runtime::traits::{BlakeTwo256, IdentityLookup};
use sp_runtime::BuildStorage;

pub const SETUP_SEED: &[u8] = b"aggregation verifier mock setup";

frame_support::construct_runtime!(
    pub enum Test {
        System: frame_system,
        AggregationVerifier: pallet_aggregation_verifier,
    }
);

parameter_types! {
    pub const BlockHashCount: u64 = 250;
    pub const MaxProofSize: u32 = aggregation_circuit::MAX_PROOF_BYTES as u32;
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

impl pallet_aggregation_verifier::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type MaxProofSize = MaxProofSize;
}

pub fn programs() -> (AggregationProgram20, AggregationProgram100) {
    (
        AggregationProgram20::compile(SETUP_SEED),
        AggregationProgram100::compile(SETUP_SEED),
    )
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let (small, large) = programs();
    let mut storage = frame_system::GenesisConfig::<Test>::default()
        .build_storage()
        .expect("system storage");
    pallet_aggregation_verifier::GenesisConfig::<Test> {
        verification_key_20: Some(small.verification_key().clone()),
        verification_key_100: Some(large.verification_key().clone()),
        _phantom: Default::default(),
    }
    .assimilate_storage(&mut storage)
    .expect("aggregation verifier storage");
    let mut ext: sp_io::TestExternalities = storage.into();
    ext.execute_with(|| frame_system::Pallet::<Test>::set_block_number(1));
    ext
}
