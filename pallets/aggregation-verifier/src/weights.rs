use frame_support::weights::Weight;
use sp_std::marker::PhantomData;

pub trait WeightInfo {
    fn verify_aggregation_proof_20() -> Weight;
    fn verify_aggregation_proof_100() -> Weight;
}

pub struct DefaultWeightInfo<T>(PhantomData<T>);

impl<T> WeightInfo for DefaultWeightInfo<T> {
    // One ML-DSA-65 verification plus a storage write, independent of chain length.
    fn verify_aggregation_proof_20() -> Weight {
        Weight::from_parts(2_500_000, 4_096)
    }

    fn verify_aggregation_proof_100() -> Weight {
        Weight::from_parts(2_500_000, 4_096)
    }
}

impl WeightInfo for () {
    fn verify_aggregation_proof_20() -> Weight {
        DefaultWeightInfo::<()>::verify_aggregation_proof_20()
    }

    fn verify_aggregation_proof_100() -> Weight {
        DefaultWeightInfo::<()>::verify_aggregation_proof_100()
    }
}
